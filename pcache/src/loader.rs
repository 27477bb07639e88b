//! Pulls every document under a namespace and decodes it into entities.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use pstore::{DocumentStore, key_to_id};

use crate::error::LoadError;
use crate::types::{EntityKind, Extension, Prompt, Tool};

/// Key prefixes for each entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
    pub tools: String,
    pub prompts: String,
    pub extensions: String,
    pub environment: String,
}

impl Default for Namespaces {
    fn default() -> Self {
        Self {
            tools: "prompt-shell:tools:".to_string(),
            prompts: "prompt-shell:prompts:".to_string(),
            extensions: "prompt-shell:extensions:".to_string(),
            environment: "prompt-shell:environs:".to_string(),
        }
    }
}

impl Namespaces {
    pub fn prefix(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Tools => &self.tools,
            EntityKind::Prompts => &self.prompts,
            EntityKind::Extensions => &self.extensions,
            EntityKind::Environment => &self.environment,
        }
    }
}

/// Decoded entries plus the number of documents that were skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub entries: HashMap<String, T>,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct MetadataLoader {
    store: Arc<dyn DocumentStore>,
    namespaces: Namespaces,
}

impl MetadataLoader {
    pub fn new(store: Arc<dyn DocumentStore>, namespaces: Namespaces) -> Self {
        Self { store, namespaces }
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub async fn load_tools(&self) -> Result<Loaded<Tool>, LoadError> {
        self.load_entries(EntityKind::Tools).await
    }

    pub async fn load_prompts(&self) -> Result<Loaded<Prompt>, LoadError> {
        self.load_entries(EntityKind::Prompts).await
    }

    pub async fn load_extensions(&self) -> Result<Loaded<Extension>, LoadError> {
        self.load_entries(EntityKind::Extensions).await
    }

    /// Environment leaves keyed by dotted path.
    pub async fn load_environment(&self) -> Result<Loaded<Value>, LoadError> {
        self.load_entries(EntityKind::Environment).await
    }

    async fn load_entries<T>(&self, kind: EntityKind) -> Result<Loaded<T>, LoadError>
    where
        T: DeserializeOwned,
    {
        let prefix = self.namespaces.prefix(kind);
        let keys = self
            .store
            .scan_keys(prefix)
            .await
            .map_err(|source| LoadError::Store { kind, source })?;

        let mut entries = HashMap::with_capacity(keys.len());
        let mut skipped = 0;

        for key in keys {
            let id = key_to_id(&key, prefix);
            if id.is_empty() {
                tracing::warn!(%kind, key = %key, "skipping entry with empty id");
                skipped += 1;
                continue;
            }

            let Some(raw) = self
                .store
                .get(&key)
                .await
                .map_err(|source| LoadError::Store { kind, source })?
            else {
                tracing::debug!(%kind, key = %key, "entry vanished between scan and get");
                continue;
            };

            match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    entries.insert(id, value);
                }
                Err(err) => {
                    tracing::warn!(%kind, key = %key, error = %err, "skipping malformed entry");
                    skipped += 1;
                }
            }
        }

        Ok(Loaded { entries, skipped })
    }
}
