//! Document store trait, backend selection, and the in-memory backend.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use pcommon::BoxFuture;

use crate::error::StoreError;
use crate::redis_store::RedisDocumentStore;

/// Keyed JSON document service.
///
/// Values are returned as raw JSON text so callers can decide how to treat
/// entries that fail to decode.
pub trait DocumentStore: Send + Sync {
    fn scan_keys<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Result<Vec<String>, StoreError>>;

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>>;

    fn put<'a>(&'a self, key: &'a str, json: String) -> BoxFuture<'a, Result<(), StoreError>>;

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, StoreError>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StoreConfig {
    #[default]
    InMemory,
    Redis {
        url: String,
    },
}

pub fn create_document_store(config: StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match config {
        StoreConfig::InMemory => Ok(Arc::new(InMemoryDocumentStore::new())),
        StoreConfig::Redis { url } => Ok(Arc::new(RedisDocumentStore::open(&url)?)),
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: Mutex<BTreeMap<String, String>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn scan_keys<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Result<Vec<String>, StoreError>> {
        Box::pin(async move {
            let documents = self
                .documents
                .lock()
                .map_err(|_| StoreError::storage("document store lock poisoned"))?;

            Ok(documents
                .range(prefix.to_string()..)
                .take_while(|(key, _)| key.starts_with(prefix))
                .map(|(key, _)| key.clone())
                .collect())
        })
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        Box::pin(async move {
            let documents = self
                .documents
                .lock()
                .map_err(|_| StoreError::storage("document store lock poisoned"))?;

            Ok(documents.get(key).cloned())
        })
    }

    fn put<'a>(&'a self, key: &'a str, json: String) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let mut documents = self
                .documents
                .lock()
                .map_err(|_| StoreError::storage("document store lock poisoned"))?;

            documents.insert(key.to_string(), json);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, StoreError>> {
        Box::pin(async move {
            let mut documents = self
                .documents
                .lock()
                .map_err(|_| StoreError::storage("document store lock poisoned"))?;

            Ok(documents.remove(key).is_some())
        })
    }
}
