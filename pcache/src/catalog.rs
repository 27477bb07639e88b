//! Prompt snapshot with origin tracking and extension overrides.
//!
//! Direct prompts always shadow extension-contributed prompts with the same
//! id. Extension entries are derived only from the extensions passed to the
//! latest [`PromptCatalog::merge_extensions`] call.

use std::collections::HashMap;
use std::sync::Arc;

use crate::snapshot::{Snapshot, SnapshotStore};
use crate::types::{Extension, Prompt, PromptEntry, PromptOrigin};

#[derive(Debug, Default)]
pub struct PromptCatalog {
    store: SnapshotStore<PromptEntry>,
}

impl PromptCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Arc<Snapshot<PromptEntry>> {
        self.store.current()
    }

    pub fn get(&self, id: &str) -> Option<PromptEntry> {
        self.store.get(id)
    }

    pub fn origin(&self, id: &str) -> PromptOrigin {
        self.current()
            .get(id)
            .map_or(PromptOrigin::NotExist, |entry| entry.origin)
    }

    /// Installs a fresh set of direct prompts.
    ///
    /// Extension entries from the previous snapshot are carried over first and
    /// then overwritten by any direct prompt with the same id.
    pub fn install_direct(&self, loaded: HashMap<String, Prompt>) -> Arc<Snapshot<PromptEntry>> {
        self.store.update(|previous| {
            let mut next: HashMap<String, PromptEntry> = previous
                .iter()
                .filter(|(_, entry)| entry.origin == PromptOrigin::Extension)
                .map(|(id, entry)| (id.clone(), entry.clone()))
                .collect();

            for (id, prompt) in loaded {
                next.insert(
                    id,
                    PromptEntry {
                        origin: PromptOrigin::Direct,
                        prompt,
                    },
                );
            }
            next
        })
    }

    /// Re-derives extension entries from `extensions`.
    ///
    /// Direct entries are kept untouched; extension entries whose source is no
    /// longer loaded are dropped.
    pub fn merge_extensions<'a>(
        &self,
        extensions: impl IntoIterator<Item = &'a Extension>,
    ) -> Arc<Snapshot<PromptEntry>> {
        let contributed: Vec<(String, Prompt)> = extensions
            .into_iter()
            .flat_map(|extension| {
                extension
                    .contributed_prompts()
                    .map(|(id, prompt)| (id, prompt.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();

        self.store.update(move |previous| {
            let mut next: HashMap<String, PromptEntry> = previous
                .iter()
                .filter(|(_, entry)| entry.origin == PromptOrigin::Direct)
                .map(|(id, entry)| (id.clone(), entry.clone()))
                .collect();

            for (id, prompt) in contributed {
                if next.contains_key(&id) {
                    tracing::debug!(prompt_id = %id, "direct prompt shadows extension prompt");
                    continue;
                }
                next.insert(
                    id,
                    PromptEntry {
                        origin: PromptOrigin::Extension,
                        prompt,
                    },
                );
            }
            next
        })
    }
}
