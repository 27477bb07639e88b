//! Refresh and prompt-shape errors.

use std::time::Duration;

use pstore::StoreError;
use thiserror::Error;

use crate::types::EntityKind;

/// A prompt with neither a template string nor messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("prompt '{name}' has neither a template nor messages")]
pub struct InvalidPrompt {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("document store failed while loading {kind}: {source}")]
    Store {
        kind: EntityKind,
        #[source]
        source: StoreError,
    },
    #[error("{kind} refresh timed out after {}ms", .after.as_millis())]
    Timeout { kind: EntityKind, after: Duration },
}

impl LoadError {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Store { kind, .. } | Self::Timeout { kind, .. } => *kind,
        }
    }
}
