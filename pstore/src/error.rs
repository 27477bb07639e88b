//! Store-layer errors for key enumeration and document access.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    Connection,
    Storage,
    InvalidConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Connection, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Storage, message)
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::InvalidConfig, message)
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for StoreError {}

impl From<redis::RedisError> for StoreError {
    fn from(value: redis::RedisError) -> Self {
        if value.is_connection_dropped() || value.is_connection_refusal() || value.is_timeout() {
            Self::connection(value.to_string())
        } else {
            Self::storage(value.to_string())
        }
    }
}
