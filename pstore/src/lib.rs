//! Keyed JSON document store used as the source of truth for cached metadata.
//!
//! ```rust
//! use pstore::{DocumentStore, InMemoryDocumentStore};
//!
//! # tokio_test_block(async {
//! let store = InMemoryDocumentStore::new();
//! store.put("prompt-shell:tools:echo", "{}".to_string()).await.unwrap();
//! let keys = store.scan_keys("prompt-shell:tools:").await.unwrap();
//! assert_eq!(keys.len(), 1);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

mod backend;
mod error;
mod keys;
mod redis_store;

pub mod prelude {
    pub use crate::{
        DocumentStore, InMemoryDocumentStore, RedisDocumentStore, StoreConfig, StoreError,
        StoreErrorKind, create_document_store, id_to_key, key_to_id,
    };
}

pub use backend::{DocumentStore, InMemoryDocumentStore, StoreConfig, create_document_store};
pub use error::{StoreError, StoreErrorKind};
pub use keys::{id_to_key, key_to_id};
pub use redis_store::RedisDocumentStore;
