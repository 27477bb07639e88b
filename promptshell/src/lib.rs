//! Unified facade over the promptshell workspace crates.
//!
//! [`Engine`] ties the metadata cache, template compiler, tool dispatcher,
//! and optional chat provider together, and keeps them current with
//! periodic refreshes from the document store.
//!
//! ```rust
//! use std::sync::Arc;
//! use promptshell::prelude::*;
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap().block_on(async {
//! let store = Arc::new(InMemoryDocumentStore::new());
//! store
//!     .put(
//!         "prompt-shell:prompts:greet",
//!         json!({"name": "greet", "prompt": "Hello {{args.name}}"}).to_string(),
//!     )
//!     .await
//!     .unwrap();
//!
//! let engine = Engine::builder().store(store).build().unwrap();
//! engine.refresh_all().await.unwrap();
//!
//! let rendered = engine
//!     .render("greet", json!({"name": "Ann"}), RenderOptions::new())
//!     .await
//!     .unwrap();
//! assert_eq!(rendered.as_prompt(), Some("Hello Ann"));
//! # });
//! ```

mod engine;
mod error;
mod refresh;

pub mod prelude;

pub use pcache;
pub use pchat;
pub use pcommon;
pub use pobserve;
pub use pprovider;
pub use prender;
pub use pstore;
pub use ptooling;

pub use engine::{Engine, EngineBuilder};
pub use error::EngineError;
pub use refresh::{
    DEFAULT_REFRESH_INTERVAL, DEFAULT_REFRESH_TIMEOUT, MIN_REFRESH_INTERVAL, RefreshHandle,
    RefreshIntervals, RefreshReport,
};

pub use pcache::{
    EntityKind, EnvironmentTree, Extension, LoadError, Namespaces, Prompt, PromptEntry,
    PromptOrigin, RefreshHooks, Snapshot, Tool, ToolKind,
};
pub use pchat::{ChatError, ChatRequest, ChatService};
pub use pcommon::{BoxFuture, GenerationOptions, MetadataMap, TraceId};
pub use pprovider::{ChatCompletion, ModelProvider, OpenAiCompatibleProvider, ProviderError};
pub use prender::{RenderError, RenderOptions, Rendered, Renderer, TemplateCompiler};
pub use pstore::{DocumentStore, InMemoryDocumentStore, StoreConfig, StoreError};
pub use ptooling::{
    CallContext, CallStats, HttpTransport, RetryPolicy, ToolCallHooks, ToolDispatcher, ToolError,
    ToolErrorKind,
};
