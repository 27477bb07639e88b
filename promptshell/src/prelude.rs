//! Common imports for most promptshell applications.

pub use crate::{
    CallContext, ChatError, ChatRequest, DocumentStore, Engine, EngineBuilder, EngineError,
    EntityKind, InMemoryDocumentStore, LoadError, ModelProvider, PromptOrigin, RefreshHandle,
    RefreshIntervals, RefreshReport, RenderError, RenderOptions, Rendered, ToolError,
    ToolErrorKind, TraceId,
};
