//! Hot-reloadable metadata cache for tools, prompts, extensions, and environment values.
//!
//! Every entity kind lives in its own snapshot. Refreshes build the next
//! snapshot off to the side and install it with a single pointer swap, so
//! readers always see one complete generation.
//!
//! ```rust
//! use std::collections::HashMap;
//! use pcache::{Extension, Prompt, PromptCatalog, PromptOrigin};
//!
//! let catalog = PromptCatalog::new();
//! let ext = Extension::new("review", "1.0.0").with_prompt(Prompt::template("diff", "{{args.diff}}"));
//! catalog.merge_extensions([&ext]);
//! catalog.install_direct(HashMap::new());
//!
//! assert_eq!(catalog.origin("review.diff"), PromptOrigin::Extension);
//! ```

mod catalog;
mod environment;
mod error;
mod hooks;
mod loader;
mod snapshot;
mod types;

pub mod prelude {
    pub use crate::{
        EntityKind, EnvironmentTree, Extension, InvalidPrompt, LoadError, Loaded, Message,
        MetadataLoader, Namespaces, NoopRefreshHooks, Prompt, PromptBody, PromptCatalog,
        PromptEntry, PromptOrigin, RefreshHooks, Snapshot, SnapshotCell, SnapshotStore, Tool,
        ToolKind,
    };
}

pub use catalog::PromptCatalog;
pub use environment::EnvironmentTree;
pub use error::{InvalidPrompt, LoadError};
pub use hooks::{NoopRefreshHooks, RefreshHooks};
pub use loader::{Loaded, MetadataLoader, Namespaces};
pub use snapshot::{Snapshot, SnapshotCell, SnapshotStore};
pub use types::{
    Contributes, Dependence, Endpoint, Engines, EntityKind, Extension, Message, Prompt,
    PromptBody, PromptEntry, PromptOrigin, Tool, ToolKind,
};
