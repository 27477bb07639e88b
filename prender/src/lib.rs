//! Prompt rendering for promptshell.
//!
//! Prompts compile into a handlebars registry in which every bound tool is a
//! helper. Rendering runs on a blocking thread under a deadline that excludes
//! time spent inside tool calls.
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use pcache::{EnvironmentTree, Prompt, PromptCatalog, SnapshotCell};
//! use prender::{RenderOptions, Renderer, TemplateCompiler};
//! use serde_json::json;
//!
//! let runtime = tokio::runtime::Builder::new_multi_thread()
//!     .enable_all()
//!     .build()
//!     .expect("runtime should build");
//!
//! let catalog = Arc::new(PromptCatalog::new());
//! catalog.install_direct(HashMap::from([(
//!     "greet".to_string(),
//!     Prompt::template("greet", "Hello {{args.name}}"),
//! )]));
//! let compiler = Arc::new(TemplateCompiler::new());
//! compiler.compile(&catalog);
//!
//! let environment = Arc::new(SnapshotCell::new(EnvironmentTree::default()));
//! let renderer = Renderer::new(catalog, environment, compiler);
//! let rendered = runtime
//!     .block_on(renderer.render("greet", json!({"name": "Ann"}), RenderOptions::new()))
//!     .expect("render should succeed");
//!
//! assert_eq!(rendered.as_prompt(), Some("Hello Ann"));
//! ```

mod clock;
mod compiler;
mod error;
mod functions;
mod renderer;

pub mod prelude {
    pub use crate::{
        FunctionTable, RenderError, RenderOptions, Rendered, Renderer, TemplateCompiler,
        ToolInvoker,
    };
}

pub use clock::{ToolClock, ToolTiming};
pub use compiler::{CompileReport, TemplateCompiler, TemplateSet, message_key, template_key};
pub use error::RenderError;
pub use functions::{FunctionTable, ToolInvoker, helper_name};
pub use renderer::{DEFAULT_RENDER_DEADLINE, RenderOptions, Rendered, Renderer};

/// Re-exported so custom helpers can be written without a direct dependency.
pub use handlebars;
