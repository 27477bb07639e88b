//! Chat orchestration for promptshell: render a prompt, then complete it.
//!
//! ```rust
//! use pchat::ChatRequest;
//! use serde_json::json;
//!
//! let request = ChatRequest::new("gpt-4o-mini", json!({"name": "Ann"})).with_max_tokens(64);
//! assert_eq!(request.options().max_tokens, Some(64));
//! ```

mod error;
mod service;
mod types;

pub mod prelude {
    pub use crate::{ChatError, ChatRequest, ChatService};
}

pub use error::ChatError;
pub use service::{ChatService, to_chat_messages};
pub use types::ChatRequest;
