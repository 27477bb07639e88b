//! Chat-completion provider boundary for promptshell.
//!
//! The core treats the model as a single `complete(request) -> completion`
//! call. [`OpenAiCompatibleProvider`] implements it against any
//! OpenAI-compatible endpoint.

mod error;
mod model;
mod openai;
mod provider;
mod secret;

pub mod prelude {
    pub use crate::{
        ChatCompletion, Message, ModelProvider, ModelRequest, OpenAiCompatibleProvider,
        ProviderError, ProviderErrorKind, Role,
    };
    pub use pcommon::{BoxFuture, GenerationOptions};
}

pub use error::{ProviderError, ProviderErrorKind};
pub use model::{ChatCompletion, Choice, Message, ModelRequest, Role, Usage};
pub use openai::{DEFAULT_LLM_TIMEOUT, OpenAiCompatibleProvider};
pub use provider::ModelProvider;
pub use secret::SecretString;
