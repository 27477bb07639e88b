//! Chat-layer errors.

use pprovider::ProviderError;
use prender::RenderError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChatError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("chat completion failed: {0}")]
    Upstream(#[source] ProviderError),
    #[error("invalid chat request: {0}")]
    InvalidRequest(String),
    #[error("no chat provider is configured")]
    ProviderMissing,
}

impl From<ProviderError> for ChatError {
    fn from(value: ProviderError) -> Self {
        Self::Upstream(value)
    }
}
