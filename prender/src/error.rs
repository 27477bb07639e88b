//! Render-time errors.

use std::time::Duration;

use pcache::InvalidPrompt;
use ptooling::ToolError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("prompt '{0}' not found")]
    NotFound(String),
    #[error(transparent)]
    InvalidPrompt(#[from] InvalidPrompt),
    #[error("invalid arguments for prompt '{prompt_id}': {message}")]
    InvalidArguments { prompt_id: String, message: String },
    #[error("rendering '{prompt_id}' exceeded {}ms", .deadline.as_millis())]
    Timeout {
        prompt_id: String,
        deadline: Duration,
    },
    #[error("template '{0}' is not compiled")]
    TemplateUnavailable(String),
    #[error("template '{key}' failed: {message}")]
    Template { key: String, message: String },
    #[error("tool call inside template failed: {0}")]
    Tool(#[source] ToolError),
    #[error("render cancelled")]
    Cancelled,
    #[error("render task failed: {0}")]
    Internal(String),
}

impl RenderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
