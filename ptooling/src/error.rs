//! Tool dispatch errors and retry classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    NotFound,
    InvalidArguments,
    InvalidDefinition,
    Transport,
    Timeout,
    Unavailable,
    Upstream,
    Decode,
    NotImplemented,
    Cancelled,
    CallFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
    pub retryable: bool,
    pub tool_id: Option<String>,
    pub attempts: u32,
    cause: Option<Box<ToolError>>,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            tool_id: None,
            attempts: 0,
            cause: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound, message, false)
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidArguments, message, false)
    }

    pub fn invalid_definition(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidDefinition, message, false)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Transport, message, true)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Timeout, message, true)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Unavailable, message, true)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Upstream, message, false)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Decode, message, false)
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotImplemented, message, false)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Cancelled, message, false)
    }

    /// Terminal failure after `attempts` tries, keeping the last cause.
    pub fn call_failed(cause: ToolError, attempts: u32) -> Self {
        let message = format!("tool call failed after {attempts} attempt(s): {cause}");
        Self {
            kind: ToolErrorKind::CallFailed,
            message,
            retryable: false,
            tool_id: cause.tool_id.clone(),
            attempts,
            cause: Some(Box::new(cause)),
        }
    }

    pub fn with_tool_id(mut self, tool_id: impl Into<String>) -> Self {
        if self.tool_id.is_none() {
            self.tool_id = Some(tool_id.into());
        }
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn cause(&self) -> Option<&ToolError> {
        self.cause.as_deref()
    }

    /// Innermost error in the cause chain.
    pub fn root_cause(&self) -> &ToolError {
        let mut current = self;
        while let Some(cause) = current.cause() {
            current = cause;
        }
        current
    }

    pub fn is_timeout(&self) -> bool {
        self.root_cause().kind == ToolErrorKind::Timeout
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self.kind,
            ToolErrorKind::InvalidArguments | ToolErrorKind::NotFound
        )
    }
}

impl Display for ToolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (&self.tool_id, self.kind) {
            (Some(tool_id), kind) if kind != ToolErrorKind::CallFailed => {
                write!(f, "{:?} [tool={}]: {}", self.kind, tool_id, self.message)
            }
            _ => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for ToolError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn Error + 'static))
    }
}
