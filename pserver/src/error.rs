//! HTTP error bodies and the mapping from engine errors to status codes.

use std::io;
use std::net::SocketAddr;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use promptshell::{ChatError, EngineError, RenderError, StoreError, ToolError, ToolErrorKind};
use promptshell::pprovider::ProviderError;

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Timeout(String),
    #[error("{0}")]
    BadGateway(String),
    #[error("{0}")]
    NotImplemented(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Timeout(_) => "timeout",
            Self::BadGateway(_) => "bad_gateway",
            Self::NotImplemented(_) => "not_implemented",
            Self::Internal(_) => "internal",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
    success: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        let body = ErrorBody {
            code: self.code(),
            message: self.to_string(),
            success: false,
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl From<ToolError> for ApiError {
    fn from(value: ToolError) -> Self {
        let message = value.to_string();
        match value.kind {
            ToolErrorKind::NotFound => Self::NotFound(message),
            ToolErrorKind::InvalidArguments => Self::BadRequest(message),
            ToolErrorKind::Timeout => Self::Timeout(message),
            ToolErrorKind::NotImplemented => Self::NotImplemented(message),
            ToolErrorKind::CallFailed
            | ToolErrorKind::Upstream
            | ToolErrorKind::Unavailable
            | ToolErrorKind::Transport
            | ToolErrorKind::Decode => Self::BadGateway(message),
            ToolErrorKind::InvalidDefinition | ToolErrorKind::Cancelled => Self::Internal(message),
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(value: RenderError) -> Self {
        match value {
            RenderError::NotFound(_) => Self::NotFound(value.to_string()),
            RenderError::InvalidPrompt(_) | RenderError::InvalidArguments { .. } => {
                Self::BadRequest(value.to_string())
            }
            RenderError::Timeout { .. } => Self::Timeout(value.to_string()),
            // A tool failing inside a template keeps the tool's classification,
            // except that an unknown tool is a server-side template problem.
            RenderError::Tool(err) if err.kind == ToolErrorKind::NotFound => {
                Self::Internal(err.to_string())
            }
            RenderError::Tool(err) => Self::from(err),
            RenderError::TemplateUnavailable(_)
            | RenderError::Template { .. }
            | RenderError::Cancelled
            | RenderError::Internal(_) => Self::Internal(value.to_string()),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(value: ProviderError) -> Self {
        Self::BadGateway(value.to_string())
    }
}

impl From<ChatError> for ApiError {
    fn from(value: ChatError) -> Self {
        match value {
            ChatError::Render(err) => Self::from(err),
            ChatError::Upstream(err) => Self::from(err),
            ChatError::InvalidRequest(_) => Self::BadRequest(value.to_string()),
            ChatError::ProviderMissing => Self::NotImplemented(value.to_string()),
        }
    }
}

/// Startup failures of the server binary.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("document store: {0}")]
    Store(#[from] StoreError),
    #[error("chat provider: {0}")]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("invalid listen address '{addr}': {source}")]
    ListenAddr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("server stopped: {0}")]
    Serve(#[source] io::Error),
    #[error("failed to install tracing subscriber: {0}")]
    Telemetry(String),
}
