use axum::http::HeaderMap;

use promptshell::{Engine, TraceId};

pub const TRACE_HEADER: &str = "x-trace-id";

/// Shared handler state. Cloning shares the same engine.
#[derive(Debug, Clone)]
pub struct AppState {
    engine: Engine,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

/// Trace id from the request header, or a fresh one.
pub fn trace_id(headers: &HeaderMap) -> TraceId {
    headers
        .get(TRACE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map_or_else(TraceId::next, TraceId::from)
}
