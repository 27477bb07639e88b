use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use promptshell::{CallContext, CallStats, Tool};

use super::listed;
use crate::error::ApiError;
use crate::state::{AppState, trace_id};

pub(super) async fn list_tools(State(state): State<AppState>) -> Response {
    let snapshot = state.engine().tools();
    Json(listed(snapshot.iter())).into_response()
}

pub(super) async fn get_tool(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Tool>, ApiError> {
    state
        .engine()
        .tool(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("tool '{id}' not found")))
}

/// Tools that exist but were never called report zeroed stats.
pub(super) async fn tool_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CallStats>, ApiError> {
    let engine = state.engine();
    if engine.tool(&id).is_none() {
        return Err(ApiError::NotFound(format!("tool '{id}' not found")));
    }
    Ok(Json(engine.tool_stats(&id).unwrap_or_default()))
}

pub(super) async fn call_tool(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(args) = payload?;
    let context = CallContext::new(trace_id(&headers));
    tracing::debug!(tool_id = %id, trace_id = %context.trace_id, "tool call requested");

    let result = state.engine().call_tool(&context, &id, args).await?;
    Ok(Json(json!({ "result": result })))
}
