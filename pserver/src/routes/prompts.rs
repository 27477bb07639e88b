use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Map, Value};

use promptshell::{ChatCompletion, ChatRequest, PromptEntry, RenderOptions, Rendered};

use super::listed;
use crate::error::ApiError;
use crate::state::{AppState, trace_id};

#[derive(Debug, Deserialize)]
pub(super) struct RenderBody {
    #[serde(default = "empty_args")]
    args: Value,
}

fn empty_args() -> Value {
    Value::Object(Map::new())
}

pub(super) async fn list_prompts(State(state): State<AppState>) -> Response {
    let snapshot = state.engine().prompts();
    Json(listed(snapshot.iter())).into_response()
}

pub(super) async fn get_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PromptEntry>, ApiError> {
    state
        .engine()
        .prompt(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("prompt '{id}' not found")))
}

pub(super) async fn render_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<RenderBody>, JsonRejection>,
) -> Result<Json<Rendered>, ApiError> {
    let Json(body) = payload?;
    let options = RenderOptions::new().with_trace_id(trace_id(&headers));
    let rendered = state.engine().render(&id, body.args, options).await?;
    Ok(Json(rendered))
}

pub(super) async fn chat_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatCompletion>, ApiError> {
    let Json(request) = payload?;
    let options = RenderOptions::new().with_trace_id(trace_id(&headers));
    let completion = state.engine().chat(&id, request, options).await?;
    Ok(Json(completion))
}
