use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::state::AppState;

pub(super) async fn environment_tree(State(state): State<AppState>) -> Json<Value> {
    Json(state.engine().environment().root().clone())
}

/// `path` is dotted, e.g. `app.ui.title`.
pub(super) async fn environment_value(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .engine()
        .environ(&path)
        .map(|value| Json(json!({ "value": value })))
        .ok_or_else(|| ApiError::NotFound(format!("environment path '{path}' not found")))
}
