use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};

use promptshell::Extension;

use super::listed;
use crate::error::ApiError;
use crate::state::AppState;

pub(super) async fn list_extensions(State(state): State<AppState>) -> Response {
    let snapshot = state.engine().extensions();
    Json(listed(snapshot.iter())).into_response()
}

pub(super) async fn get_extension(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Extension>, ApiError> {
    state
        .engine()
        .extension(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("extension '{id}' not found")))
}
