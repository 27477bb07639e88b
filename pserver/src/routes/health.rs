use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub(super) struct Health {
    status: &'static str,
    tools: usize,
    prompts: usize,
    extensions: usize,
    environment: usize,
    chat: bool,
}

pub(super) async fn healthz(State(state): State<AppState>) -> Json<Health> {
    let engine = state.engine();
    Json(Health {
        status: "ok",
        tools: engine.tools().len(),
        prompts: engine.prompts().len(),
        extensions: engine.extensions().len(),
        environment: engine.environment().len(),
        chat: engine.has_chat(),
    })
}
