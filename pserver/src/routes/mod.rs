//! Route table for the HTTP surface.

use axum::Router;
use axum::routing::{get, post};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod environs;
mod extensions;
mod health;
mod prompts;
mod tools;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/api/tools", get(tools::list_tools))
        .route("/api/tools/{id}", get(tools::get_tool))
        .route("/api/tools/{id}/stats", get(tools::tool_stats))
        .route("/api/tools/{id}/call", post(tools::call_tool))
        .route("/api/prompts", get(prompts::list_prompts))
        .route("/api/prompts/{id}", get(prompts::get_prompt))
        .route("/api/prompts/{id}/render", post(prompts::render_prompt))
        .route("/api/prompts/{id}/chat", post(prompts::chat_prompt))
        .route("/api/extensions", get(extensions::list_extensions))
        .route("/api/extensions/{id}", get(extensions::get_extension))
        .route("/api/environs", get(environs::environment_tree))
        .route("/api/environs/{path}", get(environs::environment_value))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A listed entity with its id inlined next to its fields.
#[derive(Debug, Serialize)]
struct Listed<'a, T: Serialize> {
    id: &'a str,
    #[serde(flatten)]
    item: &'a T,
}

fn listed<'a, T: Serialize>(entries: impl Iterator<Item = (&'a String, &'a T)>) -> Vec<Listed<'a, T>> {
    let mut listed: Vec<Listed<'a, T>> = entries
        .map(|(id, item)| Listed {
            id: id.as_str(),
            item,
        })
        .collect();
    listed.sort_unstable_by(|left, right| left.id.cmp(right.id));
    listed
}
