//! HTTP surface for the promptshell engine.
//!
//! [`bootstrap`] turns an [`AppConfig`] into a loaded [`Engine`], [`router`]
//! exposes it over axum, and [`serve`] runs both with background refresh.
//!
//! ```rust
//! use pserver::AppConfig;
//!
//! let config = AppConfig::from_toml("[render]\ndeadline_ms = 250\n").unwrap();
//! assert_eq!(config.render.deadline_ms, 250);
//! assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use promptshell::pobserve::{standard_refresh_hooks, standard_tool_hooks};
use promptshell::pprovider::OpenAiCompatibleProvider;
use promptshell::pstore::create_document_store;
use promptshell::ptooling::TonicRpcTransport;
use promptshell::{Engine, RefreshHandle};
use tokio::net::TcpListener;

pub use config::AppConfig;
pub use error::{ApiError, ServerError};
pub use routes::router;
pub use state::AppState;

/// Builds the engine described by `config` without loading anything yet.
pub fn build_engine(config: &AppConfig) -> Result<Engine, ServerError> {
    let store = create_document_store(config.store.store_config())?;
    let tools = &config.tools;

    let mut builder = Engine::builder()
        .store(store)
        .namespaces(config.store.namespaces())
        .http_timeout(Duration::from_secs(tools.http_timeout_secs))
        .rpc_transport(Arc::new(TonicRpcTransport::new(
            Duration::from_secs(tools.rpc_connect_timeout_secs),
            Duration::from_secs(tools.rpc_call_timeout_secs),
        )))
        .retry_policy(tools.retry_policy())
        .tool_hooks(Arc::new(standard_tool_hooks()))
        .refresh_hooks(Arc::new(standard_refresh_hooks()))
        .render_deadline(config.render.deadline())
        .refresh_timeout(config.refresh.timeout());

    if config.llm.is_enabled() {
        let provider = OpenAiCompatibleProvider::new(
            config.llm.api_base.clone(),
            config.llm.api_key.clone(),
            Duration::from_secs(config.llm.timeout_secs),
        )?;
        builder = builder.provider(Arc::new(provider));
    } else {
        tracing::info!("no llm api_base configured; chat endpoint disabled");
    }

    Ok(builder.build()?)
}

/// Builds the engine, runs the first full refresh, and starts periodic refreshes.
///
/// A failing first refresh is logged and the engine starts with whatever loaded.
pub async fn bootstrap(config: &AppConfig) -> Result<(Engine, RefreshHandle), ServerError> {
    let engine = build_engine(config)?;
    if let Err(err) = engine.refresh_all().await {
        tracing::warn!(error = %err, "initial refresh incomplete; serving partial metadata");
    }
    let refresh = engine.spawn_refresh_tasks(config.refresh.intervals());
    Ok((engine, refresh))
}

pub async fn serve(config: AppConfig) -> Result<(), ServerError> {
    let addr: SocketAddr =
        config
            .server
            .listen_addr
            .parse()
            .map_err(|source| ServerError::ListenAddr {
                addr: config.server.listen_addr.clone(),
                source,
            })?;

    let (engine, refresh) = bootstrap(&config).await?;
    let app = router(AppState::new(engine));

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    tracing::info!(%addr, "promptshell server listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve);

    refresh.shutdown().await;
    tracing::info!("promptshell server stopped");
    served
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "ctrl-c handler unavailable; running until killed");
        std::future::pending::<()>().await;
    }
}
