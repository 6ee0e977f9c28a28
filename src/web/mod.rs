// PromptDeck: HTTP API (Axum)
//
// JSON routes for the catalog, generation and the run ledger. CORS is
// permissive; this is a single-user local service.

pub mod error;
pub mod handlers;

use crate::service::ToolService;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared state for web handlers.
pub struct WebState {
    pub service: ToolService,
}

impl WebState {
    pub fn new(service: ToolService) -> Arc<Self> {
        Arc::new(Self { service })
    }
}

/// Build the application router.
pub fn router(state: Arc<WebState>) -> Router {
    Router::new()
        .route("/api/categories", get(handlers::list_categories))
        .route(
            "/api/tools",
            get(handlers::list_tools).post(handlers::create_tool),
        )
        .route("/api/tools/{id}", get(handlers::get_tool))
        .route("/api/generate", axum::routing::post(handlers::generate))
        .route(
            "/api/runs",
            get(handlers::list_runs).delete(handlers::delete_all_runs),
        )
        .route("/api/runs/{id}", axum::routing::delete(handlers::delete_run))
        .route("/api/check-env-key", get(handlers::check_env_key))
        .route("/api/models", get(handlers::list_models))
        .route("/api/status", get(handlers::api_status))
        .route("/api/metrics", get(handlers::api_metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API until Ctrl-C, then log the metrics summary.
pub async fn start_web_server(addr: SocketAddr, state: Arc<WebState>) -> anyhow::Result<()> {
    let app = router(state.clone());

    tracing::info!(addr = %addr, "Starting PromptDeck API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped\n{}", state.service.metrics().format_report().await);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
