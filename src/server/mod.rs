use crate::config::Config;
use crate::streaming::{self, ActiveStreams};
use anyhow::{Context, Result};
use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod request_id;

pub use error::AppError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    /// Immutable configuration, built once at startup
    pub config: Arc<Config>,
    /// Response bodies currently being streamed
    pub active_streams: ActiveStreams,
    /// Fired on shutdown so open tails stop waiting on their writers
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            active_streams: ActiveStreams::default(),
            shutdown: CancellationToken::new(),
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let live_route = format!("{}/{{*path}}", ctx.config.stream.route_prefix);

    Router::new()
        .route("/health", get(health_check))
        .route(&live_route, get(streaming::serve_live_file))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "active_streams": ctx.active_streams.count(),
    }))
}

/// Start the HTTP server and run until a shutdown signal arrives
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    tracing::info!(
        "Serving {:?} under {} (marker suffix {:?}, poll {}ms)",
        config.stream.base_dir,
        config.stream.route_prefix,
        config.stream.marker_suffix,
        config.stream.poll_interval_ms
    );

    let ctx = AppContext::new(config);
    let app = create_router(ctx.clone());

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(ctx.shutdown.clone()))
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for SIGINT/SIGTERM (or an external cancel), then cancel open tails.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = cancel.cancelled() => {},
    }

    tracing::info!("Shutdown signal received");
    cancel.cancel();
}
