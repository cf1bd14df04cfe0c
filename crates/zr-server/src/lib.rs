//! zr-server: HTTP API and the media generation pipeline.
//!
//! This crate ties the other zr-* crates into a running server:
//!
//! - Axum HTTP API for accounts (`/register`, `/login`, `/verify`) and
//!   generation (`/ai-generate`), plus static serving of `/outputs`
//! - Asset store, input resolver and a bounded pool of encoding jobs
//! - Graceful shutdown via signal handling

pub mod auth;
pub mod context;
pub mod error;
pub mod middleware;
pub mod pipeline;
pub mod router;
pub mod routes;

use std::net::SocketAddr;

use zr_core::config::Config;

use crate::context::AppContext;

/// Start the zoomreel server.
///
/// Opens the database, discovers ffmpeg, builds the [`AppContext`] and serves
/// HTTP until a shutdown signal arrives.
pub async fn start(config: Config) -> zr_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let db_path = config.server.db_path.clone();
    let existed = db_path.exists();
    let db = zr_db::pool::init_pool(&db_path)?;
    if existed {
        tracing::info!("Database opened (existing) at {}", db_path.display());
    } else {
        tracing::info!("Database created (new) at {}", db_path.display());
    }

    let tools = zr_av::ToolRegistry::discover(&config.tools);
    for info in tools.check_all() {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        }
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| zr_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let ctx = AppContext::build(config, db, tools)?;
    let app = router::build_router(ctx.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| zr_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!(
        "Listening on {addr}; public URL {}",
        ctx.config.public_base_url()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| zr_core::Error::Internal(format!("Server error: {e}")))?;

    ctx.jobs.shutdown();
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
