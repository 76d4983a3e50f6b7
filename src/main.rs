//! Tiered Cache - cache admin server
//!
//! Composition root: builds the single shared store connection and serves
//! the cache admin API on top of it.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiered_cache::api::{create_router, AppState};
use tiered_cache::config::{Backend, Config};
use tiered_cache::connection::{ConnectionProvider, MemoryConnection, RedisConnection};
use tiered_cache::tasks::spawn_cleanup_task;

/// Main entry point for the cache admin server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the shared store connection (Redis or in-memory)
/// 4. Start the expiry sweeper for the in-memory backend
/// 5. Serve the router until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tiered_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tiered cache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: backend={}, database={}, default_cache_time={}m, port={}",
        config.backend.as_str(),
        config.database,
        config.default_cache_time,
        config.server_port
    );

    match config.backend {
        Backend::Redis => {
            let connection = RedisConnection::connect(&config)
                .await
                .context("Failed to connect to Redis")?;
            info!(endpoints = config.endpoints.len(), "Redis connection initialized");

            serve(Arc::new(connection), &config, None).await
        }
        Backend::Memory => {
            let connection = Arc::new(MemoryConnection::new(config.memory_shards));
            info!(shards = config.memory_shards, "In-memory store initialized");

            let cleanup_handle = spawn_cleanup_task(connection.clone(), config.cleanup_interval);
            info!("Background expiry sweeper started");

            serve(connection, &config, Some(cleanup_handle)).await
        }
    }
}

/// Binds the configured port and serves until a shutdown signal arrives.
async fn serve<P: ConnectionProvider>(
    connection: Arc<P>,
    config: &Config,
    cleanup_handle: Option<JoinHandle<()>>,
) -> anyhow::Result<()> {
    let app = create_router(AppState::new(connection, config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the sweeper task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = cleanup_handle {
        handle.abort();
        warn!("Expiry sweeper aborted");
    }
}
