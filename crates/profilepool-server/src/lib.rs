//! Profile Pool Server
//!
//! HTTP surface over the lease manager and catalog, plus process bootstrap:
//! the store is opened, the unlock sweeper started, and both are shut down
//! in order when the server stops.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;
pub mod query;

use config::ServerConfig;
use handlers::{create_router, AppState};
use profilepool_store::SqliteStore;
use profilepool_sweeper::{SweeperConfig, SweeperWorker};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Store could not be opened
    #[error("Storage error: {0}")]
    Store(#[from] profilepool_store::StoreError),

    /// Unlock sweeper failed to start or stop
    #[error("Sweeper error: {0}")]
    Sweeper(#[from] profilepool_sweeper::SweeperError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Start the profile pool HTTP server
///
/// Opens the configured database, starts the unlock sweeper and serves
/// until Ctrl+C or SIGTERM.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;

    info!("Starting profile pool server");
    info!("Database: {}", config.database);
    info!(
        "Unlock timeout: {} ms, sweep interval: {} ms",
        config.sweeper.unlock_timeout_ms, config.sweeper.sweep_interval_ms
    );

    let store = Arc::new(SqliteStore::new(&config.database)?);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Profile pool listening on {}", listener.local_addr()?);

    serve(listener, store, config.sweeper, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` completes
///
/// The sweeper runs for exactly as long as the server does.
pub async fn serve<F>(
    listener: TcpListener,
    store: Arc<SqliteStore>,
    sweeper: SweeperConfig,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let sweeper = SweeperWorker::new(Arc::clone(&store), sweeper)?.spawn();

    let app = create_router(AppState::new(store));

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Server(e.to_string()));

    let metrics = sweeper.shutdown().await?;
    info!(
        "Server stopped after {} sweeps ({} stale locks released)",
        metrics.sweep_count, metrics.total_unlocked
    );

    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
