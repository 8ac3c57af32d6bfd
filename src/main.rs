mod api;
mod attestation;
mod chains;
mod config;
mod contracts;
mod db;
mod errors;
mod executors;
mod gas;
mod metrics;
mod scheduler;
mod trackers;
mod types;

use std::sync::Arc;

use chains::ChainRegistry;
use config::Config;
use executors::ExecutorManager;
use trackers::TrackerManager;

fn main() -> eyre::Result<()> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    // Run the async main
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    // Initialize logging
    init_logging();

    tracing::info!("Starting CAT Relayer");

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        mainnet = config.mainnet,
        tracker_interval_ms = config.polling.tracker_interval_ms,
        executor_interval_ms = config.polling.executor_interval_ms,
        "Configuration loaded"
    );

    // Build and validate the chain registry; a missing mapping fails here,
    // not inside a polling pass
    let registry = Arc::new(ChainRegistry::load(config.mainnet)?);
    tracing::info!(chains = registry.len(), "Chain registry validated");

    // Connect to database
    let db = db::create_pool(&config.database.url).await?;
    tracing::info!("Database connected");

    // Run migrations
    db::run_migrations(&db).await?;
    tracing::info!("Database migrations complete");

    // Create shutdown channels
    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    let (shutdown_tx2, shutdown_rx2) = tokio::sync::mpsc::channel::<()>(1);

    // Setup signal handlers
    let shutdown_tx_signal = shutdown_tx.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = shutdown_tx_signal.send(()).await;
        let _ = shutdown_tx2.send(()).await;
    });

    // Create managers
    let tracker_manager = TrackerManager::new(&config, registry.clone(), db.clone());
    let executor_manager = ExecutorManager::new(&config, registry, db.clone())?;

    tracing::info!("Managers initialized, starting processing");

    // Start metrics/API server
    let api_addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.api_port));
    let api_db = db.clone();
    tokio::spawn(async move {
        if let Err(e) = api::start_api_server(api_addr, api_db).await {
            tracing::error!(error = %e, "API server error");
        }
    });

    // Run trackers and executors concurrently
    tokio::select! {
        result = tracker_manager.run(shutdown_rx) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Tracker manager error");
            }
        }
        result = executor_manager.run(shutdown_rx2) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Executor manager error");
            }
        }
    }

    tracing::info!("CAT Relayer stopped");
    Ok(())
}

/// Initialize tracing/logging with structured output
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cat_relayer=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(filter)
        .init();
}

/// Wait for shutdown signals (SIGINT/SIGTERM)
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
