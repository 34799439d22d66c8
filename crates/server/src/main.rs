use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use phenorun_core::{
    load_config, validate_config, AbortBackend, AbortSignal, CommandGroupProcessor,
    FileLaunchStore, GroupProcessor, JobRunner, LaunchStore, LaunchStoreBackend,
    MarkerFileAbortSignal, MemoryAbortSignal, SqliteLaunchStore,
};

use phenorun_server::api::create_router;
use phenorun_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long running jobs get to reach a checkpoint after shutdown aborts them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("PHENORUN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        "Configuration loaded successfully"
    );
    info!("Data directory: {:?}", config.storage.data_dir);

    std::fs::create_dir_all(&config.storage.data_dir).with_context(|| {
        format!(
            "Failed to create data directory {:?}",
            config.storage.data_dir
        )
    })?;

    // Launch configuration store
    let store: Arc<dyn LaunchStore> = match config.storage.launch_store {
        LaunchStoreBackend::Sqlite => {
            info!("Using SQLite launch store at {:?}", config.storage.database_path);
            Arc::new(
                SqliteLaunchStore::new(&config.storage.database_path)
                    .context("Failed to create launch store")?,
            )
        }
        LaunchStoreBackend::Files => {
            info!("Using file launch store in {:?}", config.storage.data_dir);
            Arc::new(FileLaunchStore::new(&config.storage.data_dir))
        }
    };

    // Abort markers
    let abort: Arc<dyn AbortSignal> = match config.jobs.abort_backend {
        AbortBackend::Memory => Arc::new(MemoryAbortSignal::new()),
        AbortBackend::MarkerFile => {
            info!("Using abort marker files in {:?}", config.storage.data_dir);
            Arc::new(MarkerFileAbortSignal::new(&config.storage.data_dir))
        }
    };

    // Per-group pipeline
    let processor: Arc<dyn GroupProcessor> =
        Arc::new(CommandGroupProcessor::new(config.pipeline.clone()));
    info!(
        "Pipeline command: {} (timeout {}s)",
        config.pipeline.command, config.pipeline.timeout_secs
    );

    let runner = Arc::new(JobRunner::new(
        store,
        abort,
        processor,
        config.storage.data_dir.clone(),
        config.jobs.clone(),
    ));
    let sweeper = runner.spawn_sweeper();

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&runner)));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    let aborted = runner.abort_all();
    if !aborted.is_empty() {
        info!("Aborting {} running job(s)", aborted.len());
        if !runner.wait_idle(SHUTDOWN_GRACE).await {
            warn!("Jobs still running after {:?}, exiting anyway", SHUTDOWN_GRACE);
        }
    }
    sweeper.abort();

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
}
