use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sketchloop_core::{
    load_config, validate_config, ArtifactRetriever, ChromiumLauncher, FfmpegTranscoder,
    HttpRetriever, JobStore, RenderService, SessionLauncher, SqliteJobStore, Transcoder,
};
use sketchloop_server::api::create_router;
use sketchloop_server::state::AppState;

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
    let config_path = std::env::var("SKETCHLOOP_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Storage root: {:?}", config.storage.root);

    // Storage layout
    config
        .storage
        .ensure_dirs()
        .await
        .with_context(|| format!("Failed to create storage under {:?}", config.storage.root))?;

    // Create SQLite job store
    let store: Arc<dyn JobStore> = Arc::new(
        SqliteJobStore::new(&config.database.path).context("Failed to create job store")?,
    );
    info!("Job store initialized");

    // Create artifact retriever
    let retriever: Arc<dyn ArtifactRetriever> = Arc::new(
        HttpRetriever::new(&config.retriever).context("Failed to create HTTP retriever")?,
    );
    info!("Asset base URL: {}", config.retriever.asset_base_url);

    // Create transcoder; a missing ffmpeg only fails the jobs that reach it
    let transcoder = FfmpegTranscoder::new(config.transcoder.clone());
    match transcoder.validate().await {
        Ok(()) => info!("Transcoder ready: {}", transcoder.name()),
        Err(e) => warn!("Transcoder unavailable, jobs will fail at transcoding: {}", e),
    }
    let transcoder: Arc<dyn Transcoder> = Arc::new(transcoder);

    // Create browser launcher
    let launcher: Arc<dyn SessionLauncher> = Arc::new(ChromiumLauncher::new(
        config.browser.clone(),
        config.wizard.clone(),
    ));
    info!(
        "Browser launcher: {} (headless: {})",
        launcher.name(),
        config.browser.headless
    );

    let render = Arc::new(RenderService::new(
        launcher,
        retriever,
        transcoder,
        store,
        config.render_settings(),
    ));

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, render));
    let app = create_router(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
