use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use promoter_core::{
    load_config, validate_config, BlobStore, ControlPlane, Deployer, FsBlobStore,
    HttpControlPlane, HttpPipelineCoordinator, LogFormat, PipelineCoordinator, PromotionTrigger,
    SanitizedConfig,
};
use promoter_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    // The subscriber depends on the configuration, so startup failures may
    // happen before any log output exists.
    if let Err(e) = run().await {
        eprintln!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Determine config path
    let config_path = std::env::var("PROMOTER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Invalid configuration")?;

    init_logging(config.logging.format);
    info!("Loaded configuration from {:?}", config_path);

    // Compute config hash for the startup log line
    let config_json = serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        endpoint = %config.deployment.endpoint_name,
        "Starting promoter"
    );

    let store: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(&config.blob_store));
    info!("Blob store rooted at {:?}", config.blob_store.root);

    let control_plane: Arc<dyn ControlPlane> = Arc::new(
        HttpControlPlane::new(
            &config.control_plane,
            Duration::from_millis(config.deployment.poll_interval_ms),
        )
        .context("Failed to create control plane client")?,
    );
    info!("Using control plane at {}", config.control_plane.url);

    let coordinator: Arc<dyn PipelineCoordinator> = Arc::new(
        HttpPipelineCoordinator::new(&config.coordinator)
            .context("Failed to create pipeline coordinator client")?,
    );
    info!("Reporting jobs to {}", config.coordinator.url);

    let deployer = Arc::new(Deployer::new(
        &config.deployment,
        Arc::clone(&store),
        control_plane,
        coordinator,
    ));
    let trigger = Arc::new(PromotionTrigger::new(store, config.trigger.clone()));

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, deployer, trigger));
    let app = create_router(state);

    // Start server
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown. In-flight deployments finish
    // before the process exits.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

fn init_logging(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
    }
}

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
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
