//! Image fill proxy - resizing reverse-proxy cache for upstream JPEGs

use blob_store::BlobStore;
use bounded_fetch::BoundedFetcher;
use fill_proxy::{
    start_server, FillOrchestrator, LanczosFill, ProxyConfig, Result, ServerState,
    SharedState,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env().add_directive("fill_proxy=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting image fill proxy...");

    let config = ProxyConfig::from_env()?;
    info!("Port: {}", config.port);
    info!("Storage dir: {:?}", config.storage_dir);
    info!("Cache capacity: {} entries", config.cache_capacity);
    info!(
        "Max fetch size: {} MB",
        config.max_fetch_bytes / (1024 * 1024)
    );
    info!("Fetch timeout: {} seconds", config.fetch_timeout_secs);

    let store = BlobStore::new(config.storage_dir.clone());
    store.init().await?;

    let fetcher = BoundedFetcher::new(config.fetch_config())?;
    let orchestrator = FillOrchestrator::new(
        config.cache_capacity,
        store,
        Arc::new(fetcher),
        Arc::new(LanczosFill::new(config.jpeg_quality)),
    )
    .with_upstream_scheme(config.upstream_scheme.clone());

    let state: SharedState = Arc::new(ServerState::new(orchestrator));

    // Serve until Ctrl-C / SIGTERM
    start_server(state.clone(), config.port, shutdown_signal()).await?;

    if config.wipe_storage_on_shutdown {
        if let Err(e) = state.orchestrator.reset().await {
            error!(error = %e, "Failed to wipe storage on shutdown");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
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
                error!(error = %e, "Failed to listen for SIGTERM");
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
