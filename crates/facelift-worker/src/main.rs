//! Face-restoration worker binary.

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use facelift_engine::{map_network_volume, sync_checkpoints};
use facelift_storage::StorageClient;
use facelift_worker::server::{create_router, AppState};
use facelift_worker::{JobHandler, VideoPipeline, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("facelift=info".parse().unwrap())
        .add_directive("ort=warn".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting facelift-worker");

    // Load configuration
    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Err(e) = facelift_media::check_ffmpeg() {
        error!("{}", e);
        std::process::exit(1);
    }
    if let Err(e) = facelift_media::check_ffprobe() {
        error!("{}", e);
        std::process::exit(1);
    }

    // Bootstrap: map the shared volume (warn-only), then sync checkpoints.
    // The process must not serve jobs without weights.
    let weights = config.weights();
    if let Err(e) = map_network_volume(&weights).await {
        warn!("Could not map network volume: {}", e);
    }
    if let Err(e) = sync_checkpoints(&weights).await {
        error!("Failed to download checkpoints: {}", e);
        std::process::exit(1);
    }

    // Storage client for enhanced video delivery
    let storage = match StorageClient::from_env().await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create storage client: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = storage.check_connectivity().await {
        error!("Storage connectivity check failed: {}", e);
        std::process::exit(1);
    }

    let listen_addr = config.listen_addr.clone();
    let pipeline = match VideoPipeline::new(config, storage) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            error!("Failed to create pipeline: {}", e);
            std::process::exit(1);
        }
    };

    let handler = JobHandler::new(pipeline);
    let app = create_router(AppState { handler });

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind {}: {}", listen_addr, e);
            std::process::exit(1);
        }
    };

    info!("Serving jobs on {}", listen_addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal");
        })
        .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
