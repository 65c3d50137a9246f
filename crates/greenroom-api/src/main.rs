//! Greenroom API server binary.
//!
//! Runs the HTTP/WebSocket server and the render worker in one process; both
//! share the in-memory job store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use greenroom_api::{create_router, metrics, ApiConfig, AppState};
use greenroom_media::{check_ffprobe, FfmpegEngine, MediaEngine, MediaProber};
use greenroom_queue::{task_queue, JobStore};
use greenroom_worker::{TaskProcessor, Worker, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("greenroom=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }

    info!("Starting greenroom-api");

    let config = ApiConfig::from_env();
    let worker_config = WorkerConfig::from_env();
    info!(
        host = %config.host,
        port = config.port,
        jobs_dir = %config.jobs_dir.display(),
        "API config loaded"
    );

    greenroom_api::error::hide_internal_details(config.is_production());

    tokio::fs::create_dir_all(&config.jobs_dir)
        .await
        .with_context(|| format!("creating jobs directory {}", config.jobs_dir.display()))?;

    let engine: Arc<dyn MediaEngine> = Arc::new(
        FfmpegEngine::locate(&worker_config.ffmpeg_bin).context("locating FFmpeg")?,
    );
    if let Err(e) = check_ffprobe(&worker_config.ffprobe_bin) {
        warn!("{}: uploads will fail until it is installed", e);
    }
    let prober = MediaProber::new(&worker_config.ffprobe_bin);

    // Metrics are on unless explicitly disabled
    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    let metrics_handle = if metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("installing Prometheus recorder")?)
    } else {
        None
    };

    let store = JobStore::new();
    let (queue, receiver) = task_queue();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let processor = TaskProcessor::new(store.clone(), Arc::clone(&engine), worker_config.clone());
    let worker = Worker::new(processor, receiver)
        .with_shutdown(shutdown_rx)
        .spawn();

    let state = AppState::new(
        config.clone(),
        store,
        queue,
        engine,
        prober,
        worker_config.diagnostic_lines,
    );
    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let the worker finish the render it is on
    shutdown_tx.send(true).ok();
    if let Err(e) = worker.await {
        warn!("Worker task ended abnormally: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
