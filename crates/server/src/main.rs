use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sizefit_core::{
    create_event_system, load_config, validate_config, ConversionEvent, Dispatcher,
    EncoderCapabilities, EventSink, EventStore, JobRunner, MemoryEventStore,
};
use sizefit_server::api::create_router;
use sizefit_server::state::AppState;
use sizefit_server::storage::Storage;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Buffer size for the event channel
const EVENT_BUFFER_SIZE: usize = 1000;

/// Events kept in memory for the events endpoint
const EVENT_STORE_CAPACITY: usize = 10_000;

/// How long shutdown waits for queued events to be stored
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

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
    let config_path = std::env::var("SIZEFIT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Upload directory: {:?}", config.storage.upload_dir);
    info!("Converted directory: {:?}", config.storage.converted_dir);

    // Compute config hash for the event log
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    let config_hash_short = &config_hash[..16];

    Storage::new(&config.storage)
        .ensure_dirs()
        .await
        .context("Failed to create storage directories")?;

    // Probe ffmpeg once so missing encoders show up at startup
    let capabilities = EncoderCapabilities::detect(&config.converter).await;
    if !capabilities.ffmpeg_available {
        warn!(
            "ffmpeg not found at {:?}; audio and video conversions will fail",
            config.converter.ffmpeg_path
        );
    } else if capabilities.has_hardware_encoder() {
        info!(
            "Hardware encoders: nvenc={}, amf={}",
            capabilities.h264_nvenc, capabilities.h264_amf
        );
    } else {
        info!("No hardware encoders detected; video uses libx264");
    }

    // Create event system
    let event_store: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new(EVENT_STORE_CAPACITY));
    let (event_handle, event_writer) =
        create_event_system(Arc::clone(&event_store), EVENT_BUFFER_SIZE);

    // Spawn event writer task
    let writer_handle = tokio::spawn(event_writer.run());

    event_handle
        .emit(ConversionEvent::ServiceStarted {
            version: VERSION.to_string(),
            config_hash: config_hash_short.to_string(),
        })
        .await;

    // Conversion stack
    let sink: Arc<dyn EventSink> = Arc::new(event_handle.clone());
    let dispatcher = Arc::new(Dispatcher::from_config(&config.converter, Arc::clone(&sink)));
    let jobs = JobRunner::new(config.jobs.clone(), dispatcher, sink);
    info!(
        "Job runner ready (max_parallel={}, timeout={}s)",
        config.jobs.max_parallel, config.jobs.timeout_secs
    );

    let state = Arc::new(AppState::new(
        config.clone(),
        jobs,
        event_store,
        capabilities,
    ));

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
    event_handle
        .emit(ConversionEvent::ServiceStopped {
            reason: "graceful_shutdown".to_string(),
        })
        .await;

    // Detached jobs may still hold event handles, so the drain is bounded.
    drop(event_handle);

    match tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer_handle).await {
        Ok(_) => info!("Event writer stopped"),
        Err(_) => warn!("Event writer still busy; conversions in flight are abandoned"),
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
