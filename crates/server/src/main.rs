use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::signal;
use tokio::sync::{broadcast, oneshot};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use milo_core::{
    create_call_dispatch, load_config, shared_context, validate_config, write_blank_config,
    write_report, IntelligenceGateway, LifetimeWatchdog, OsProcessTerminator, PipelineDriver,
    PreviousReportProvider, ProcessTerminator, ReportBuilder, TokioWorkerSpawner, WorkerSpawner,
};

use milo_server::api::create_router;
use milo_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
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

    info!("milo {} starting", VERSION);

    // Determine config path
    let config_path = std::env::var("MILO_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // First run: write a template populated with every default.
    if !config_path.exists() {
        info!("No configuration at {:?}, writing defaults", config_path);
        write_blank_config(&config_path).context("Failed to write blank config")?;
    }

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration; the server must not come up on bad config.
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");

    // Compute config hash for the startup log
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!("Config hash: {}", &config_hash[..16]);

    // One id per pipeline run, carried in intelligence and the report.
    let run_id = Uuid::new_v4().to_string();
    info!("Pipeline run id: {}", run_id);

    // Previous run's report, served back to workers as context.
    let previous_report = PreviousReportProvider::load(&config.report.path).into_report();
    if previous_report.is_some() {
        info!("Previous report loaded from {:?}", config.report.path);
    }

    // Shared call context plus the shutdown signal for the loops.
    let context = shared_context();
    let (shutdown_tx, _) = broadcast::channel(4);

    // Call dispatcher: the single consumer all RPC mutation goes through.
    let (dispatcher, runner) = create_call_dispatch(
        context.clone(),
        config.dispatcher.queue_depth,
        shutdown_tx.subscribe(),
    );
    let runner_handle = tokio::spawn(runner.run());

    let gateway = Arc::new(IntelligenceGateway::new(
        dispatcher,
        run_id.clone(),
        config_json,
        previous_report,
    ));

    // Lifetime watchdog with the real kill capability.
    let terminator: Arc<dyn ProcessTerminator> = Arc::new(OsProcessTerminator::new());
    let watchdog = LifetimeWatchdog::new(
        config.lifetime.clone(),
        context.clone(),
        terminator,
        shutdown_tx.subscribe(),
    );
    let watchdog_handle = tokio::spawn(watchdog.run());

    // Pipeline driver, when any worker is configured. Completion stops
    // the server; without workers the pipeline is driven externally and
    // the server runs until signalled.
    let any_workers = milo_core::MilestoneKind::ALL
        .iter()
        .any(|kind| config.workers.command_for(*kind).is_some());
    let (pipeline_done_tx, pipeline_done_rx) = oneshot::channel();
    let _pipeline_done_tx = if any_workers {
        let spawner: Arc<dyn WorkerSpawner> = Arc::new(TokioWorkerSpawner::new());
        let driver = PipelineDriver::new(Arc::clone(&gateway), spawner, config.workers.clone());
        tokio::spawn(async move {
            if let Err(e) = driver.run().await {
                error!("Pipeline driver stopped early: {}", e);
            }
            let _ = pipeline_done_tx.send(());
        });
        None
    } else {
        info!("No workers configured, pipeline is externally driven");
        Some(pipeline_done_tx)
    };

    // Create app state and router
    let app_state = Arc::new(AppState::new(config.clone(), Arc::clone(&gateway)));
    let app = create_router(app_state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(pipeline_done_rx))
        .await
        .context("Server error")?;

    // Stop the loops; queued units are released as unavailable.
    info!("Server shutting down...");
    let _ = shutdown_tx.send(());
    futures::future::join_all(vec![runner_handle, watchdog_handle]).await;

    // Assemble the final report from the now-quiescent registry.
    let report = {
        let context = context.lock().await;
        ReportBuilder::new(
            context.registry.milestones().to_vec(),
            context.transcript.render(),
            run_id,
            Utc::now(),
        )
        .build()
    };
    info!("Pipeline status: {}", report.pipeline_report.status);

    match write_report(&config.report.path, &report) {
        Ok(()) => info!("Report written to {:?}", config.report.path),
        Err(e) => warn!("Could not write report: {}", e),
    }

    Ok(())
}

/// Wait for shutdown: Ctrl+C, SIGTERM, or pipeline completion.
async fn shutdown_signal(pipeline_done: oneshot::Receiver<()>) {
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
        result = pipeline_done => {
            if result.is_ok() {
                info!("Pipeline complete, stopping server");
            } else {
                // Sender kept alive in externally driven mode; an Err
                // here means the driver task was dropped unexpectedly.
                std::future::pending::<()>().await;
            }
        }
    }
}
