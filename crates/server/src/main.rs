use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transflow_core::{
    create_authenticator, load_config, validate_config, AdmissionGateway, Authenticator,
    ChannelNotifier, DurableSink, Executor, FanoutNotifier, FfmpegExecutor, FsSink,
    JobOrchestrator, JobStore, SqliteJobStore, StageChainer, WebhookNotifier,
};

use transflow_server::api::create_router;
use transflow_server::state::AppState;

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
    let config_path = std::env::var("TRANSFLOW_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        config_hash = &config_hash[..16],
        auth = config.auth.method.as_str(),
        database = ?config.database.path,
        "Configuration loaded"
    );

    // Authorizer
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    // Job store
    let store: Arc<dyn JobStore> = Arc::new(
        SqliteJobStore::new(&config.database.path).context("Failed to create job store")?,
    );
    info!("Job store initialized");

    // Durable sink and executor
    let sink: Arc<dyn DurableSink> = Arc::new(FsSink::from_config(&config.sink));
    let executor = FfmpegExecutor::new(
        config.executor.clone(),
        Arc::clone(&sink),
        config.sink.key_prefix.clone(),
    );
    if let Err(e) = executor.validate().await {
        warn!(error = %e, "ffmpeg is not usable; jobs will fail until it is");
    }
    let executor: Arc<dyn Executor> = Arc::new(executor);

    // Completion notifiers
    let mut notifier = FanoutNotifier::new();
    if let Some(url) = &config.notifier.webhook_url {
        let webhook = WebhookNotifier::new(url, Duration::from_secs(config.notifier.timeout_secs))
            .context("Failed to create webhook notifier")?;
        info!(url = %url, "Webhook notifications enabled");
        notifier.push(Arc::new(webhook));
    }
    let chain_rx = if config.second_stage.enabled {
        let (channel, rx) = ChannelNotifier::channel(config.notifier.channel_capacity);
        notifier.push(Arc::new(channel));
        Some(rx)
    } else {
        None
    };
    info!(notifiers = ?notifier.names(), "Completion notifier configured");

    // Orchestrator and admission
    let orchestrator = Arc::new(JobOrchestrator::new(
        Arc::clone(&store),
        executor,
        Arc::new(notifier),
        config.executor.budget(),
    ));
    let gateway = Arc::new(AdmissionGateway::new(
        Arc::clone(&authenticator),
        Arc::clone(&orchestrator),
        Duration::from_millis(config.auth.timeout_ms),
    ));

    let chainer_handle = chain_rx.map(|rx| {
        let chainer = StageChainer::new(Arc::clone(&gateway), config.second_stage.clone());
        tokio::spawn(chainer.run(rx))
    });

    // Reconcile jobs left over from a previous run
    orchestrator
        .recover()
        .await
        .context("Failed to recover jobs")?;

    let state = Arc::new(AppState::new(config.clone(), authenticator, gateway));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutting down...");
    if let Some(handle) = chainer_handle {
        handle.abort();
    }

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
}
