//! Serve command implementation

use crate::api::{create_router, AppState};
use crate::cli::ServeArgs;
use crate::config::{LogFormat, MemochaConfig};
use crate::llm::GenerationClient;
use crate::store::InMemoryStore;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Load configuration with CLI overrides applied
pub fn load_config_with_overrides(
    args: &ServeArgs,
) -> Result<MemochaConfig, Box<dyn std::error::Error>> {
    // Missing file means defaults; a present but broken file is an error
    let mut config = if args.config.exists() {
        MemochaConfig::load(Some(&args.config))?
    } else {
        tracing::debug!("Config file not found, using defaults");
        MemochaConfig::default()
    };

    config = config.with_env_overrides();

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }

    Ok(config)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG`, when set, replaces the directives built from configuration.
pub fn init_tracing(
    config: &crate::config::LoggingConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = crate::logging::build_filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
    }

    Ok(())
}

/// Wire the store, generation client and router from configuration.
pub fn build_app(config: MemochaConfig) -> Result<Router, Box<dyn std::error::Error>> {
    let http_client = reqwest::Client::builder()
        .pool_max_idle_per_host(10)
        .build()?;

    let config = Arc::new(config);
    let llm = Arc::new(GenerationClient::from_config(&config, http_client));
    let store = Arc::new(InMemoryStore::new());

    tracing::info!(
        model = %llm.settings().model,
        failure_threshold = config.circuit_breaker.failure_threshold,
        max_attempts = config.retry.max_attempts,
        "Generation client ready"
    );

    let state = Arc::new(AppState::new(config, store, llm));
    Ok(create_router(state))
}

/// Wait for shutdown signal (SIGINT or SIGTERM) and cancel the token
async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install CTRL+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
        _ = cancel_token.cancelled() => {}
    }

    cancel_token.cancel();
}

/// Serve `app` on `listener` until `cancel_token` is cancelled.
///
/// In-flight requests are allowed to finish before this returns.
pub async fn serve_until_cancelled(
    listener: TcpListener,
    app: Router,
    cancel_token: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel_token.cancelled().await })
        .await
}

/// Main serve command handler
pub async fn run_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_with_overrides(&args)?;
    config.validate()?;
    config.require_credentials()?;

    init_tracing(&config.logging)?;

    tracing::info!("Starting Memocha server");
    tracing::debug!(?config, "Loaded configuration");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = build_app(config)?;

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Memocha API server listening");

    let cancel_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel_token.clone()));

    serve_until_cancelled(listener, app, cancel_token).await?;

    tracing::info!("Memocha server stopped");
    Ok(())
}
