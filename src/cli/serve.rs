//! Serve command implementation

use crate::api::{create_router, AppState};
use crate::cli::config::load_config;
use crate::cli::ServeArgs;
use crate::config::{HelpdeskConfig, LogFormat};
use crate::router::Orchestrator;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Load configuration with serve-specific CLI overrides
pub fn load_config_with_overrides(
    args: &ServeArgs,
) -> Result<HelpdeskConfig, Box<dyn std::error::Error>> {
    let mut config = load_config(&args.core)?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Initialize tracing based on configuration
///
/// Logs go to stderr so `ask --json` output stays machine-readable.
pub fn init_tracing(
    config: &crate::config::LoggingConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = crate::logging::build_filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    if config.enable_content_logging {
        eprintln!(
            "WARNING: Content logging is enabled. Message previews will appear in routing events."
        );
        eprintln!("         This may include personal data. Use only for debugging.");
    }

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for CTRL+C");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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

/// Main serve command handler
pub async fn run_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load and merge configuration
    let config = load_config_with_overrides(&args)?;

    // 2. Initialize tracing
    init_tracing(&config.logging)?;

    tracing::info!("Starting helpdesk server");
    tracing::debug!(?config, "Loaded configuration");

    // 3. Build the routing core
    let orchestrator = Arc::new(Orchestrator::builder(config.clone()).build()?);

    // 4. Build API router
    let state = Arc::new(AppState::new(orchestrator, Arc::new(config.clone())));
    let app = create_router(state);

    // 5. Bind and serve
    let addr = config.server.bind_addr();
    tracing::info!(addr = %addr, "Helpdesk API server listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let cancel_token = CancellationToken::new();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token.clone()))
        .await?;

    tracing::info!("Helpdesk server stopped");
    Ok(())
}
