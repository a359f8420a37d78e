//! shipyard-server - release-management REST service
//!
//! Configuration is resolved in order: command-line flags, `SHIPYARD_*`
//! environment variables, TOML config file, compiled defaults.

use anyhow::{Context, Result};
use clap::Parser;
use shipyard_common::config::ServerConfig;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};

use shipyard_server::integrations::Integrations;
use shipyard_server::{build_router, AppState};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "shipyard-server")]
#[command(about = "Release-management REST service")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.config/shipyard/config.toml, then /etc/shipyard/config.toml)
    #[arg(short, long, env = "SHIPYARD_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:5780
    #[arg(short, long)]
    bind: Option<String>,

    /// SQLite database file
    #[arg(short, long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.apply_env();
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    if let Some(database) = args.database {
        config.database.path = Some(database);
    }

    // Initialize tracing subscriber; RUST_LOG wins over the configured level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Log build identification immediately after tracing init
    info!(
        "Starting Shipyard server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    config.validate().context("Invalid configuration")?;
    let addr = config.bind_addr()?;

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());
    let pool = shipyard_common::db::init_database_with(&db_path, config.database.max_connections)
        .await
        .context("Failed to initialize database")?;
    info!("✓ Database ready");

    let integrations = Integrations::from_config(&config).context("Failed to set up integrations")?;

    let state = AppState::new(pool, config, integrations);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("shipyard-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
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
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
