//! Release Daemon - batch release workflow service
//!
//! The daemon provides:
//! - REST API for templates, releases, checkpoints and approvals
//! - Background compliance document generation
//! - Demo or file-based seed data for the processing ledger and role directory

use clap::Parser;
use release_daemon::{DaemonConfig, DaemonError, Fixtures, Server};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Release Daemon CLI
#[derive(Parser)]
#[command(name = "released")]
#[command(about = "Release Daemon - batch release workflow service", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "RELEASE_CONFIG")]
    config: Option<String>,

    /// Listen address (overrides the configuration file)
    #[arg(short, long, env = "RELEASE_LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level (overrides the configuration file)
    #[arg(long, env = "RELEASE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "RELEASE_LOG_JSON")]
    json: bool,

    /// JSON fixtures file seeding templates, batches and roles
    #[arg(short, long, env = "RELEASE_FIXTURES")]
    fixtures: Option<PathBuf>,

    /// Start without the built-in demo data
    #[arg(long)]
    no_demo: bool,
}

#[tokio::main]
async fn main() -> Result<(), DaemonError> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;
    if cli.fixtures.is_some() {
        config.fixtures.path = cli.fixtures;
    }
    if cli.no_demo {
        config.fixtures.demo = false;
    }

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let fixtures = match &config.fixtures.path {
        Some(path) => Fixtures::load(path)?,
        None if config.fixtures.demo => Fixtures::demo(),
        None => Fixtures::default(),
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        documents = config.engine.generate_documents,
        "Starting release daemon"
    );

    let server = Server::new(config, &fixtures)?;
    server.run().await
}
