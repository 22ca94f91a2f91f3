//! Chainroute node: entry point.
//!
//! Starts the settlement routing service with configuration from a TOML file
//! or defaults.

mod api;
mod config;
mod node;
mod state;
mod storage;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::NodeConfig;
use node::ChainrouteNode;

/// Chainroute settlement routing node
#[derive(Parser, Debug)]
#[command(name = "chainroute-node", version, about = "Chainroute settlement routing node")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "chainroute.toml")]
    config: PathBuf,

    /// Override the API port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Run without persistent storage.
    #[arg(long)]
    no_storage: bool,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (text, json).
    #[arg(long)]
    log_format: Option<String>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = NodeConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(api_port) = args.api_port {
        config.api.port = api_port;
    }
    if let Some(ref data_dir) = args.data_dir {
        config.storage.data_dir = data_dir.clone();
    }
    if args.no_storage {
        config.storage.enabled = false;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }

    init_tracing(&config.logging.level, &config.logging.format);

    // Handle --init flag
    if args.init {
        NodeConfig::default().save(&args.config)?;
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    tracing::info!("Chainroute node v{}", env!("CARGO_PKG_VERSION"));

    // Create and start the node
    let mut node = ChainrouteNode::new(config)?;
    if args.config.exists() {
        node = node.with_config_path(&args.config);
    }
    node.start().await?;
    tracing::info!(
        chains = node.engine().registry().len(),
        enabled = node.engine().registry().enabled_ids().len(),
        "routing engine ready"
    );

    // Set up graceful shutdown on SIGINT/SIGTERM
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
        tracing::info!("received shutdown signal");
    };

    tokio::select! {
        result = node.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "node event loop error");
            }
        }
        _ = shutdown => {
            tracing::info!("initiating graceful shutdown");
        }
    }

    node.shutdown().await?;
    tracing::info!("Chainroute node exited cleanly");
    Ok(())
}
