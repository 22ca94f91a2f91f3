//! Chainroute CLI: command-line interface for a running routing node.
//!
//! Subcommands: route, execute, cancel, status, chains, recommend, stats, health.

mod client;
mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use client::NodeClient;

/// Chainroute: multi-criteria settlement routing.
#[derive(Parser, Debug)]
#[command(name = "chainroute", version, about, long_about = None)]
struct Cli {
    /// API endpoint of the node.
    #[arg(short, long, global = true, default_value = "http://127.0.0.1:8470")]
    endpoint: String,

    /// Print raw JSON responses.
    #[arg(long, global = true)]
    json: bool,

    /// Log HTTP requests.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Route a payment (and optionally execute it).
    Route(commands::route::RouteArgs),
    /// Execute a routed payment.
    Execute(commands::payment::PaymentArgs),
    /// Cancel a payment that has not started executing.
    Cancel(commands::payment::PaymentArgs),
    /// Show the status of a payment.
    Status(commands::payment::PaymentArgs),
    /// List chains or toggle their availability.
    Chains(commands::chains::ChainsArgs),
    /// Preview the chain a payment would likely use.
    Recommend(commands::recommend::RecommendArgs),
    /// Show routing statistics.
    Stats,
    /// Check that the node is up.
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let client = NodeClient::new(&cli.endpoint, cli.json);

    match &cli.command {
        Commands::Route(args) => commands::route::run(&client, args).await,
        Commands::Execute(args) => commands::payment::execute(&client, args).await,
        Commands::Cancel(args) => commands::payment::cancel(&client, args).await,
        Commands::Status(args) => commands::payment::status(&client, args).await,
        Commands::Chains(args) => commands::chains::run(&client, args).await,
        Commands::Recommend(args) => commands::recommend::run(&client, args).await,
        Commands::Stats => commands::stats::run(&client).await,
        Commands::Health => commands::stats::health(&client).await,
    }
}
