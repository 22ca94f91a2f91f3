//! `chainroute stats|health`: Node-wide summaries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::client::NodeClient;

#[derive(Serialize, Deserialize)]
struct ChainStats {
    payments: usize,
    confirmed: usize,
    failed: usize,
    volume_usd: f64,
    fees_usd: f64,
}

#[derive(Serialize, Deserialize)]
struct StatsResponse {
    total_payments: usize,
    by_chain: BTreeMap<String, ChainStats>,
    by_status: BTreeMap<String, usize>,
    avg_confirmation_time_ms: Option<f64>,
    enabled_chains: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_secs: u64,
    payments: usize,
    enabled_chains: usize,
}

pub async fn run(client: &NodeClient) -> anyhow::Result<()> {
    let stats: StatsResponse = client.get("/stats").await?;
    if client.print_json(&stats)? {
        return Ok(());
    }

    println!("Payments: {}", stats.total_payments);
    for (status, count) in &stats.by_status {
        println!("  {:<10} {}", status, count);
    }
    match stats.avg_confirmation_time_ms {
        Some(ms) => println!("Average confirmation: {:.0} ms", ms),
        None => println!("Average confirmation: n/a"),
    }
    println!("Enabled chains: {}", stats.enabled_chains.join(", "));
    println!();
    println!(
        "  {:<12} {:>8} {:>10} {:>8} {:>14} {:>10}",
        "CHAIN", "ROUTED", "CONFIRMED", "FAILED", "VOLUME(USD)", "FEES(USD)"
    );
    for (chain, s) in &stats.by_chain {
        println!(
            "  {:<12} {:>8} {:>10} {:>8} {:>14.2} {:>10.4}",
            chain, s.payments, s.confirmed, s.failed, s.volume_usd, s.fees_usd
        );
    }
    Ok(())
}

pub async fn health(client: &NodeClient) -> anyhow::Result<()> {
    let health: HealthResponse = client.get("/health").await?;
    if !client.print_json(&health)? {
        println!("Node Status:");
        println!("  Status:         {}", health.status);
        println!("  Version:        {}", health.version);
        println!("  Uptime:         {}s", health.uptime_secs);
        println!("  Payments:       {}", health.payments);
        println!("  Enabled chains: {}", health.enabled_chains);
    }
    Ok(())
}
