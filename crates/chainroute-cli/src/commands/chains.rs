//! `chainroute chains`: List chains or toggle their availability.

use chainroute_core::ChainProfile;
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::client::NodeClient;

#[derive(Args, Debug)]
pub struct ChainsArgs {
    /// Enable this chain.
    #[arg(long, conflicts_with = "disable")]
    pub enable: Option<String>,

    /// Disable this chain.
    #[arg(long)]
    pub disable: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct ChainsResponse {
    chains: Vec<ChainProfile>,
    count: usize,
}

#[derive(Serialize)]
struct SetEnabled {
    enabled: bool,
}

pub async fn run(client: &NodeClient, args: &ChainsArgs) -> anyhow::Result<()> {
    let toggle = match (&args.enable, &args.disable) {
        (Some(id), _) => Some((id, true)),
        (_, Some(id)) => Some((id, false)),
        _ => None,
    };

    if let Some((id, enabled)) = toggle {
        let path = format!("/chains/{}/enabled", id);
        let profile: ChainProfile = client.post(&path, &SetEnabled { enabled }).await?;
        if !client.print_json(&profile)? {
            println!(
                "Chain {} is now {}",
                profile.id,
                if profile.enabled { "enabled" } else { "disabled" }
            );
        }
        return Ok(());
    }

    let resp: ChainsResponse = client.get("/chains").await?;
    if client.print_json(&resp)? {
        return Ok(());
    }

    println!("Chains ({}):", resp.count);
    println!();
    println!(
        "  {:<12} {:<8} {:>14} {:>14} {:>12} {:>10} {:<8} {}",
        "ID", "ASSET", "MIN", "MAX", "FEE", "CONF(ms)", "PRIVACY", "STATE"
    );
    for c in &resp.chains {
        println!(
            "  {:<12} {:<8} {:>14} {:>14} {:>12} {:>10} {:<8} {}",
            c.id.as_str(),
            c.rate_asset(),
            c.min_amount,
            c.max_amount,
            c.avg_fee,
            c.confirmation_time_ms,
            c.privacy_level.to_string(),
            if c.enabled { "enabled" } else { "disabled" }
        );
    }
    Ok(())
}
