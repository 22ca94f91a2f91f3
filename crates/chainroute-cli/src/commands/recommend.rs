//! `chainroute recommend`: Preview the chain a payment would likely use.

use chainroute_core::PrivacyLevel;
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::client::NodeClient;
use crate::commands::route::parse_choice;

#[derive(Args, Debug)]
pub struct RecommendArgs {
    /// Amount in `currency` units.
    #[arg(short, long)]
    pub amount: f64,

    /// Currency code.
    #[arg(short, long, default_value = "USD")]
    pub currency: String,

    /// Privacy tier: low, medium, high, maximum.
    #[arg(long, default_value = "low", value_parser = parse_choice::<PrivacyLevel>)]
    pub privacy: PrivacyLevel,
}

#[derive(Serialize)]
struct Query<'a> {
    amount: f64,
    currency: &'a str,
    privacy: PrivacyLevel,
}

#[derive(Serialize, Deserialize)]
struct RecommendResponse {
    chain: String,
}

pub async fn run(client: &NodeClient, args: &RecommendArgs) -> anyhow::Result<()> {
    let query = Query {
        amount: args.amount,
        currency: &args.currency,
        privacy: args.privacy,
    };
    let resp: RecommendResponse = client.get_query("/recommend", &query).await?;
    if !client.print_json(&resp)? {
        println!(
            "Recommended chain for {} {} at {} privacy: {}",
            args.amount, args.currency, args.privacy, resp.chain
        );
    }
    Ok(())
}
