//! `chainroute execute|cancel|status`: Act on a single payment.

use chainroute_core::{ExecutionResult, PaymentPlan, PaymentStatus};
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::client::NodeClient;
use crate::commands::route::print_plan;

#[derive(Args, Debug)]
pub struct PaymentArgs {
    /// Payment ID returned by `chainroute route`.
    pub payment_id: String,
}

#[derive(Serialize, Deserialize)]
struct Lookup {
    status: PaymentStatus,
    payment: PaymentPlan,
}

pub async fn execute(client: &NodeClient, args: &PaymentArgs) -> anyhow::Result<()> {
    let path = format!("/payments/{}/execute", args.payment_id);
    let result: ExecutionResult = client.post(&path, &serde_json::json!({})).await?;
    if !client.print_json(&result)? {
        println!("Payment confirmed!");
        println!("  Payment ID:     {}", args.payment_id);
        println!("  Tx hash:        {}", result.tx_hash);
        println!("  Confirmations:  {}", result.confirmations);
        println!("  Fee charged:    {}", result.fee_charged);
        println!("  At:             {}", result.timestamp);
    }
    Ok(())
}

pub async fn cancel(client: &NodeClient, args: &PaymentArgs) -> anyhow::Result<()> {
    let path = format!("/payments/{}/cancel", args.payment_id);
    let plan: PaymentPlan = client.post(&path, &serde_json::json!({})).await?;
    if !client.print_json(&plan)? {
        println!("Payment {} is now {}", plan.payment_id, plan.status);
    }
    Ok(())
}

pub async fn status(client: &NodeClient, args: &PaymentArgs) -> anyhow::Result<()> {
    let path = format!("/payments/{}", args.payment_id);
    let lookup: Lookup = client.get(&path).await?;
    if !client.print_json(&lookup)? {
        print_plan(&lookup.payment);
        if let Some(ms) = lookup.payment.confirmation_duration_ms() {
            println!("  Confirmed in:   {} ms", ms);
        }
    }
    Ok(())
}
