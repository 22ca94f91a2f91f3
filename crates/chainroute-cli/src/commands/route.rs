//! `chainroute route`: Route a payment through the node.

use chainroute_core::{
    CostPreference, ExecutionResult, PaymentPlan, PaymentRequest, PrivacyLevel, SpeedTier,
};
use clap::Args;
use serde::de::DeserializeOwned;

use crate::client::NodeClient;

#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Sender identifier.
    #[arg(long)]
    pub from: String,

    /// Recipient identifier.
    #[arg(long)]
    pub to: String,

    /// Amount in `currency` units.
    #[arg(short, long)]
    pub amount: f64,

    /// Currency code (e.g., USD, EUR, BTC).
    #[arg(short, long, default_value = "USD")]
    pub currency: String,

    /// Privacy tier: low, medium, high, maximum.
    #[arg(long, default_value = "low", value_parser = parse_choice::<PrivacyLevel>)]
    pub privacy: PrivacyLevel,

    /// Speed tier: instant, fast, normal, patient.
    #[arg(long, default_value = "normal", value_parser = parse_choice::<SpeedTier>)]
    pub speed: SpeedTier,

    /// Cost preference: minimize, balanced, dont_care.
    #[arg(long, default_value = "balanced", value_parser = parse_choice::<CostPreference>)]
    pub cost: CostPreference,

    /// Free-form reason attached to the payment.
    #[arg(long, default_value = "")]
    pub reason: String,

    /// Execute the payment right after routing it.
    #[arg(long)]
    pub execute: bool,
}

/// Parse a lowercase choice through the type's serde names.
pub fn parse_choice<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_ascii_lowercase()))
        .map_err(|_| format!("unknown value '{}'", raw))
}

pub async fn run(client: &NodeClient, args: &RouteArgs) -> anyhow::Result<()> {
    let request = PaymentRequest::new(&args.from, &args.to, args.amount, &args.currency)
        .with_privacy(args.privacy)
        .with_speed(args.speed)
        .with_cost(args.cost)
        .with_reason(&args.reason);

    let plan: PaymentPlan = client.post("/payments", &request).await?;
    if !client.print_json(&plan)? {
        print_plan(&plan);
    }

    if args.execute {
        let path = format!("/payments/{}/execute", plan.payment_id);
        let result: ExecutionResult = client.post(&path, &serde_json::json!({})).await?;
        if !client.print_json(&result)? {
            println!();
            println!("Payment confirmed!");
            println!("  Tx hash:        {}", result.tx_hash);
            println!("  Confirmations:  {}", result.confirmations);
            println!("  Fee charged:    {}", result.fee_charged);
        }
    }
    Ok(())
}

pub fn print_plan(plan: &PaymentPlan) {
    println!("Payment routed");
    println!("  Payment ID:     {}", plan.payment_id);
    println!("  Status:         {}", plan.status);
    println!(
        "  Amount:         {} {}",
        plan.request.amount, plan.request.currency
    );
    println!("  Chain:          {} ({:.8} native)", plan.chain, plan.chain_amount);
    println!(
        "  Fee:            {:.8} native / {:.4} USD",
        plan.fee.native, plan.fee.usd
    );
    println!(
        "  Score:          {:.2} (amount {:.1}, privacy {:.1}, speed {:.1}, cost {:.1})",
        plan.total_score,
        plan.score.amount_fit,
        plan.score.privacy_match,
        plan.score.speed_match,
        plan.score.cost_efficiency
    );
    println!("  Mixing:         {}", if plan.needs_mixing { "yes" } else { "no" });
    println!("  ETA:            {}", plan.estimated_confirmation_at);
    if let Some(tx) = &plan.tx_hash {
        println!("  Tx hash:        {}", tx);
    }
    if let Some(reason) = &plan.failure {
        println!("  Failure:        {}", reason);
    }
    for alt in &plan.alternatives {
        println!("  Alternative:    {} (score {:.2})", alt.chain, alt.total_score);
    }
}
