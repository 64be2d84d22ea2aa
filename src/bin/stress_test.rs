//! Binary entry point for running the trade simulation
//! Run with: cargo run --bin stress_test

use anyhow::Result;
use lmsr_engine::config::Config;
use lmsr_engine::stress;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("info,lmsr_engine=debug")
        .init();

    println!("🚀 LMSR Pricing Engine Stress Test");
    println!("==================================\n");

    let config = Config::from_env();
    println!("Configuration loaded:");
    println!("  - Markets: {}", config.simulation.num_markets);
    println!("  - Outcomes per market: {}", config.simulation.num_outcomes);
    println!(
        "  - Trades per market: {}",
        config.simulation.trades_per_market
    );
    println!("  - LMSR b: {}", config.simulation.liquidity_b);
    println!("  - LS-LMSR alpha: {}\n", config.simulation.alpha);

    let summary = stress::run_stress(&config)?;
    println!("\n{}", serde_json::to_string_pretty(&summary)?);

    println!("\n✅ Stress test completed successfully!");
    Ok(())
}
