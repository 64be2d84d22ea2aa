//! Randomized trade simulation for the pricing engine.
//!
//! Each scenario spins up a market (alternating LMSR and LS-LMSR), applies a
//! long random buy/sell sequence, and checks the financial invariants that
//! must hold regardless of trading pattern:
//!
//! 1. Collected collateral equals the cost-function delta (path independence)
//! 2. The worst-case resolution shortfall never exceeds the loss bound
//! 3. Balances never go negative
//! 4. Ledger-unit accounting stays within rounding distance of float math
//!
//! Scenarios run in parallel via rayon and are seeded per scenario id, so a
//! failure reproduces deterministically.

use std::time::Instant;

use anyhow::{bail, Context, Result};
use rand::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::error::EngineError;
use crate::ledger::{from_ledger_units, to_ledger_units, LEDGER_SCALE};
use crate::lmsr::Lmsr;
use crate::lslmsr::LsLmsr;
use crate::market::CostFunction;
use crate::risk::{LossBound, RiskBound};

/// Fraction of buys quoted through the inverse solver instead of a direct
/// share quantity, to keep the solver under simulation load too.
const BUDGET_QUOTE_PROBABILITY: f64 = 0.2;
const MIN_SELL_SHARES: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineKind {
    Lmsr,
    LsLmsr,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub market_id: usize,
    pub engine: EngineKind,
    pub trades_executed: usize,
    pub sells_executed: usize,
    pub collected_ledger: i128,
    pub loss_bound: f64,
    pub worst_shortfall: f64,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct StressSummary {
    pub scenarios: usize,
    pub total_trades: usize,
    pub total_collected_ledger: i128,
    pub worst_shortfall: f64,
    pub elapsed_ms: u128,
}

/// Either engine variant behind one dispatch point, so a scenario is written
/// once against the shared trade surface.
enum Engine {
    Fixed(Lmsr),
    Sensitive(LsLmsr),
}

impl Engine {
    fn kind(&self) -> EngineKind {
        match self {
            Engine::Fixed(_) => EngineKind::Lmsr,
            Engine::Sensitive(_) => EngineKind::LsLmsr,
        }
    }

    fn trade(&mut self, outcome: &str, delta: f64) -> Result<f64, EngineError> {
        match self {
            Engine::Fixed(e) => e.trade(outcome, delta),
            Engine::Sensitive(e) => e.trade(outcome, delta),
        }
    }

    fn balances(&self) -> &[f64] {
        match self {
            Engine::Fixed(e) => e.balances(),
            Engine::Sensitive(e) => e.balances(),
        }
    }

    fn cost(&self) -> f64 {
        match self {
            Engine::Fixed(e) => e.cost(),
            Engine::Sensitive(e) => e.cost(),
        }
    }

    /// Uniform share offset every balance started at.
    fn offset(&self) -> f64 {
        match self {
            Engine::Fixed(_) => 0.0,
            Engine::Sensitive(e) => e.initial_shares(),
        }
    }

    fn loss_bound(&self) -> Result<LossBound, EngineError> {
        match self {
            Engine::Fixed(e) => e.loss_bound(),
            Engine::Sensitive(e) => e.loss_bound(),
        }
    }

    fn max_shares_from_cost(
        &self,
        outcome: &str,
        budget: f64,
        config: &Config,
    ) -> Result<f64, EngineError> {
        match self {
            Engine::Fixed(e) => e.max_shares_from_cost_with(outcome, budget, &config.solver),
            Engine::Sensitive(e) => e.max_shares_from_cost_with(outcome, budget, &config.solver),
        }
    }
}

fn outcome_names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("outcome-{i}")).collect()
}

fn run_scenario(market_id: usize, config: &Config) -> Result<ScenarioReport> {
    let sim = &config.simulation;
    let started = Instant::now();
    let outcomes = outcome_names(sim.num_outcomes);

    let mut engine = if market_id % 2 == 0 {
        Engine::Fixed(Lmsr::new(outcomes.clone(), sim.liquidity_b)?)
    } else {
        Engine::Sensitive(LsLmsr::new(outcomes.clone(), sim.alpha, sim.initial_shares)?)
    };

    let mut rng = StdRng::seed_from_u64(market_id as u64);
    let initial_cost = engine.cost();
    // Shares held by simulated traders, net of the engine's initial offset.
    let mut positions = vec![0.0_f64; sim.num_outcomes];
    let mut collected_float = 0.0_f64;
    let mut collected_ledger: i128 = 0;
    let mut trades_executed = 0;
    let mut sells_executed = 0;

    for _ in 0..sim.trades_per_market {
        let index = rng.gen_range(0..sim.num_outcomes);
        let outcome = outcomes[index].as_str();

        let delta = if positions[index] > MIN_SELL_SHARES && rng.gen_bool(sim.sell_probability) {
            -(positions[index] * rng.gen_range(0.1..=1.0))
        } else if rng.gen_bool(BUDGET_QUOTE_PROBABILITY) {
            // Quote through the solver the way a settlement layer would:
            // fix a budget, ask for the share quantity it affords.
            let budget = rng.gen_range(0.1..20.0);
            engine.max_shares_from_cost(outcome, budget, config)?
        } else {
            rng.gen_range(0.01..sim.max_trade_shares)
        };
        if delta.abs() < f64::EPSILON {
            continue;
        }

        let charged = engine.trade(outcome, delta)?;
        positions[index] += delta;
        collected_float += charged;
        collected_ledger += to_ledger_units(charged)?;
        trades_executed += 1;
        if delta < 0.0 {
            sells_executed += 1;
        }
    }

    // Invariant 1: path independence.
    let cost_delta = engine.cost() - initial_cost;
    if (collected_float - cost_delta).abs() > 1e-6 {
        bail!(
            "market {market_id}: collected {collected_float} diverged from cost delta {cost_delta}"
        );
    }

    // Invariant 2: resolution shortfall stays under the loss bound.
    let offset = engine.offset();
    let worst_shortfall = engine
        .balances()
        .iter()
        .map(|&q| (q - offset) - collected_float)
        .fold(f64::NEG_INFINITY, f64::max);
    let bound = engine.loss_bound()?;
    // The LS-LMSR bound can sit exactly at the current shortfall (when no
    // further shares are buyable below saturation), so give the comparison
    // room for the float-vs-cost-delta drift allowed above.
    if worst_shortfall > bound.amount + 2e-6 {
        bail!(
            "market {market_id}: shortfall {worst_shortfall} exceeds loss bound {}",
            bound.amount
        );
    }

    // Invariant 3: no balance ever went negative.
    if engine.balances().iter().any(|&q| q < 0.0) {
        bail!("market {market_id}: negative balance after trading");
    }

    // Invariant 4: ledger accounting tracks float math within rounding.
    let ledger_drift = (collected_float - from_ledger_units(collected_ledger)).abs();
    let max_drift = trades_executed as f64 / LEDGER_SCALE as f64;
    if ledger_drift > max_drift + 1e-9 {
        bail!("market {market_id}: ledger drift {ledger_drift} exceeds {max_drift}");
    }

    Ok(ScenarioReport {
        market_id,
        engine: engine.kind(),
        trades_executed,
        sells_executed,
        collected_ledger,
        loss_bound: bound.amount,
        worst_shortfall,
        elapsed_ms: started.elapsed().as_millis(),
    })
}

/// Runs every scenario in parallel and aggregates the reports. Fails on the
/// first violated invariant.
pub fn run_stress(config: &Config) -> Result<StressSummary> {
    let started = Instant::now();
    let sim = &config.simulation;
    info!(
        markets = sim.num_markets,
        outcomes = sim.num_outcomes,
        trades_per_market = sim.trades_per_market,
        "starting stress simulation"
    );

    let reports: Vec<ScenarioReport> = (0..sim.num_markets)
        .into_par_iter()
        .map(|market_id| {
            run_scenario(market_id, config)
                .with_context(|| format!("scenario {market_id} failed"))
        })
        .collect::<Result<_>>()?;

    let summary = StressSummary {
        scenarios: reports.len(),
        total_trades: reports.iter().map(|r| r.trades_executed).sum(),
        total_collected_ledger: reports.iter().map(|r| r.collected_ledger).sum(),
        worst_shortfall: reports
            .iter()
            .map(|r| r.worst_shortfall)
            .fold(f64::NEG_INFINITY, f64::max),
        elapsed_ms: started.elapsed().as_millis(),
    };
    info!(
        scenarios = summary.scenarios,
        total_trades = summary.total_trades,
        elapsed_ms = summary.elapsed_ms as u64,
        "stress simulation passed"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_simulation_holds_invariants() {
        let mut config = Config::default();
        config.simulation.num_markets = 6;
        config.simulation.trades_per_market = 200;

        let summary = run_stress(&config).unwrap();
        assert_eq!(summary.scenarios, 6);
        assert!(summary.total_trades > 0);
    }

    #[test]
    fn scenarios_are_reproducible() {
        let mut config = Config::default();
        config.simulation.num_markets = 1;
        config.simulation.trades_per_market = 100;

        let a = run_scenario(0, &config).unwrap();
        let b = run_scenario(0, &config).unwrap();
        assert_eq!(a.collected_ledger, b.collected_ledger);
        assert_eq!(a.trades_executed, b.trades_executed);
    }
}
