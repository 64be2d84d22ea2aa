//! Configuration for the pricing engine and the stress simulation.
//! Supports environment variables with fallback to defaults.

use std::env;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::solver::{DEFAULT_MAX_BISECTIONS, DEFAULT_MAX_DOUBLINGS, DEFAULT_PRECISION};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub solver: SolverConfig,
    pub simulation: SimulationConfig,
}

/// Tuning for the inverse solver (expanding-bound + bisection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Absolute stopping tolerance on the share interval width.
    pub precision: f64,

    /// Cap on the expansion (doubling) phase.
    pub max_doublings: u32,

    /// Cap on the bisection phase.
    pub max_bisections: u32,
}

/// Parameters for the randomized trade simulation (`stress_test` binary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Scenarios to run; alternates between LMSR and LS-LMSR markets.
    pub num_markets: usize,

    /// Outcomes per simulated market.
    pub num_outcomes: usize,

    /// Trades applied per market.
    pub trades_per_market: usize,

    /// LMSR liquidity parameter.
    pub liquidity_b: f64,

    /// LS-LMSR liquidity scaling factor.
    pub alpha: f64,

    /// LS-LMSR initial-shares offset.
    pub initial_shares: f64,

    /// Probability that a trade is a sell of an existing position.
    pub sell_probability: f64,

    /// Largest single buy, in shares.
    pub max_trade_shares: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            max_doublings: DEFAULT_MAX_DOUBLINGS,
            max_bisections: DEFAULT_MAX_BISECTIONS,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_markets: 100,
            num_outcomes: 4,
            trades_per_market: 1_000,
            liquidity_b: 500.0,
            alpha: 0.05,
            initial_shares: 10.0,
            sell_probability: 0.25,
            max_trade_shares: 50.0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with fallback to
    /// defaults. Invalid values are warned about and replaced rather than
    /// aborting.
    pub fn from_env() -> Self {
        let mut config = Config::default();

        config.solver.precision = env_f64("LMSR_SOLVER_PRECISION", config.solver.precision);
        config.solver.max_doublings =
            env_u32("LMSR_SOLVER_MAX_DOUBLINGS", config.solver.max_doublings);
        config.solver.max_bisections =
            env_u32("LMSR_SOLVER_MAX_BISECTIONS", config.solver.max_bisections);

        config.simulation.num_markets = env_usize("SIM_NUM_MARKETS", config.simulation.num_markets);
        config.simulation.num_outcomes =
            env_usize("SIM_NUM_OUTCOMES", config.simulation.num_outcomes);
        config.simulation.trades_per_market =
            env_usize("SIM_TRADES_PER_MARKET", config.simulation.trades_per_market);
        config.simulation.liquidity_b = env_f64("SIM_LIQUIDITY_B", config.simulation.liquidity_b);
        config.simulation.alpha = env_f64("SIM_ALPHA", config.simulation.alpha);
        config.simulation.initial_shares =
            env_f64("SIM_INITIAL_SHARES", config.simulation.initial_shares);
        config.simulation.sell_probability =
            env_f64("SIM_SELL_PROBABILITY", config.simulation.sell_probability).clamp(0.0, 1.0);
        config.simulation.max_trade_shares =
            env_f64("SIM_MAX_TRADE_SHARES", config.simulation.max_trade_shares);

        config.validate();
        config
    }

    /// Replace out-of-range values with defaults, warning as we go.
    fn validate(&mut self) {
        let defaults = Config::default();

        if self.solver.precision <= 0.0 {
            warn!(
                precision = self.solver.precision,
                "invalid solver precision, using default"
            );
            self.solver.precision = defaults.solver.precision;
        }
        if self.solver.max_doublings == 0 {
            warn!("solver max_doublings must be positive, using default");
            self.solver.max_doublings = defaults.solver.max_doublings;
        }
        if self.solver.max_bisections == 0 {
            warn!("solver max_bisections must be positive, using default");
            self.solver.max_bisections = defaults.solver.max_bisections;
        }
        if self.simulation.num_outcomes < 2 {
            warn!(
                num_outcomes = self.simulation.num_outcomes,
                "markets need at least 2 outcomes, using default"
            );
            self.simulation.num_outcomes = defaults.simulation.num_outcomes;
        }
        if self.simulation.liquidity_b <= 0.0 || !self.simulation.liquidity_b.is_finite() {
            warn!(
                liquidity_b = self.simulation.liquidity_b,
                "invalid liquidity parameter, using default"
            );
            self.simulation.liquidity_b = defaults.simulation.liquidity_b;
        }
        if self.simulation.alpha <= 0.0 || !self.simulation.alpha.is_finite() {
            warn!(alpha = self.simulation.alpha, "invalid alpha, using default");
            self.simulation.alpha = defaults.simulation.alpha;
        }
        if self.simulation.initial_shares <= 0.0 || !self.simulation.initial_shares.is_finite() {
            warn!(
                initial_shares = self.simulation.initial_shares,
                "invalid initial shares offset, using default"
            );
            self.simulation.initial_shares = defaults.simulation.initial_shares;
        }
        if self.simulation.max_trade_shares <= 0.0 || !self.simulation.max_trade_shares.is_finite()
        {
            warn!(
                max_trade_shares = self.simulation.max_trade_shares,
                "invalid max trade size, using default"
            );
            self.simulation.max_trade_shares = defaults.simulation.max_trade_shares;
        }
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_repairs_out_of_range_values() {
        let mut config = Config::default();
        config.solver.precision = -1.0;
        config.simulation.num_outcomes = 1;
        config.simulation.alpha = f64::NAN;
        config.validate();

        assert_eq!(config.solver.precision, DEFAULT_PRECISION);
        assert_eq!(config.simulation.num_outcomes, 4);
        assert_eq!(config.simulation.alpha, 0.05);
    }
}
