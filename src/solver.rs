//! Inverse queries over a cost function.
//!
//! Neither LMSR variant is algebraically invertible, so "how many shares
//! does X collateral buy" and "how many shares until the price hits Y" are
//! answered numerically: double an upper bound until the probe crosses the
//! limit, then bisect. Both probes (trade cost and post-trade marginal
//! price) are monotonically non-decreasing in the share delta, which is
//! what makes the bisection sound.

use crate::config::SolverConfig;
use crate::error::EngineError;
use crate::market::CostFunction;

/// Absolute stopping tolerance on the share interval width. This bounds the
/// share quantity, not the resulting cost or price; callers needing tighter
/// output tolerance pass a smaller value.
pub const DEFAULT_PRECISION: f64 = 1e-9;

/// Cap on the expansion phase. 2^64 shares is beyond any market this engine
/// will ever see; hitting the cap means the probe is not crossing the limit
/// (e.g. a price target above the saturation price).
pub const DEFAULT_MAX_DOUBLINGS: u32 = 64;

/// Cap on the bisection phase. Bisection always narrows, so this only fires
/// when the interval stalls below f64 resolution; the feasible lower bound
/// is still a correct, conservative answer at that point.
pub const DEFAULT_MAX_BISECTIONS: u32 = 256;

/// Largest `delta >= 0` such that `trade_cost(outcome, delta) <= budget`.
///
/// A non-positive budget buys nothing and returns 0. The result never
/// overshoots the budget; it may be conservative by up to `precision`.
pub fn max_shares_from_cost<F: CostFunction + ?Sized>(
    engine: &F,
    outcome: &str,
    budget: f64,
    precision: f64,
) -> Result<f64, EngineError> {
    let config = SolverConfig {
        precision,
        ..SolverConfig::default()
    };
    max_shares_from_cost_with(engine, outcome, budget, &config)
}

pub fn max_shares_from_cost_with<F: CostFunction + ?Sized>(
    engine: &F,
    outcome: &str,
    budget: f64,
    config: &SolverConfig,
) -> Result<f64, EngineError> {
    engine.outcome_index(outcome)?;
    if !budget.is_finite() {
        return Err(EngineError::NonFiniteResult);
    }
    if budget <= 0.0 {
        return Ok(0.0);
    }
    largest_delta_within(|delta| engine.trade_cost(outcome, delta), budget, config)
}

/// Largest `delta >= 0` such that the one-share marginal price of `outcome`
/// after buying `delta` shares does not exceed `target_price`.
///
/// If the current price already exceeds the target the result is 0.
pub fn max_shares_from_price<F: CostFunction + ?Sized>(
    engine: &F,
    outcome: &str,
    target_price: f64,
    precision: f64,
) -> Result<f64, EngineError> {
    let config = SolverConfig {
        precision,
        ..SolverConfig::default()
    };
    max_shares_from_price_with(engine, outcome, target_price, &config)
}

pub fn max_shares_from_price_with<F: CostFunction + ?Sized>(
    engine: &F,
    outcome: &str,
    target_price: f64,
    config: &SolverConfig,
) -> Result<f64, EngineError> {
    engine.outcome_index(outcome)?;
    if !target_price.is_finite() {
        return Err(EngineError::NonFiniteResult);
    }
    if target_price <= 0.0 {
        return Ok(0.0);
    }
    largest_delta_within(
        |delta| engine.price_after_trade(outcome, delta),
        target_price,
        config,
    )
}

/// Expand-then-bisect search for the largest delta keeping a monotone probe
/// at or below `limit`. `low` is feasible throughout and is what's returned.
fn largest_delta_within<P>(
    mut probe: P,
    limit: f64,
    config: &SolverConfig,
) -> Result<f64, EngineError>
where
    P: FnMut(f64) -> Result<f64, EngineError>,
{
    let mut high = 1.0;
    let mut doublings = 0;
    while probe(high)? < limit {
        high *= 2.0;
        doublings += 1;
        if doublings > config.max_doublings {
            return Err(EngineError::SolverDidNotConverge {
                iterations: doublings,
            });
        }
    }

    let mut low = 0.0;
    let mut bisections = 0;
    while high - low > config.precision && bisections < config.max_bisections {
        let mid = low + (high - low) / 2.0;
        if probe(mid)? <= limit {
            low = mid;
        } else {
            high = mid;
        }
        bisections += 1;
    }
    Ok(low)
}
