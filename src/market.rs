//! Shared market-maker surface.
//!
//! Both cost-function variants (fixed-liquidity LMSR and the
//! liquidity-sensitive variant) implement [`CostFunction`]; the inverse
//! solver and the risk-bound logic are written against this trait so they
//! work with either engine.

use std::collections::BTreeMap;

use crate::error::EngineError;

/// Numerically stable `b * ln(Σ exp(q_i / b))`.
///
/// Shifts by the maximum balance before exponentiating so large share
/// vectors don't overflow the exponential.
pub(crate) fn scaled_log_sum_exp(balances: &[f64], b: f64) -> f64 {
    let max = balances.iter().fold(f64::NEG_INFINITY, |acc, &q| acc.max(q));
    let sum: f64 = balances.iter().map(|&q| ((q - max) / b).exp()).sum();
    b * (sum.ln() + max / b)
}

/// Validates an outcome set: at least two entries, no duplicates.
pub(crate) fn validate_outcomes(outcomes: &[String]) -> Result<(), EngineError> {
    if outcomes.len() < 2 {
        return Err(EngineError::TooFewOutcomes(outcomes.len()));
    }
    for (i, outcome) in outcomes.iter().enumerate() {
        if outcomes[..i].contains(outcome) {
            return Err(EngineError::DuplicateOutcome(outcome.clone()));
        }
    }
    Ok(())
}

/// A convex cost function over a share-balance vector.
///
/// Implementors own an ordered outcome set and a parallel balance vector;
/// everything else (trade quoting, price maps, inverse queries) is derived
/// from `cost_at`.
pub trait CostFunction {
    /// Outcome identifiers in construction order. Fixed for the lifetime of
    /// the market; this order is also the tie-break order wherever the
    /// engine has to pick among equal balances.
    fn outcomes(&self) -> &[String];

    /// Current share balances, parallel to [`Self::outcomes`].
    fn balances(&self) -> &[f64];

    /// Evaluates the cost function at an arbitrary balance vector.
    fn cost_at(&self, balances: &[f64]) -> f64;

    /// Total collateral the market maker must hold at the current balances.
    fn cost(&self) -> f64 {
        self.cost_at(self.balances())
    }

    /// Resolves an outcome identifier to its vector index.
    fn outcome_index(&self, outcome: &str) -> Result<usize, EngineError> {
        self.outcomes()
            .iter()
            .position(|o| o == outcome)
            .ok_or_else(|| EngineError::UnknownOutcome(outcome.to_string()))
    }

    /// Collateral delta of a hypothetical trade of `delta` shares (signed)
    /// of `outcome`. Pure; does not mutate the balance vector.
    fn trade_cost(&self, outcome: &str, delta: f64) -> Result<f64, EngineError> {
        let index = self.outcome_index(outcome)?;
        if !delta.is_finite() {
            return Err(EngineError::InvalidShareQuantity(delta));
        }
        let mut after = self.balances().to_vec();
        after[index] += delta;
        let cost = self.cost_at(&after) - self.cost();
        if !cost.is_finite() {
            return Err(EngineError::NonFiniteResult);
        }
        Ok(cost)
    }

    /// One-share marginal price of `outcome` after a hypothetical trade of
    /// `delta` shares of the same outcome.
    ///
    /// This is a discrete marginal (the cost of the *next* whole share),
    /// not the analytic gradient; for deep markets the two converge.
    fn price_after_trade(&self, outcome: &str, delta: f64) -> Result<f64, EngineError> {
        let index = self.outcome_index(outcome)?;
        if !delta.is_finite() {
            return Err(EngineError::InvalidShareQuantity(delta));
        }
        let mut after = self.balances().to_vec();
        after[index] += delta;
        let base = self.cost_at(&after);
        after[index] += 1.0;
        let price = self.cost_at(&after) - base;
        if !price.is_finite() {
            return Err(EngineError::NonFiniteResult);
        }
        Ok(price)
    }

    /// One-share marginal price of every outcome at the current balances.
    fn prices(&self) -> Result<BTreeMap<String, f64>, EngineError> {
        self.prices_at(self.balances())
    }

    /// One-share marginal price of every outcome after a hypothetical trade
    /// of `delta` shares of `outcome`. Used for price-impact previews.
    fn prices_after_trade(
        &self,
        outcome: &str,
        delta: f64,
    ) -> Result<BTreeMap<String, f64>, EngineError> {
        let index = self.outcome_index(outcome)?;
        if !delta.is_finite() {
            return Err(EngineError::InvalidShareQuantity(delta));
        }
        let mut after = self.balances().to_vec();
        after[index] += delta;
        self.prices_at(&after)
    }

    #[doc(hidden)]
    fn prices_at(&self, balances: &[f64]) -> Result<BTreeMap<String, f64>, EngineError> {
        let base = self.cost_at(balances);
        let mut prices = BTreeMap::new();
        let mut probe = balances.to_vec();
        for (index, outcome) in self.outcomes().iter().enumerate() {
            probe[index] += 1.0;
            let price = self.cost_at(&probe) - base;
            probe[index] = balances[index];
            if !price.is_finite() {
                return Err(EngineError::NonFiniteResult);
            }
            prices.insert(outcome.clone(), price);
        }
        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_sum_exp_matches_naive_form() {
        let balances: [f64; 3] = [3.0, 7.0, 1.0];
        let b = 12.0;
        let naive = b * balances.iter().map(|&q| (q / b).exp()).sum::<f64>().ln();
        let stable = scaled_log_sum_exp(&balances, b);
        assert!((naive - stable).abs() < 1e-12, "naive={naive}, stable={stable}");
    }

    #[test]
    fn log_sum_exp_survives_large_balances() {
        // Naive exp(q/b) overflows here; the shifted form must not.
        let balances = [50_000.0, 49_990.0];
        let cost = scaled_log_sum_exp(&balances, 10.0);
        assert!(cost.is_finite());
        assert!(cost >= 50_000.0);
    }

    #[test]
    fn outcome_sets_are_validated() {
        let one = vec!["yes".to_string()];
        assert_eq!(
            validate_outcomes(&one),
            Err(EngineError::TooFewOutcomes(1))
        );

        let dup = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        assert_eq!(
            validate_outcomes(&dup),
            Err(EngineError::DuplicateOutcome("a".to_string()))
        );

        let ok = vec!["a".to_string(), "b".to_string()];
        assert!(validate_outcomes(&ok).is_ok());
    }
}
