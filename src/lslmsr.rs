//! Liquidity-sensitive LMSR (LS-LMSR) market maker.
//!
//! Same cost-function shape as LMSR, but the liquidity parameter is derived
//! from activity: `b(q) = alpha * Σ q_i`, recomputed on every evaluation.
//! Depth grows as shares are sold, so early trades move the price more than
//! late ones. A uniform initial-shares offset seeds `b(q)` above zero at
//! launch, and the cost at that seeded vector is snapshotted as the
//! zero-point for collected-collateral and loss accounting.

use tracing::{debug, warn};

use crate::config::SolverConfig;
use crate::error::EngineError;
use crate::market::{scaled_log_sum_exp, validate_outcomes, CostFunction};
use crate::risk::{LossBound, RiskBound};
use crate::solver;

/// Marginal-price level treated as "saturated near certainty" when sizing
/// the worst-case loss.
const PRICE_SATURATION_TARGET: f64 = 0.999;

/// LS-LMSR pricing engine over N named outcomes.
#[derive(Debug, Clone, PartialEq)]
pub struct LsLmsr {
    outcomes: Vec<String>,
    balances: Vec<f64>,
    alpha: f64,
    initial_shares: f64,
    initial_cost: f64,
    subsidy_known: bool,
}

impl LsLmsr {
    /// Creates a market seeded with `initial_shares` of every outcome.
    ///
    /// The offset must be positive: it is the liquidity-seeding subsidy that
    /// keeps `b(q)` non-zero at launch. Rebuilding from a bare balance
    /// vector goes through [`LsLmsr::from_state`] instead.
    pub fn new(
        outcomes: Vec<String>,
        alpha: f64,
        initial_shares: f64,
    ) -> Result<Self, EngineError> {
        validate_outcomes(&outcomes)?;
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(EngineError::InvalidLiquidity(alpha));
        }
        if !initial_shares.is_finite() || initial_shares <= 0.0 {
            return Err(EngineError::InvalidShareQuantity(initial_shares));
        }
        let balances = vec![initial_shares; outcomes.len()];
        let mut engine = Self {
            outcomes,
            balances,
            alpha,
            initial_shares,
            initial_cost: 0.0,
            subsidy_known: true,
        };
        engine.initial_cost = engine.cost();
        Ok(engine)
    }

    /// Rebuilds an engine from an existing balance vector (e.g. read back
    /// from a settlement layer), with an offset of zero.
    ///
    /// The true initial subsidy is unknown on this path, so the loss bound
    /// is only advisory; [`RiskBound::loss_bound`] reports it as such.
    pub fn from_state(
        outcomes: Vec<String>,
        balances: Vec<f64>,
        alpha: f64,
    ) -> Result<Self, EngineError> {
        validate_outcomes(&outcomes)?;
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(EngineError::InvalidLiquidity(alpha));
        }
        if balances.len() != outcomes.len() {
            return Err(EngineError::BalanceDimensionMismatch {
                expected: outcomes.len(),
                actual: balances.len(),
            });
        }
        for (outcome, &balance) in outcomes.iter().zip(&balances) {
            if !balance.is_finite() || balance < 0.0 {
                return Err(EngineError::InvalidBalance {
                    outcome: outcome.clone(),
                    balance,
                });
            }
        }
        let mut engine = Self {
            outcomes,
            balances,
            alpha,
            initial_shares: 0.0,
            initial_cost: 0.0,
            subsidy_known: false,
        };
        engine.initial_cost = engine.cost();
        Ok(engine)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn initial_shares(&self) -> f64 {
        self.initial_shares
    }

    /// Current derived liquidity `b(q) = alpha * Σ q_i`.
    pub fn liquidity(&self) -> f64 {
        self.alpha * self.balances.iter().sum::<f64>()
    }

    /// Shares outstanding for one outcome (including the initial offset).
    pub fn balance(&self, outcome: &str) -> Result<f64, EngineError> {
        Ok(self.balances[self.outcome_index(outcome)?])
    }

    /// Collateral collected since construction: `cost(q) - initial_cost`.
    pub fn collected(&self) -> f64 {
        self.cost() - self.initial_cost
    }

    /// Applies a signed share delta to `outcome` and returns the collateral
    /// charged (positive for buys, negative for sells).
    pub fn trade(&mut self, outcome: &str, delta: f64) -> Result<f64, EngineError> {
        let index = self.outcome_index(outcome)?;
        if !delta.is_finite() {
            return Err(EngineError::InvalidShareQuantity(delta));
        }
        let held = self.balances[index];
        if held + delta < 0.0 {
            return Err(EngineError::InsufficientShares {
                outcome: outcome.to_string(),
                requested: -delta,
                held,
            });
        }
        let before = self.cost();
        self.balances[index] += delta;
        let charged = self.cost() - before;
        if !charged.is_finite() {
            self.balances[index] = held;
            return Err(EngineError::NonFiniteResult);
        }
        debug!(outcome, delta, charged, "ls-lmsr trade applied");
        Ok(charged)
    }

    /// Buys `shares` (non-negative) of `outcome`; returns the collateral
    /// charged.
    pub fn buy(&mut self, outcome: &str, shares: f64) -> Result<f64, EngineError> {
        if !shares.is_finite() || shares < 0.0 {
            return Err(EngineError::InvalidShareQuantity(shares));
        }
        self.trade(outcome, shares)
    }

    /// Sells `shares` (non-negative) of `outcome`; returns the collateral
    /// paid out (non-negative).
    pub fn sell(&mut self, outcome: &str, shares: f64) -> Result<f64, EngineError> {
        if !shares.is_finite() || shares < 0.0 {
            return Err(EngineError::InvalidShareQuantity(shares));
        }
        self.trade(outcome, -shares).map(|charged| -charged)
    }

    /// Largest share quantity purchasable for `budget` collateral.
    pub fn max_shares_from_cost(&self, outcome: &str, budget: f64) -> Result<f64, EngineError> {
        solver::max_shares_from_cost(self, outcome, budget, solver::DEFAULT_PRECISION)
    }

    /// Largest share quantity purchasable before the marginal price of
    /// `outcome` exceeds `target_price`.
    pub fn max_shares_from_price(
        &self,
        outcome: &str,
        target_price: f64,
    ) -> Result<f64, EngineError> {
        solver::max_shares_from_price(self, outcome, target_price, solver::DEFAULT_PRECISION)
    }

    /// Same inverse queries with explicit solver settings.
    pub fn max_shares_from_cost_with(
        &self,
        outcome: &str,
        budget: f64,
        config: &SolverConfig,
    ) -> Result<f64, EngineError> {
        solver::max_shares_from_cost_with(self, outcome, budget, config)
    }

    pub fn max_shares_from_price_with(
        &self,
        outcome: &str,
        target_price: f64,
        config: &SolverConfig,
    ) -> Result<f64, EngineError> {
        solver::max_shares_from_price_with(self, outcome, target_price, config)
    }

    /// Worst-case operator loss given the current state.
    ///
    /// Unlike LMSR there is no closed form; the bound assumes the most
    /// exposed outcome keeps being bought until its marginal price saturates
    /// near certainty, then asks whether collected collateral would cover
    /// the payout. Ties on the largest balance break by construction order
    /// (tied outcomes are interchangeable under the cost function, so the
    /// value does not depend on which one is picked).
    pub fn max_loss(&self) -> Result<f64, EngineError> {
        let (max_index, max_balance) = self
            .balances
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(best_i, best_q), (i, &q)| {
                if q > best_q {
                    (i, q)
                } else {
                    (best_i, best_q)
                }
            });
        let max_outcome = self.outcomes[max_index].clone();

        // Whole shares still buyable before the price saturates.
        let extra = solver::max_shares_from_price(
            self,
            &max_outcome,
            PRICE_SATURATION_TARGET,
            solver::DEFAULT_PRECISION,
        )?
        .floor();
        let extra_collateral = self.trade_cost(&max_outcome, extra)?;

        let payout = max_balance + extra - self.initial_shares;
        let collected = self.collected() + extra_collateral;
        Ok((collected - payout).min(0.0).abs())
    }
}

impl CostFunction for LsLmsr {
    fn outcomes(&self) -> &[String] {
        &self.outcomes
    }

    fn balances(&self) -> &[f64] {
        &self.balances
    }

    fn cost_at(&self, balances: &[f64]) -> f64 {
        let total: f64 = balances.iter().sum();
        // b(q) = 0 would divide by zero inside the exponential sum; the
        // empty market is defined to cost nothing.
        if total == 0.0 {
            return 0.0;
        }
        scaled_log_sum_exp(balances, self.alpha * total)
    }
}

impl RiskBound for LsLmsr {
    fn loss_bound(&self) -> Result<LossBound, EngineError> {
        if !self.subsidy_known {
            warn!(
                alpha = self.alpha,
                "loss bound requested on a from_state engine; the true \
                 initial subsidy is unknown and the bound is advisory"
            );
        }
        Ok(LossBound {
            amount: self.max_loss()?,
            authoritative: self.subsidy_known,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn outcomes(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("outcome-{i}")).collect()
    }

    #[test]
    fn empty_market_costs_nothing() {
        let market = LsLmsr::from_state(outcomes(3), vec![0.0; 3], 0.05).unwrap();
        assert_eq!(market.cost(), 0.0);
        assert_eq!(market.collected(), 0.0);
    }

    #[test]
    fn zero_offset_requires_from_state() {
        let err = LsLmsr::new(outcomes(2), 0.05, 0.0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidShareQuantity(_)));
    }

    #[test]
    fn collected_starts_at_zero_and_tracks_charges() {
        let mut market = LsLmsr::new(outcomes(2), 0.05, 10.0).unwrap();
        assert!(market.collected().abs() < 1e-12);

        let mut charged = 0.0;
        charged += market.buy("outcome-0", 25.0).unwrap();
        charged += market.buy("outcome-1", 5.0).unwrap();
        assert!((market.collected() - charged).abs() < 1e-9);
    }

    #[test]
    fn liquidity_deepens_with_activity() {
        let mut market = LsLmsr::new(outcomes(2), 0.05, 10.0).unwrap();
        let before = market.liquidity();
        market.buy("outcome-0", 100.0).unwrap();
        market.buy("outcome-1", 100.0).unwrap();
        assert!(market.liquidity() > before);

        // Deeper market: the same one-share trade moves the price less.
        let shallow = LsLmsr::new(outcomes(2), 0.05, 10.0).unwrap();
        let shallow_impact = shallow.trade_cost("outcome-0", 5.0).unwrap()
            - shallow.trade_cost("outcome-0", 4.0).unwrap();
        let deep_impact = market.trade_cost("outcome-0", 5.0).unwrap()
            - market.trade_cost("outcome-0", 4.0).unwrap();
        assert!(deep_impact < shallow_impact);
    }

    #[test]
    fn loss_bound_flags_follow_construction_path() {
        let seeded = LsLmsr::new(outcomes(2), 0.05, 10.0).unwrap();
        assert!(seeded.loss_bound().unwrap().authoritative);

        let rebuilt = LsLmsr::from_state(outcomes(2), vec![10.0, 10.0], 0.05).unwrap();
        assert!(!rebuilt.loss_bound().unwrap().authoritative);
    }

    #[test]
    fn loss_bound_covers_resolution_at_current_state() {
        let mut market = LsLmsr::new(outcomes(2), 0.05, 10.0).unwrap();
        market.buy("outcome-0", 50.0).unwrap();
        market.buy("outcome-1", 5.0).unwrap();

        // Loss if the most exposed outcome resolved right now.
        let current_loss = (market.balance("outcome-0").unwrap() - market.initial_shares())
            - market.collected();
        let bound = market.max_loss().unwrap();
        assert!(
            bound + 1e-6 >= current_loss.max(0.0),
            "bound={bound}, current_loss={current_loss}"
        );
    }

    proptest! {
        #[test]
        fn trade_cost_is_monotone(
            alpha in 0.01f64..0.5,
            seed in 1.0f64..100.0,
            d1 in 0.0f64..200.0,
            extra in 0.0f64..200.0,
        ) {
            let market = LsLmsr::new(outcomes(3), alpha, seed).unwrap();
            let small = market.trade_cost("outcome-1", d1).unwrap();
            let large = market.trade_cost("outcome-1", d1 + extra).unwrap();
            prop_assert!(small <= large + 1e-9);
        }

        #[test]
        fn round_trip_returns_balances(
            alpha in 0.01f64..0.5,
            seed in 1.0f64..100.0,
            shares in 0.1f64..200.0,
        ) {
            let mut market = LsLmsr::new(outcomes(2), alpha, seed).unwrap();
            let charged = market.buy("outcome-0", shares).unwrap();
            let credited = market.sell("outcome-0", shares).unwrap();
            prop_assert!(charged - credited > -1e-8);
            prop_assert!((market.balance("outcome-0").unwrap() - seed).abs() < 1e-9);
        }
    }
}
