//! Fixed-liquidity LMSR market maker.
//!
//! Cost function `C(q) = b * ln(Σ exp(q_i / b))` with a fixed liquidity
//! parameter `b`. The operator's worst-case loss is known up front:
//! `b * ln(N)`, the cost of seeding the market at the zero vector.

use tracing::debug;

use crate::config::SolverConfig;
use crate::error::EngineError;
use crate::market::{scaled_log_sum_exp, validate_outcomes, CostFunction};
use crate::risk::{LossBound, RiskBound};
use crate::solver;

/// LMSR pricing engine over N named outcomes.
#[derive(Debug, Clone, PartialEq)]
pub struct Lmsr {
    outcomes: Vec<String>,
    balances: Vec<f64>,
    b: f64,
}

impl Lmsr {
    /// Creates a market with all balances at zero.
    pub fn new(outcomes: Vec<String>, b: f64) -> Result<Self, EngineError> {
        validate_outcomes(&outcomes)?;
        if !b.is_finite() || b <= 0.0 {
            return Err(EngineError::InvalidLiquidity(b));
        }
        let balances = vec![0.0; outcomes.len()];
        Ok(Self {
            outcomes,
            balances,
            b,
        })
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    /// Shares outstanding for one outcome.
    pub fn balance(&self, outcome: &str) -> Result<f64, EngineError> {
        Ok(self.balances[self.outcome_index(outcome)?])
    }

    /// Applies a signed share delta to `outcome` and returns the collateral
    /// charged (positive for buys, negative for sells).
    ///
    /// Balances are not allowed to go negative; selling more than is
    /// outstanding fails with [`EngineError::InsufficientShares`].
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
        debug!(outcome, delta, charged, "lmsr trade applied");
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

    /// Worst-case operator loss, `b * ln(N)`. No trading pattern can cost
    /// the operator more than this initial subsidy.
    pub fn max_loss(&self) -> f64 {
        self.b * (self.outcomes.len() as f64).ln()
    }
}

impl CostFunction for Lmsr {
    fn outcomes(&self) -> &[String] {
        &self.outcomes
    }

    fn balances(&self) -> &[f64] {
        &self.balances
    }

    fn cost_at(&self, balances: &[f64]) -> f64 {
        scaled_log_sum_exp(balances, self.b)
    }
}

impl RiskBound for Lmsr {
    fn loss_bound(&self) -> Result<LossBound, EngineError> {
        Ok(LossBound {
            amount: self.max_loss(),
            authoritative: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn binary_market(b: f64) -> Lmsr {
        Lmsr::new(vec!["yes".to_string(), "no".to_string()], b).unwrap()
    }

    #[test]
    fn zero_state_cost_is_b_ln_n() {
        let market = binary_market(100.0);
        let expected = 100.0 * 2.0_f64.ln();
        assert!((market.cost() - expected).abs() < 1e-9);
    }

    #[test]
    fn buying_raises_the_bought_outcome_price() {
        let mut market = binary_market(100.0);
        let before = market.prices().unwrap();
        market.buy("yes", 50.0).unwrap();
        let after = market.prices().unwrap();
        assert!(after["yes"] > before["yes"]);
        assert!(after["no"] < before["no"]);
    }

    #[test]
    fn selling_more_than_outstanding_is_rejected() {
        let mut market = binary_market(100.0);
        market.buy("yes", 10.0).unwrap();
        let err = market.sell("yes", 11.0).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientShares { .. }));
        // A failed sell must not move the balance vector.
        assert!((market.balance("yes").unwrap() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn negative_magnitudes_are_rejected() {
        let mut market = binary_market(100.0);
        assert!(matches!(
            market.buy("yes", -1.0),
            Err(EngineError::InvalidShareQuantity(_))
        ));
        assert!(matches!(
            market.sell("yes", f64::NAN),
            Err(EngineError::InvalidShareQuantity(_))
        ));
    }

    #[test]
    fn unknown_outcome_is_rejected() {
        let market = binary_market(100.0);
        assert_eq!(
            market.trade_cost("maybe", 1.0),
            Err(EngineError::UnknownOutcome("maybe".to_string()))
        );
    }

    #[test]
    fn preview_does_not_mutate_state() {
        let market = binary_market(100.0);
        let preview = market.prices_after_trade("yes", 200.0).unwrap();
        assert!(preview["yes"] > 0.5);
        assert_eq!(market.balance("yes").unwrap(), 0.0);
        assert!((market.cost() - 100.0 * 2.0_f64.ln()).abs() < 1e-9);
    }

    proptest! {
        // A buy followed by selling the same quantity returns the balance
        // vector to its start, and the maker never loses on the pair.
        #[test]
        fn round_trip_is_cost_neutral(
            b in 50.0f64..5000.0,
            shares in 0.1f64..500.0,
            pre_buy in 0.0f64..200.0,
        ) {
            let mut market = binary_market(b);
            market.buy("no", pre_buy).unwrap();
            let held_before = market.balance("yes").unwrap();

            let charged = market.buy("yes", shares).unwrap();
            let credited = market.sell("yes", shares).unwrap();

            prop_assert!(charged >= 0.0);
            prop_assert!(credited >= 0.0);
            prop_assert!(charged - credited > -1e-8);
            prop_assert!((market.balance("yes").unwrap() - held_before).abs() < 1e-9);
        }

        // trade_cost is monotonically non-decreasing in the share delta.
        #[test]
        fn trade_cost_is_monotone(
            b in 50.0f64..5000.0,
            q_yes in 0.0f64..1000.0,
            q_no in 0.0f64..1000.0,
            d1 in 0.0f64..500.0,
            extra in 0.0f64..500.0,
        ) {
            let mut market = binary_market(b);
            market.buy("yes", q_yes).unwrap();
            market.buy("no", q_no).unwrap();

            let small = market.trade_cost("yes", d1).unwrap();
            let large = market.trade_cost("yes", d1 + extra).unwrap();
            prop_assert!(small <= large + 1e-9, "small={small}, large={large}");
        }

        // One-share marginal prices stay inside (0, 1) for LMSR.
        #[test]
        fn prices_are_probability_like(
            b in 50.0f64..5000.0,
            q_yes in 0.0f64..2000.0,
            q_no in 0.0f64..2000.0,
        ) {
            let mut market = binary_market(b);
            market.buy("yes", q_yes).unwrap();
            market.buy("no", q_no).unwrap();

            for (_, price) in market.prices().unwrap() {
                prop_assert!(price > 0.0 && price < 1.0, "price={price}");
            }
        }

        // Cumulative shortfall never exceeds the b*ln(N) subsidy no matter
        // the trade sequence, and collected collateral equals the cost delta
        // (path independence).
        #[test]
        fn loss_never_exceeds_subsidy(
            b in 50.0f64..500.0,
            trades in prop::collection::vec((0usize..2, 0.1f64..100.0), 1..40),
        ) {
            let mut market = binary_market(b);
            let initial_cost = market.cost();
            let mut collected = 0.0;
            for (side, shares) in trades {
                let outcome = if side == 0 { "yes" } else { "no" };
                collected += market.buy(outcome, shares).unwrap();
            }

            let worst_payout = market
                .balances()
                .iter()
                .fold(f64::NEG_INFINITY, |acc, &q| acc.max(q));
            let shortfall = worst_payout - collected;
            prop_assert!(
                shortfall <= market.max_loss() + 1e-6,
                "shortfall={shortfall}, bound={}",
                market.max_loss()
            );
            prop_assert!((collected - (market.cost() - initial_cost)).abs() < 1e-6);
        }
    }
}
