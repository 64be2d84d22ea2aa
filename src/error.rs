//! Error taxonomy for the pricing engine.
//!
//! The engine is pure arithmetic, so the surface is small: parameter
//! validation at construction, trade-size guards, and solver convergence.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("market needs at least 2 outcomes, got {0}")]
    TooFewOutcomes(usize),

    #[error("duplicate outcome '{0}' in outcome set")]
    DuplicateOutcome(String),

    #[error("unknown outcome '{0}'")]
    UnknownOutcome(String),

    #[error("liquidity parameter {0} must be positive and finite")]
    InvalidLiquidity(f64),

    #[error("share quantity {0} must be finite")]
    InvalidShareQuantity(f64),

    #[error("balance for '{outcome}' must be non-negative and finite, got {balance}")]
    InvalidBalance { outcome: String, balance: f64 },

    #[error("balance vector has {actual} entries for {expected} outcomes")]
    BalanceDimensionMismatch { expected: usize, actual: usize },

    #[error("cannot sell {requested} shares of '{outcome}', only {held} outstanding")]
    InsufficientShares {
        outcome: String,
        requested: f64,
        held: f64,
    },

    #[error("solver did not converge after {iterations} expansion steps")]
    SolverDidNotConverge { iterations: u32 },

    #[error("cost evaluation produced a non-finite value")]
    NonFiniteResult,
}
