//! Cost-function AMM pricing engine for multi-outcome prediction markets.
//!
//! Two market-maker variants share one surface: fixed-liquidity LMSR
//! ([`Lmsr`]) and liquidity-sensitive LS-LMSR ([`LsLmsr`]). On top of them
//! sit a numeric inverse solver ([`solver`]) for budget- and
//! price-constrained quotes, and worst-case loss bounds ([`risk`]) for
//! sizing the operator's subsidy. The engine owns nothing but an in-memory
//! balance vector; collateral custody, authorization, and persistence
//! belong to the settlement layer calling in.

pub mod config;
pub mod error;
pub mod ledger;
pub mod lmsr;
pub mod lslmsr;
pub mod market;
pub mod risk;
pub mod solver;
pub mod stress;

pub use config::{Config, SolverConfig};
pub use error::EngineError;
pub use lmsr::Lmsr;
pub use lslmsr::LsLmsr;
pub use market::CostFunction;
pub use risk::{LossBound, RiskBound};
