//! Worst-case operator loss reporting.
//!
//! The bound itself is computed by each engine (closed form for LMSR,
//! saturation analysis for LS-LMSR); what lives here is the shared shape a
//! settlement layer consumes when sizing the subsidy deposit at market
//! creation.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Maximum collateral the operator can lose across all trading paths and
/// resolutions, given what the engine knows about how it was constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossBound {
    pub amount: f64,

    /// Whether the bound can be relied on for subsidy sizing. False when
    /// the engine was rebuilt from a bare balance vector
    /// (`LsLmsr::from_state`) and the true initial subsidy is unknown.
    pub authoritative: bool,
}

/// Implemented by every cost-function engine that can bound its loss.
pub trait RiskBound {
    fn loss_bound(&self) -> Result<LossBound, EngineError>;
}
