//! Fixed-point collateral ledger units.
//!
//! The engine itself computes in f64, but settlement-facing callers account
//! collateral in integer micro-units so balances add up exactly across
//! trades. Conversions round half-away-from-zero.

use crate::error::EngineError;

/// Micro-units per whole collateral unit.
pub const LEDGER_SCALE: i128 = 1_000_000;

/// Converts a collateral amount to ledger units, rounding half-away-from-zero.
pub fn to_ledger_units(amount: f64) -> Result<i128, EngineError> {
    if !amount.is_finite() {
        return Err(EngineError::NonFiniteResult);
    }
    let scaled = amount * LEDGER_SCALE as f64;
    let rounded = if scaled >= 0.0 {
        (scaled + 0.5).floor()
    } else {
        (scaled - 0.5).ceil()
    };
    Ok(rounded as i128)
}

/// Converts ledger units back to a collateral amount.
pub fn from_ledger_units(units: i128) -> f64 {
    units as f64 / LEDGER_SCALE as f64
}
