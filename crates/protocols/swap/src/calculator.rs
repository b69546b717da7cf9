//! Swap Calculator
//!
//! Slippage protection and decimal amount conversion. All arithmetic is on
//! integer base units; pricing itself comes from the pool's `getQuote`.

use std::fmt;

use alloy_primitives::utils::{format_units, parse_units};
use serde::{Deserialize, Serialize};
use swiftswap_core::constants::{BPS_DENOMINATOR, DEFAULT_SLIPPAGE_BPS};
use swiftswap_core::{DexError, U256};

/// Maximum tolerated shortfall from the quoted output, in basis points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct SlippageTolerance(u16);

impl SlippageTolerance {
    pub fn from_bps(bps: u16) -> Result<Self, DexError> {
        if bps > BPS_DENOMINATOR {
            return Err(DexError::InvalidAmount {
                message: format!("slippage {} bps exceeds {}", bps, BPS_DENOMINATOR),
            });
        }
        Ok(Self(bps))
    }

    pub fn bps(&self) -> u16 {
        self.0
    }
}

impl Default for SlippageTolerance {
    fn default() -> Self {
        Self(DEFAULT_SLIPPAGE_BPS)
    }
}

impl TryFrom<u16> for SlippageTolerance {
    type Error = DexError;

    fn try_from(bps: u16) -> Result<Self, Self::Error> {
        Self::from_bps(bps)
    }
}

impl From<SlippageTolerance> for u16 {
    fn from(slippage: SlippageTolerance) -> Self {
        slippage.0
    }
}

impl fmt::Display for SlippageTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

/// Minimum acceptable output for a quote under `slippage`
///
/// Formula: amount_out * (10000 - bps) / 10000, rounded down
pub fn min_amount_out(amount_out: U256, slippage: SlippageTolerance) -> U256 {
    let keep = U256::from(BPS_DENOMINATOR - slippage.bps());
    let denom = U256::from(BPS_DENOMINATOR);

    match amount_out.checked_mul(keep) {
        Some(product) => product / denom,
        // Only reachable for amounts near U256::MAX
        None => amount_out / denom * keep,
    }
}

/// Parse a decimal string such as "1.5" into base units
pub fn parse_amount(value: &str, decimals: u8) -> Result<U256, DexError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(U256::ZERO);
    }

    let parsed = parse_units(trimmed, decimals).map_err(|e| DexError::InvalidAmount {
        message: format!("'{}': {}", trimmed, e),
    })?;
    if parsed.is_negative() {
        return Err(DexError::InvalidAmount {
            message: format!("'{}' is negative", trimmed),
        });
    }
    Ok(parsed.get_absolute())
}

/// Format base units as a decimal string with trailing zeros removed
pub fn format_amount(amount: U256, decimals: u8) -> String {
    let formatted = match format_units(amount, decimals) {
        Ok(s) => s,
        Err(_) => return amount.to_string(),
    };

    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}
