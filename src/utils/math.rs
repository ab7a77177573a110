//! Fixed-point arithmetic and mathematical utilities.
//!
//! Ratios use a 1e8 denominator, token amounts and USD values use 1e18. The
//! helpers here keep every intermediate product in `u128` and report overflow
//! instead of wrapping.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::utils::constants::RATIO_PRECISION;

// ═══════════════════════════════════════════════════════════════════════════════
// RATIO TYPE
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed-point fraction with 1e8 precision (`Ratio::ONE` is 100%)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Ratio(u64);

impl Ratio {
    /// Zero (0%)
    pub const ZERO: Self = Self(0);

    /// One (100%)
    pub const ONE: Self = Self(RATIO_PRECISION);

    /// Create from raw 1e8-scaled value
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Create from a whole percentage (20 = 20%)
    pub fn from_percent(pct: u64) -> Self {
        Self(pct.saturating_mul(RATIO_PRECISION / 100))
    }

    /// Ratio of two quantities, `numerator / denominator`, saturating at `u64::MAX`
    pub fn from_fraction(numerator: u128, denominator: u128) -> Result<Self> {
        let raw = mul_div(numerator, RATIO_PRECISION as u128, denominator)?;
        Ok(Self(raw.min(u64::MAX as u128) as u64))
    }

    /// Raw 1e8-scaled value
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `value * self`, rounded down
    pub fn apply_floor(&self, value: u128) -> Result<u128> {
        mul_div(value, self.0 as u128, RATIO_PRECISION as u128)
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Saturating subtraction
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Format as a percentage with six decimals (e.g. "20.000000%")
    pub fn to_percent_string(&self) -> String {
        let unit = RATIO_PRECISION / 100;
        format!("{}.{:06}%", self.0 / unit, self.0 % unit)
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_percent_string())
    }
}

impl From<u64> for Ratio {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<Ratio> for u64 {
    fn from(ratio: Ratio) -> Self {
        ratio.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SAFE ARITHMETIC OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b).ok_or(Error::Overflow {
        operation: format!("{} + {}", a, b),
    })
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u128, b: u128) -> Result<u128> {
    a.checked_sub(b).ok_or(Error::Underflow {
        operation: format!("{} - {}", a, b),
    })
}

/// Computes `floor(a * b / c)`.
///
/// When `a * b` does not fit in `u128` the product is split as
/// `(a / c) * b + (a % c) * b / c`, which is exact for the floor.
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128> {
    if c == 0 {
        return Err(Error::InvalidParameter {
            name: "divisor".into(),
            reason: "division by zero".into(),
        });
    }

    if let Some(product) = a.checked_mul(b) {
        return Ok(product / c);
    }

    let overflow = || Error::Overflow {
        operation: format!("({} * {}) / {}", a, b, c),
    };

    let high = (a / c).checked_mul(b).ok_or_else(overflow)?;
    let low = (a % c).checked_mul(b).ok_or_else(overflow)? / c;
    high.checked_add(low).ok_or_else(overflow)
}

/// Share of `total` between two cumulative ratios: `floor(total * to) - floor(total * from)`.
///
/// Summing the slices of consecutive fills telescopes to `floor(total * last)`,
/// so nothing is lost to per-slice rounding.
pub fn cumulative_slice(total: u128, from: Ratio, to: Ratio) -> Result<u128> {
    if to < from {
        return Err(Error::InvalidParameter {
            name: "ratio".into(),
            reason: format!("slice end {} before start {}", to, from),
        });
    }
    safe_sub(to.apply_floor(total)?, from.apply_floor(total)?)
}

/// Value of `amount` at `price` quoted with `price_decimals` decimals
pub fn value_at_price(amount: u128, price: u128, price_decimals: u32) -> Result<u128> {
    let scale = 10u128.checked_pow(price_decimals).ok_or(Error::Overflow {
        operation: format!("10^{}", price_decimals),
    })?;
    mul_div(amount, price, scale)
}
