//! Token identifiers and strongly-typed amounts.
//!
//! Token amounts and USD values are both 18-decimal integers, but they are
//! different quantities: a `TokenAmount` only becomes a `UsdValue` through a
//! price. Keeping them as distinct newtypes prevents silently mixing the two.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::utils::constants::{TOKEN_DECIMALS, TOKEN_UNIT, USD_UNIT};
use crate::utils::math::{safe_add, safe_sub, Ratio};

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN ID
// ═══════════════════════════════════════════════════════════════════════════════

/// Identifier of a collateral or debt token (its symbol, e.g. "wFTM")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    /// Create a token id from its symbol
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    /// Token symbol
    pub fn symbol(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TokenId {
    fn from(symbol: &str) -> Self {
        Self::new(symbol)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECIMAL HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn parse_decimal(input: &str, name: &str) -> Result<u128> {
    let invalid = |reason: String| Error::InvalidParameter {
        name: name.into(),
        reason,
    };

    let value = Decimal::from_str(input.trim()).map_err(|e| invalid(e.to_string()))?;
    if value.is_sign_negative() {
        return Err(invalid("negative amount".into()));
    }
    if value.scale() > TOKEN_DECIMALS {
        return Err(invalid(format!(
            "more than {} decimal places",
            TOKEN_DECIMALS
        )));
    }

    let mantissa = value.mantissa() as u128;
    let factor = 10u128.pow(TOKEN_DECIMALS - value.scale());
    mantissa.checked_mul(factor).ok_or(Error::Overflow {
        operation: format!("parse {}", input),
    })
}

fn format_decimal(raw: u128) -> String {
    match i128::try_from(raw)
        .ok()
        .and_then(|v| Decimal::try_from_i128_with_scale(v, TOKEN_DECIMALS).ok())
    {
        Some(value) => value.normalize().to_string(),
        None => {
            let whole = raw / TOKEN_UNIT;
            let frac = raw % TOKEN_UNIT;
            if frac == 0 {
                whole.to_string()
            } else {
                let digits = format!("{:018}", frac);
                format!("{}.{}", whole, digits.trim_end_matches('0'))
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN AMOUNT
// ═══════════════════════════════════════════════════════════════════════════════

/// Token amount in native 18-decimal units
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct TokenAmount(u128);

impl TokenAmount {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Create from raw native units
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Create from whole tokens
    pub fn from_whole(whole: u64) -> Self {
        Self(whole as u128 * TOKEN_UNIT)
    }

    /// Parse a decimal string ("3366.33") into native units
    pub fn parse(input: &str) -> Result<Self> {
        parse_decimal(input, "token_amount").map(Self)
    }

    /// Raw native units
    pub fn raw(&self) -> u128 {
        self.0
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition
    pub fn checked_add(self, other: Self) -> Result<Self> {
        safe_add(self.0, other.0).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Self) -> Result<Self> {
        safe_sub(self.0, other.0).map(Self)
    }

    /// Saturating subtraction
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// `self * ratio`, rounded down
    pub fn mul_ratio(&self, ratio: Ratio) -> Result<Self> {
        ratio.apply_floor(self.0).map(Self)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_decimal(self.0))
    }
}

impl From<u128> for TokenAmount {
    fn from(raw: u128) -> Self {
        Self(raw)
    }
}

impl From<TokenAmount> for u128 {
    fn from(amount: TokenAmount) -> Self {
        amount.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// USD VALUE
// ═══════════════════════════════════════════════════════════════════════════════

/// USD value with 18 decimals
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct UsdValue(u128);

impl UsdValue {
    /// Zero value
    pub const ZERO: Self = Self(0);

    /// Create from raw 1e18-scaled value
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Create from whole dollars
    pub fn from_dollars(dollars: u64) -> Self {
        Self(dollars as u128 * USD_UNIT)
    }

    /// Parse a decimal string ("4999.5")
    pub fn parse(input: &str) -> Result<Self> {
        parse_decimal(input, "usd_value").map(Self)
    }

    /// Raw 1e18-scaled value
    pub fn raw(&self) -> u128 {
        self.0
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition
    pub fn checked_add(self, other: Self) -> Result<Self> {
        safe_add(self.0, other.0).map(Self)
    }

    /// Amount of the pegged stable token that settles this value (1:1)
    pub fn as_stable_amount(&self) -> TokenAmount {
        TokenAmount::from_raw(self.0)
    }
}

impl fmt::Display for UsdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", format_decimal(self.0))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOLDINGS
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered list of (token, amount) pairs, as snapshotted by an auction
pub type Holdings = Vec<(TokenId, TokenAmount)>;
