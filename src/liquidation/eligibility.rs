//! Position health checks.
//!
//! Evaluated fresh on every call against the live ledger and oracle. Nothing
//! here is cached, since prices move between calls.

use serde::{Deserialize, Serialize};

use crate::core::token::UsdValue;
use crate::error::Result;
use crate::ledger::PositionLedger;
use crate::oracle::PriceSource;
use crate::utils::crypto::Address;
use crate::utils::math::Ratio;

/// Snapshot of a position's health at current prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionHealth {
    /// USD value of all collateral
    pub collateral_value: UsdValue,
    /// USD value of all debt
    pub debt_value: UsdValue,
    /// `collateral_value / debt_value`, `None` without debt
    pub collateral_ratio: Option<Ratio>,
}

impl PositionHealth {
    /// Check whether this position may be liquidated under `min_ratio`
    pub fn is_liquidatable(&self, min_ratio: Ratio) -> bool {
        match self.collateral_ratio {
            Some(ratio) => ratio < min_ratio,
            None => false,
        }
    }
}

/// Current health of `account`'s position
pub fn position_health<L>(
    ledger: &L,
    prices: &dyn PriceSource,
    account: &Address,
) -> Result<PositionHealth>
where
    L: PositionLedger + ?Sized,
{
    let collateral_value = ledger.collateral_value_of(account, prices)?;
    let debt_value = ledger.debt_value_of(account, prices)?;

    let collateral_ratio = if debt_value.is_zero() {
        None
    } else {
        Some(Ratio::from_fraction(collateral_value.raw(), debt_value.raw())?)
    };

    Ok(PositionHealth {
        collateral_value,
        debt_value,
        collateral_ratio,
    })
}

/// True iff the position has debt and its collateral ratio is below `min_ratio`
pub fn is_eligible_for_liquidation<L>(
    ledger: &L,
    prices: &dyn PriceSource,
    account: &Address,
    min_ratio: Ratio,
) -> Result<bool>
where
    L: PositionLedger + ?Sized,
{
    Ok(position_health(ledger, prices, account)?.is_liquidatable(min_ratio))
}

/// True iff the position is healthy (the inverse of liquidation eligibility)
pub fn collateral_is_eligible<L>(
    ledger: &L,
    prices: &dyn PriceSource,
    account: &Address,
    min_ratio: Ratio,
) -> Result<bool>
where
    L: PositionLedger + ?Sized,
{
    Ok(!is_eligible_for_liquidation(ledger, prices, account, min_ratio)?)
}
