//! Ledger collaborators of the liquidation engine.
//!
//! The engine never owns balances. It talks to three ledgers through traits:
//! - `TokenLedger`: fungible token balances, allowances and burning
//! - `NativeLedger`: the chain's native asset (initiator bonus)
//! - `PositionLedger`: per-account collateral and debt records
//!
//! `InMemoryLedger` implements all three for tests, the CLI and embedders.

pub mod bank;
pub mod memory;
pub mod position;

pub use bank::TokenBank;
pub use memory::InMemoryLedger;
pub use position::{Position, PositionBook};

use crate::core::token::{Holdings, TokenAmount, TokenId, UsdValue};
use crate::error::Result;
use crate::oracle::PriceSource;
use crate::utils::crypto::Address;

// ═══════════════════════════════════════════════════════════════════════════════
// TRAITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Fungible token balances
pub trait TokenLedger {
    /// Balance of `holder`
    fn balance_of(&self, token: &TokenId, holder: &Address) -> TokenAmount;

    /// Amount `spender` may move from `owner`
    fn allowance(&self, token: &TokenId, owner: &Address, spender: &Address) -> TokenAmount;

    /// Move tokens from `from` to `to` using `spender`'s allowance
    fn transfer_from(
        &mut self,
        token: &TokenId,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<()>;

    /// Destroy tokens held by `from`
    fn burn(&mut self, token: &TokenId, from: &Address, amount: TokenAmount) -> Result<()>;
}

/// Native asset balances
pub trait NativeLedger {
    /// Native balance of `holder`
    fn native_balance_of(&self, holder: &Address) -> u128;

    /// Move native asset between accounts
    fn transfer_native(&mut self, from: &Address, to: &Address, amount: u128) -> Result<()>;
}

/// Collateral and debt records
pub trait PositionLedger {
    /// Collateral held by `account`, ordered by token
    fn collateral_balances(&self, account: &Address) -> Holdings;

    /// Debt owed by `account`, ordered by token
    fn debt_balances(&self, account: &Address) -> Holdings;

    /// Release `amount` of `account`'s escrowed collateral to `to`
    fn debit_collateral(
        &mut self,
        account: &Address,
        token: &TokenId,
        amount: TokenAmount,
        to: &Address,
    ) -> Result<()>;

    /// Extinguish `amount` of `account`'s recorded debt
    fn settle_debt(&mut self, account: &Address, token: &TokenId, amount: TokenAmount)
        -> Result<()>;

    /// Freeze (or release) a position while an auction runs against it
    fn set_position_locked(&mut self, account: &Address, locked: bool);

    /// Total USD value of `account`'s collateral
    fn collateral_value_of(&self, account: &Address, prices: &dyn PriceSource) -> Result<UsdValue> {
        holdings_value(&self.collateral_balances(account), prices)
    }

    /// Total USD value of `account`'s debt
    fn debt_value_of(&self, account: &Address, prices: &dyn PriceSource) -> Result<UsdValue> {
        holdings_value(&self.debt_balances(account), prices)
    }
}

/// Everything the liquidation engine needs from the ledger side
pub trait Ledger: TokenLedger + NativeLedger + PositionLedger {}

impl<T: TokenLedger + NativeLedger + PositionLedger> Ledger for T {}

/// USD value of a holdings list at current prices
pub fn holdings_value(holdings: &[(TokenId, TokenAmount)], prices: &dyn PriceSource) -> Result<UsdValue> {
    holdings.iter().try_fold(UsdValue::ZERO, |total, (token, amount)| {
        let value = prices.price(token)?.value_of(*amount)?;
        total.checked_add(value)
    })
}

/// Amount held in `token` within a holdings list
pub fn holding_of(holdings: &[(TokenId, TokenAmount)], token: &TokenId) -> TokenAmount {
    holdings
        .iter()
        .find(|(t, _)| t == token)
        .map(|(_, amount)| *amount)
        .unwrap_or(TokenAmount::ZERO)
}
