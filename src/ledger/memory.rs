//! In-memory ledger: deposit / withdraw / mint / repay bookkeeping.
//!
//! Collateral deposited by users sits in the escrow account's token balance;
//! the `PositionBook` records who owns what share of it. Minting creates debt
//! tokens against the position, subject to the mint collateralization ratio.

use serde::{Deserialize, Serialize};

use crate::core::token::{Holdings, TokenAmount, TokenId, UsdValue};
use crate::error::{Error, Result};
use crate::ledger::{holdings_value, NativeLedger, PositionLedger, TokenLedger};
use crate::ledger::{Position, PositionBook, TokenBank};
use crate::oracle::PriceSource;
use crate::utils::constants::DEFAULT_MINT_COLLATERAL_RATIO;
use crate::utils::crypto::Address;
use crate::utils::math::Ratio;

/// Token bank plus position records behind one escrow account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryLedger {
    bank: TokenBank,
    positions: PositionBook,
    /// Account holding deposited collateral
    escrow: Address,
    /// Collateralization a position must keep after mint or withdraw
    mint_ratio: Ratio,
}

impl InMemoryLedger {
    /// Create an empty ledger whose collateral lives in `escrow`
    pub fn new(escrow: Address) -> Self {
        Self {
            bank: TokenBank::new(),
            positions: PositionBook::new(),
            escrow,
            mint_ratio: Ratio::from_raw(DEFAULT_MINT_COLLATERAL_RATIO),
        }
    }

    /// Override the mint collateralization ratio
    pub fn with_mint_ratio(mut self, ratio: Ratio) -> Self {
        self.mint_ratio = ratio;
        self
    }

    /// Escrow account
    pub fn escrow(&self) -> &Address {
        &self.escrow
    }

    /// Underlying token bank
    pub fn bank(&self) -> &TokenBank {
        &self.bank
    }

    /// Position of `account`
    pub fn position(&self, account: &Address) -> Position {
        self.positions.get(account)
    }

    /// Check whether `account`'s position is under auction
    pub fn is_locked(&self, account: &Address) -> bool {
        self.positions.is_locked(account)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // WALLET OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Credit wallet tokens (genesis allocation / faucet)
    pub fn fund(&mut self, token: &TokenId, to: &Address, amount: TokenAmount) -> Result<()> {
        self.bank.mint(token, to, amount)
    }

    /// Credit native asset (genesis allocation / faucet)
    pub fn fund_native(&mut self, to: &Address, amount: u128) -> Result<()> {
        self.bank.credit_native(to, amount)
    }

    /// Approve `spender` to move `owner`'s tokens
    pub fn approve(&mut self, token: &TokenId, owner: &Address, spender: &Address, amount: TokenAmount) {
        self.bank.approve(token, owner, spender, amount);
    }

    /// Plain wallet transfer
    pub fn transfer(&mut self, token: &TokenId, from: &Address, to: &Address, amount: TokenAmount) -> Result<()> {
        self.bank.transfer(token, from, to, amount)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // POSITION OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Move wallet tokens into escrow as collateral
    pub fn deposit(&mut self, account: &Address, token: &TokenId, amount: TokenAmount) -> Result<()> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        self.bank.transfer(token, account, &self.escrow, amount)?;
        self.positions.add_collateral(account, token, amount)?;

        tracing::debug!(account = %account.short(), token = %token, amount = %amount, "collateral deposited");
        Ok(())
    }

    /// Return collateral from escrow, keeping the position above the mint ratio
    pub fn withdraw(
        &mut self,
        account: &Address,
        token: &TokenId,
        amount: TokenAmount,
        prices: &dyn PriceSource,
    ) -> Result<()> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        self.positions.ensure_unlocked(account)?;

        let mut after = self.positions.get(account);
        let held = after.collateral_of(token);
        if held < amount {
            return Err(Error::InsufficientCollateral {
                token: token.to_string(),
                required: amount.raw(),
                available: held.raw(),
            });
        }
        after.collateral.insert(token.clone(), held.saturating_sub(amount));
        self.ensure_healthy(&after, prices)?;

        self.positions.remove_collateral(account, token, amount)?;
        self.bank.transfer(token, &self.escrow, account, amount)?;

        tracing::debug!(account = %account.short(), token = %token, amount = %amount, "collateral withdrawn");
        Ok(())
    }

    /// Mint debt tokens against the position
    pub fn mint(
        &mut self,
        account: &Address,
        token: &TokenId,
        amount: TokenAmount,
        prices: &dyn PriceSource,
    ) -> Result<()> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        self.positions.ensure_unlocked(account)?;

        let mut after = self.positions.get(account);
        after.debt.insert(token.clone(), after.debt_of(token).checked_add(amount)?);
        self.ensure_healthy(&after, prices)?;

        self.bank.mint(token, account, amount)?;
        self.positions.add_debt(account, token, amount)?;

        tracing::debug!(account = %account.short(), token = %token, amount = %amount, "debt minted");
        Ok(())
    }

    /// Burn wallet debt tokens to reduce the position's debt
    pub fn repay(&mut self, account: &Address, token: &TokenId, amount: TokenAmount) -> Result<()> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        self.positions.ensure_unlocked(account)?;

        let owed = self.positions.get(account).debt_of(token);
        if owed < amount {
            return Err(Error::InvalidParameter {
                name: "amount".into(),
                reason: format!("repaying {} exceeds {} debt of {}", amount, token, owed),
            });
        }

        self.bank.burn(token, account, amount)?;
        self.positions.remove_debt(account, token, amount)?;

        tracing::debug!(account = %account.short(), token = %token, amount = %amount, "debt repaid");
        Ok(())
    }

    fn ensure_healthy(&self, position: &Position, prices: &dyn PriceSource) -> Result<()> {
        let debt: Holdings = position.debt.iter().map(|(t, a)| (t.clone(), *a)).collect();
        let debt_value = holdings_value(&debt, prices)?;
        if debt_value == UsdValue::ZERO {
            return Ok(());
        }

        let collateral: Holdings = position.collateral.iter().map(|(t, a)| (t.clone(), *a)).collect();
        let collateral_value = holdings_value(&collateral, prices)?;
        let ratio = Ratio::from_fraction(collateral_value.raw(), debt_value.raw())?;
        if ratio < self.mint_ratio {
            return Err(Error::CollateralizationRatioTooLow {
                current: ratio.raw(),
                minimum: self.mint_ratio.raw(),
            });
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER TRAITS
// ═══════════════════════════════════════════════════════════════════════════════

impl TokenLedger for InMemoryLedger {
    fn balance_of(&self, token: &TokenId, holder: &Address) -> TokenAmount {
        self.bank.balance_of(token, holder)
    }

    fn allowance(&self, token: &TokenId, owner: &Address, spender: &Address) -> TokenAmount {
        self.bank.allowance(token, owner, spender)
    }

    fn transfer_from(
        &mut self,
        token: &TokenId,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<()> {
        self.bank.transfer_from(token, spender, from, to, amount)
    }

    fn burn(&mut self, token: &TokenId, from: &Address, amount: TokenAmount) -> Result<()> {
        self.bank.burn(token, from, amount)
    }
}

impl NativeLedger for InMemoryLedger {
    fn native_balance_of(&self, holder: &Address) -> u128 {
        self.bank.native_balance_of(holder)
    }

    fn transfer_native(&mut self, from: &Address, to: &Address, amount: u128) -> Result<()> {
        self.bank.transfer_native(from, to, amount)
    }
}

impl PositionLedger for InMemoryLedger {
    fn collateral_balances(&self, account: &Address) -> Holdings {
        self.positions.collateral_balances(account)
    }

    fn debt_balances(&self, account: &Address) -> Holdings {
        self.positions.debt_balances(account)
    }

    fn debit_collateral(
        &mut self,
        account: &Address,
        token: &TokenId,
        amount: TokenAmount,
        to: &Address,
    ) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let escrowed = self.bank.balance_of(token, &self.escrow);
        if escrowed < amount {
            return Err(Error::InsufficientCollateral {
                token: token.to_string(),
                required: amount.raw(),
                available: escrowed.raw(),
            });
        }
        self.positions.remove_collateral(account, token, amount)?;
        self.bank.transfer(token, &self.escrow, to, amount)
    }

    fn settle_debt(&mut self, account: &Address, token: &TokenId, amount: TokenAmount) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        self.positions.remove_debt(account, token, amount)
    }

    fn set_position_locked(&mut self, account: &Address, locked: bool) {
        self.positions.set_locked(account, locked);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{Price, PriceFeed};
    use crate::utils::constants::TOKEN_UNIT;

    fn setup() -> (InMemoryLedger, PriceFeed, Address) {
        let mut ledger = InMemoryLedger::new(Address::from_label("fmint"));
        let mut feed = PriceFeed::new();
        feed.set_price(TokenId::new("wFTM"), Price::from_wei(TOKEN_UNIT)).unwrap();
        feed.set_price(TokenId::new("fUSD"), Price::from_wei(TOKEN_UNIT)).unwrap();

        let alice = Address::from_label("alice");
        ledger
            .fund(&TokenId::new("wFTM"), &alice, TokenAmount::from_whole(1000))
            .unwrap();
        (ledger, feed, alice)
    }

    #[test]
    fn test_deposit_and_withdraw() {
        let (mut ledger, feed, alice) = setup();
        let wftm = TokenId::new("wFTM");

        ledger.deposit(&alice, &wftm, TokenAmount::from_whole(600)).unwrap();
        assert_eq!(ledger.balance_of(&wftm, ledger.escrow()), TokenAmount::from_whole(600));
        assert_eq!(ledger.balance_of(&wftm, &alice), TokenAmount::from_whole(400));

        ledger.withdraw(&alice, &wftm, TokenAmount::from_whole(100), &feed).unwrap();
        assert_eq!(ledger.position(&alice).collateral_of(&wftm), TokenAmount::from_whole(500));
    }

    #[test]
    fn test_mint_requires_ratio() {
        let (mut ledger, feed, alice) = setup();
        let wftm = TokenId::new("wFTM");
        let fusd = TokenId::new("fUSD");

        ledger.deposit(&alice, &wftm, TokenAmount::from_whole(1000)).unwrap();

        // 1000 / 400 = 250% is exactly the limit
        ledger.mint(&alice, &fusd, TokenAmount::from_whole(400), &feed).unwrap();
        let over = ledger.mint(&alice, &fusd, TokenAmount::from_whole(1), &feed);
        assert!(matches!(over, Err(Error::CollateralizationRatioTooLow { .. })));

        let withdraw = ledger.withdraw(&alice, &wftm, TokenAmount::from_whole(1), &feed);
        assert!(matches!(withdraw, Err(Error::CollateralizationRatioTooLow { .. })));
    }

    #[test]
    fn test_repay_burns_tokens() {
        let (mut ledger, feed, alice) = setup();
        let wftm = TokenId::new("wFTM");
        let fusd = TokenId::new("fUSD");

        ledger.deposit(&alice, &wftm, TokenAmount::from_whole(1000)).unwrap();
        ledger.mint(&alice, &fusd, TokenAmount::from_whole(100), &feed).unwrap();
        ledger.repay(&alice, &fusd, TokenAmount::from_whole(60)).unwrap();

        assert_eq!(ledger.position(&alice).debt_of(&fusd), TokenAmount::from_whole(40));
        assert_eq!(ledger.bank().total_supply(&fusd), TokenAmount::from_whole(40));
        assert!(ledger.repay(&alice, &fusd, TokenAmount::from_whole(41)).is_err());
    }

    #[test]
    fn test_locked_position_rejects_changes() {
        let (mut ledger, feed, alice) = setup();
        let wftm = TokenId::new("wFTM");

        ledger.deposit(&alice, &wftm, TokenAmount::from_whole(500)).unwrap();
        ledger.set_position_locked(&alice, true);

        let result = ledger.withdraw(&alice, &wftm, TokenAmount::from_whole(1), &feed);
        assert!(matches!(result, Err(Error::PositionLocked(_))));

        // Deposits are still accepted
        ledger.deposit(&alice, &wftm, TokenAmount::from_whole(1)).unwrap();
    }

    #[test]
    fn test_debit_collateral_moves_escrow() {
        let (mut ledger, _feed, alice) = setup();
        let wftm = TokenId::new("wFTM");
        let bidder = Address::from_label("bidder");

        ledger.deposit(&alice, &wftm, TokenAmount::from_whole(500)).unwrap();
        ledger
            .debit_collateral(&alice, &wftm, TokenAmount::from_whole(200), &bidder)
            .unwrap();

        assert_eq!(ledger.balance_of(&wftm, &bidder), TokenAmount::from_whole(200));
        assert_eq!(ledger.collateral_balances(&alice), vec![(wftm, TokenAmount::from_whole(300))]);
    }

    #[test]
    fn test_values() {
        let (mut ledger, feed, alice) = setup();
        ledger
            .deposit(&alice, &TokenId::new("wFTM"), TokenAmount::from_whole(1000))
            .unwrap();
        ledger
            .mint(&alice, &TokenId::new("fUSD"), TokenAmount::from_whole(100), &feed)
            .unwrap();

        assert_eq!(ledger.collateral_value_of(&alice, &feed).unwrap(), UsdValue::from_dollars(1000));
        assert_eq!(ledger.debt_value_of(&alice, &feed).unwrap(), UsdValue::from_dollars(100));
    }
}
