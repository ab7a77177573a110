//! Multi-token balance book.
//!
//! Tracks wallet balances, allowances and total supply for every token, plus
//! balances of the chain's native asset (used for the initiator bonus).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::token::{TokenAmount, TokenId};
use crate::error::{Error, Result};
use crate::utils::constants::NATIVE_ASSET_SYMBOL;
use crate::utils::crypto::Address;
use crate::utils::math::{safe_add, safe_sub};

/// In-memory token balances, allowances and native-asset balances
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenBank {
    /// Balances by token, then holder
    balances: HashMap<TokenId, HashMap<Address, TokenAmount>>,
    /// Allowances by token, then owner, then spender
    allowances: HashMap<TokenId, HashMap<Address, HashMap<Address, TokenAmount>>>,
    /// Total supply by token
    supply: HashMap<TokenId, TokenAmount>,
    /// Native asset balances
    native: HashMap<Address, u128>,
}

impl TokenBank {
    /// Create an empty bank
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Balance of `holder` in `token`
    pub fn balance_of(&self, token: &TokenId, holder: &Address) -> TokenAmount {
        self.balances
            .get(token)
            .and_then(|holders| holders.get(holder))
            .copied()
            .unwrap_or(TokenAmount::ZERO)
    }

    /// Amount `spender` may move out of `owner`'s balance
    pub fn allowance(&self, token: &TokenId, owner: &Address, spender: &Address) -> TokenAmount {
        self.allowances
            .get(token)
            .and_then(|owners| owners.get(owner))
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(TokenAmount::ZERO)
    }

    /// Total supply of `token`
    pub fn total_supply(&self, token: &TokenId) -> TokenAmount {
        self.supply.get(token).copied().unwrap_or(TokenAmount::ZERO)
    }

    /// Native asset balance
    pub fn native_balance_of(&self, holder: &Address) -> u128 {
        self.native.get(holder).copied().unwrap_or(0)
    }

    /// Verify supply invariant (total supply == sum of balances) for a token
    pub fn verify_supply_invariant(&self, token: &TokenId) -> bool {
        let sum: u128 = self
            .balances
            .get(token)
            .map(|holders| holders.values().map(|b| b.raw()).sum())
            .unwrap_or(0);
        sum == self.total_supply(token).raw()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TOKEN OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Mint new tokens to `to`
    pub fn mint(&mut self, token: &TokenId, to: &Address, amount: TokenAmount) -> Result<()> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        let new_supply = self.total_supply(token).checked_add(amount)?;
        let new_balance = self.balance_of(token, to).checked_add(amount)?;

        self.supply.insert(token.clone(), new_supply);
        self.set_balance(token, to, new_balance);
        Ok(())
    }

    /// Burn tokens held by `from`
    pub fn burn(&mut self, token: &TokenId, from: &Address, amount: TokenAmount) -> Result<()> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        let balance = self.balance_of(token, from);
        if balance < amount {
            return Err(Error::InsufficientBalance {
                token: token.to_string(),
                required: amount.raw(),
                available: balance.raw(),
            });
        }

        let new_supply = self.total_supply(token).checked_sub(amount)?;
        self.set_balance(token, from, balance.saturating_sub(amount));
        self.supply.insert(token.clone(), new_supply);
        Ok(())
    }

    /// Transfer tokens between holders
    pub fn transfer(
        &mut self,
        token: &TokenId,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<()> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }

        let from_balance = self.balance_of(token, from);
        if from_balance < amount {
            return Err(Error::InsufficientBalance {
                token: token.to_string(),
                required: amount.raw(),
                available: from_balance.raw(),
            });
        }

        if from == to {
            return Ok(());
        }

        let to_balance = self.balance_of(token, to).checked_add(amount)?;
        self.set_balance(token, from, from_balance.saturating_sub(amount));
        self.set_balance(token, to, to_balance);
        Ok(())
    }

    /// Set the allowance of `spender` over `owner`'s tokens
    pub fn approve(
        &mut self,
        token: &TokenId,
        owner: &Address,
        spender: &Address,
        amount: TokenAmount,
    ) {
        self.allowances
            .entry(token.clone())
            .or_default()
            .entry(*owner)
            .or_default()
            .insert(*spender, amount);
    }

    /// Move tokens on behalf of `from`, consuming `spender`'s allowance
    pub fn transfer_from(
        &mut self,
        token: &TokenId,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<()> {
        let allowance = self.allowance(token, from, spender);
        if allowance < amount {
            return Err(Error::InsufficientAllowance {
                required: amount.raw(),
                approved: allowance.raw(),
            });
        }

        self.transfer(token, from, to, amount)?;
        self.approve(token, from, spender, allowance.saturating_sub(amount));
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // NATIVE ASSET
    // ═══════════════════════════════════════════════════════════════════════════

    /// Credit native asset out of thin air (genesis allocation / faucet)
    pub fn credit_native(&mut self, to: &Address, amount: u128) -> Result<()> {
        let balance = safe_add(self.native_balance_of(to), amount)?;
        self.native.insert(*to, balance);
        Ok(())
    }

    /// Transfer native asset between accounts
    pub fn transfer_native(&mut self, from: &Address, to: &Address, amount: u128) -> Result<()> {
        let from_balance = self.native_balance_of(from);
        if from_balance < amount {
            return Err(Error::InsufficientBalance {
                token: NATIVE_ASSET_SYMBOL.into(),
                required: amount,
                available: from_balance,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }

        let to_balance = safe_add(self.native_balance_of(to), amount)?;
        self.native.insert(*from, safe_sub(from_balance, amount)?);
        self.native.insert(*to, to_balance);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL
    // ═══════════════════════════════════════════════════════════════════════════

    fn set_balance(&mut self, token: &TokenId, holder: &Address, amount: TokenAmount) {
        let holders = self.balances.entry(token.clone()).or_default();
        if amount.is_zero() {
            holders.remove(holder);
        } else {
            holders.insert(*holder, amount);
        }
    }
}
