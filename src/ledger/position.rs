//! Per-account collateral and debt records.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::core::token::{Holdings, TokenAmount, TokenId};
use crate::error::{Error, Result};
use crate::utils::crypto::Address;

/// Collateral deposited and debt minted by one account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Collateral per token
    pub collateral: BTreeMap<TokenId, TokenAmount>,
    /// Debt per token
    pub debt: BTreeMap<TokenId, TokenAmount>,
}

impl Position {
    /// Collateral held in `token`
    pub fn collateral_of(&self, token: &TokenId) -> TokenAmount {
        self.collateral.get(token).copied().unwrap_or(TokenAmount::ZERO)
    }

    /// Debt owed in `token`
    pub fn debt_of(&self, token: &TokenId) -> TokenAmount {
        self.debt.get(token).copied().unwrap_or(TokenAmount::ZERO)
    }

    /// Check whether the position carries any debt
    pub fn has_debt(&self) -> bool {
        self.debt.values().any(|amount| !amount.is_zero())
    }

    /// Check whether the position holds nothing at all
    pub fn is_empty(&self) -> bool {
        self.collateral.is_empty() && self.debt.is_empty()
    }
}

/// Position records for every account, plus the set of accounts under auction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionBook {
    positions: HashMap<Address, Position>,
    locked: BTreeSet<Address>,
}

impl PositionBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of `account` (empty when unknown)
    pub fn get(&self, account: &Address) -> Position {
        self.positions.get(account).cloned().unwrap_or_default()
    }

    /// Collateral balances, ordered by token
    pub fn collateral_balances(&self, account: &Address) -> Holdings {
        self.positions
            .get(account)
            .map(|p| p.collateral.iter().map(|(t, a)| (t.clone(), *a)).collect())
            .unwrap_or_default()
    }

    /// Debt balances, ordered by token
    pub fn debt_balances(&self, account: &Address) -> Holdings {
        self.positions
            .get(account)
            .map(|p| p.debt.iter().map(|(t, a)| (t.clone(), *a)).collect())
            .unwrap_or_default()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MUTATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record deposited collateral
    pub fn add_collateral(
        &mut self,
        account: &Address,
        token: &TokenId,
        amount: TokenAmount,
    ) -> Result<()> {
        let position = self.positions.entry(*account).or_default();
        let updated = position.collateral_of(token).checked_add(amount)?;
        position.collateral.insert(token.clone(), updated);
        Ok(())
    }

    /// Remove collateral from the record
    pub fn remove_collateral(
        &mut self,
        account: &Address,
        token: &TokenId,
        amount: TokenAmount,
    ) -> Result<()> {
        let held = self.get(account).collateral_of(token);
        if held < amount {
            return Err(Error::InsufficientCollateral {
                token: token.to_string(),
                required: amount.raw(),
                available: held.raw(),
            });
        }

        let position = self.positions.entry(*account).or_default();
        let remaining = held.saturating_sub(amount);
        if remaining.is_zero() {
            position.collateral.remove(token);
        } else {
            position.collateral.insert(token.clone(), remaining);
        }
        self.prune(account);
        Ok(())
    }

    /// Record newly minted debt
    pub fn add_debt(&mut self, account: &Address, token: &TokenId, amount: TokenAmount) -> Result<()> {
        let position = self.positions.entry(*account).or_default();
        let updated = position.debt_of(token).checked_add(amount)?;
        position.debt.insert(token.clone(), updated);
        Ok(())
    }

    /// Reduce recorded debt
    pub fn remove_debt(
        &mut self,
        account: &Address,
        token: &TokenId,
        amount: TokenAmount,
    ) -> Result<()> {
        let owed = self.get(account).debt_of(token);
        if owed < amount {
            return Err(Error::InvalidParameter {
                name: "amount".into(),
                reason: format!("repaying {} exceeds {} debt of {}", amount, token, owed),
            });
        }

        let position = self.positions.entry(*account).or_default();
        let remaining = owed.saturating_sub(amount);
        if remaining.is_zero() {
            position.debt.remove(token);
        } else {
            position.debt.insert(token.clone(), remaining);
        }
        self.prune(account);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // AUCTION LOCK
    // ═══════════════════════════════════════════════════════════════════════════

    /// Mark a position as under auction (or release it)
    pub fn set_locked(&mut self, account: &Address, locked: bool) {
        if locked {
            self.locked.insert(*account);
        } else {
            self.locked.remove(account);
        }
    }

    /// Check whether a position is under auction
    pub fn is_locked(&self, account: &Address) -> bool {
        self.locked.contains(account)
    }

    /// Fail with `PositionLocked` when the position is under auction
    pub fn ensure_unlocked(&self, account: &Address) -> Result<()> {
        if self.is_locked(account) {
            return Err(Error::PositionLocked(account.to_string()));
        }
        Ok(())
    }

    fn prune(&mut self, account: &Address) {
        if self.positions.get(account).is_some_and(Position::is_empty) {
            self.positions.remove(account);
        }
    }
}
