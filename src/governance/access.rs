//! Admin set, owner role, live switch and the externally-originated caller check.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::utils::crypto::Address;

// ═══════════════════════════════════════════════════════════════════════════════
// CALL CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// Who is calling and when
///
/// `origin` is the account that signed the transaction, `caller` the immediate
/// caller. They differ when the call is relayed through a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Transaction originator
    pub origin: Address,
    /// Immediate caller
    pub caller: Address,
    /// Block timestamp (unix seconds)
    pub timestamp: u64,
}

impl CallContext {
    /// Direct call from an externally-originated account
    pub fn direct(account: Address, timestamp: u64) -> Self {
        Self {
            origin: account,
            caller: account,
            timestamp,
        }
    }

    /// Call relayed by `contract` on behalf of `origin`
    pub fn via_contract(origin: Address, contract: Address, timestamp: u64) -> Self {
        Self {
            origin,
            caller: contract,
            timestamp,
        }
    }

    /// Check whether the immediate caller is the transaction originator
    pub fn is_externally_originated(&self) -> bool {
        self.origin == self.caller
    }

    /// Fail with `ContractCallerRejected` unless the caller is the originator
    pub fn ensure_externally_originated(&self) -> Result<()> {
        if !self.is_externally_originated() {
            return Err(Error::ContractCallerRejected {
                origin: self.origin.to_string(),
                caller: self.caller.to_string(),
            });
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ACCESS GUARD
// ═══════════════════════════════════════════════════════════════════════════════

/// Owner role, admin set and live flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGuard {
    owner: Address,
    admins: BTreeSet<Address>,
    paused: bool,
}

impl AccessGuard {
    /// Create a guard with the given owner and no admins
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            admins: BTreeSet::new(),
            paused: false,
        }
    }

    /// Create a guard with an initial admin set
    pub fn with_admins(owner: Address, admins: impl IntoIterator<Item = Address>) -> Self {
        Self {
            owner,
            admins: admins.into_iter().collect(),
            paused: false,
        }
    }

    /// Current owner
    pub fn owner(&self) -> &Address {
        &self.owner
    }

    /// Current admin set
    pub fn admins(&self) -> impl Iterator<Item = &Address> {
        self.admins.iter()
    }

    /// Check admin membership (the owner is implicitly an admin)
    pub fn is_admin(&self, account: &Address) -> bool {
        *account == self.owner || self.admins.contains(account)
    }

    /// Check if the engine accepts liquidations and bids
    pub fn is_live(&self) -> bool {
        !self.paused
    }

    // ─────────────────────────────────────────────────────────────────────────
    // CHECKS
    // ─────────────────────────────────────────────────────────────────────────

    /// Fail unless `ctx.caller` is the owner
    pub fn ensure_owner(&self, ctx: &CallContext) -> Result<()> {
        if ctx.caller != self.owner {
            return Err(Error::Unauthorized(format!(
                "{} is not the owner",
                ctx.caller.short()
            )));
        }
        Ok(())
    }

    /// Fail unless `ctx.caller` is an admin or the owner
    pub fn ensure_admin(&self, ctx: &CallContext) -> Result<()> {
        if !self.is_admin(&ctx.caller) {
            return Err(Error::Unauthorized(format!(
                "{} is not an admin",
                ctx.caller.short()
            )));
        }
        Ok(())
    }

    /// Fail with `ProtocolPaused` when paused
    pub fn ensure_live(&self) -> Result<()> {
        if self.paused {
            return Err(Error::ProtocolPaused);
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // OWNER OPERATIONS
    // ─────────────────────────────────────────────────────────────────────────

    /// Add an admin. Returns false if already present.
    pub fn add_admin(&mut self, ctx: &CallContext, account: Address) -> Result<bool> {
        self.ensure_owner(ctx)?;
        if account.is_zero() {
            return Err(Error::InvalidParameter {
                name: "admin".into(),
                reason: "cannot be the zero address".into(),
            });
        }
        Ok(self.admins.insert(account))
    }

    /// Remove an admin. Returns false if not present.
    pub fn remove_admin(&mut self, ctx: &CallContext, account: &Address) -> Result<bool> {
        self.ensure_owner(ctx)?;
        Ok(self.admins.remove(account))
    }

    /// Hand the owner role to another account
    pub fn transfer_ownership(&mut self, ctx: &CallContext, new_owner: Address) -> Result<()> {
        self.ensure_owner(ctx)?;
        if new_owner.is_zero() {
            return Err(Error::InvalidParameter {
                name: "new_owner".into(),
                reason: "cannot be the zero address".into(),
            });
        }
        self.owner = new_owner;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // LIVE SWITCH
    // ─────────────────────────────────────────────────────────────────────────

    /// Stop accepting liquidations and bids
    pub fn pause(&mut self, ctx: &CallContext) -> Result<()> {
        self.ensure_admin(ctx)?;
        if self.paused {
            return Err(Error::PauseStateUnchanged { paused: true });
        }
        self.paused = true;
        Ok(())
    }

    /// Resume accepting liquidations and bids
    pub fn unpause(&mut self, ctx: &CallContext) -> Result<()> {
        self.ensure_admin(ctx)?;
        if !self.paused {
            return Err(Error::PauseStateUnchanged { paused: false });
        }
        self.paused = false;
        Ok(())
    }
}
