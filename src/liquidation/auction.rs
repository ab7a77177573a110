//! Auction records and the nonce-keyed registry.
//!
//! Auctions live in an arena keyed by nonce with a separate owner → active
//! nonce index. Nonces start at 1 and are never reused.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::token::{Holdings, TokenAmount, UsdValue};
use crate::error::{Error, Result};
use crate::utils::crypto::Address;
use crate::utils::math::{cumulative_slice, Ratio};

// ═══════════════════════════════════════════════════════════════════════════════
// AUCTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Auction lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionState {
    /// Accepting bids
    Active,
    /// Fully filled (terminal)
    Closed,
}

impl std::fmt::Display for AuctionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuctionState::Active => write!(f, "Active"),
            AuctionState::Closed => write!(f, "Closed"),
        }
    }
}

/// A liquidation auction over one position's snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    /// Unique identifier
    pub nonce: u64,
    /// Account whose position is liquidated
    pub owner: Address,
    /// Account that triggered the liquidation
    pub initiator: Address,
    /// Creation timestamp
    pub start_time: u64,
    /// Collateral captured at start
    pub collateral: Holdings,
    /// Debt captured at start
    pub debt: Holdings,
    /// USD value of the collateral at start
    pub total_collateral_value: UsdValue,
    /// USD value of the debt at start, fixed for the auction's life
    pub total_debt_value: UsdValue,
    /// Fraction of the snapshot already sold
    pub filled_ratio: Ratio,
    /// Whether the initiator bonus has been paid
    pub bonus_paid: bool,
    /// Cumulative debt value paid by bidders
    pub debt_paid: UsdValue,
    /// Number of successful bids
    pub bid_count: u32,
    /// Lifecycle state
    pub state: AuctionState,
    /// Close timestamp
    pub closed_at: Option<u64>,
}

impl Auction {
    /// Check if accepting bids
    pub fn is_active(&self) -> bool {
        self.state == AuctionState::Active
    }

    /// Collateral released when the filled ratio moves from `from` to `to`
    pub fn collateral_slice(&self, from: Ratio, to: Ratio) -> Result<Holdings> {
        slice_holdings(&self.collateral, from, to)
    }

    /// Debt extinguished when the filled ratio moves from `from` to `to`
    pub fn debt_slice(&self, from: Ratio, to: Ratio) -> Result<Holdings> {
        slice_holdings(&self.debt, from, to)
    }

    /// Debt value owed for moving the filled ratio from `from` to `to`
    pub fn debt_value_slice(&self, from: Ratio, to: Ratio) -> Result<UsdValue> {
        cumulative_slice(self.total_debt_value.raw(), from, to).map(UsdValue::from_raw)
    }

    /// Collateral not yet released at the current filled ratio
    pub fn unreleased_collateral(&self) -> Result<Holdings> {
        slice_holdings(&self.collateral, self.filled_ratio, Ratio::ONE)
    }
}

fn slice_holdings(holdings: &Holdings, from: Ratio, to: Ratio) -> Result<Holdings> {
    holdings
        .iter()
        .map(|(token, amount)| {
            cumulative_slice(amount.raw(), from, to)
                .map(|share| (token.clone(), TokenAmount::from_raw(share)))
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIQUIDATION DETAILS
// ═══════════════════════════════════════════════════════════════════════════════

/// Read-only projection of an auction for bidders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationDetails {
    /// Auction nonce
    pub nonce: u64,
    /// Auction state
    pub state: AuctionState,
    /// Ratio currently on offer (cumulative)
    pub offering_ratio: Ratio,
    /// Ratio already sold
    pub filled_ratio: Ratio,
    /// Start timestamp
    pub start_time: u64,
    /// Time at which the offering ratio saturates
    pub end_time: u64,
    /// Collateral snapshot
    pub collateral: Holdings,
    /// USD value of the collateral snapshot at start
    pub total_collateral_value: UsdValue,
    /// Debt snapshot
    pub debt: Holdings,
    /// USD value of the debt snapshot at start
    pub total_debt_value: UsdValue,
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUCTION REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Snapshot data for a new auction
#[derive(Debug, Clone)]
pub struct AuctionOpening {
    /// Position owner
    pub owner: Address,
    /// Account triggering the liquidation
    pub initiator: Address,
    /// Start timestamp
    pub start_time: u64,
    /// Collateral snapshot
    pub collateral: Holdings,
    /// Debt snapshot
    pub debt: Holdings,
    /// Collateral value at start
    pub total_collateral_value: UsdValue,
    /// Debt value at start
    pub total_debt_value: UsdValue,
}

/// Arena of auctions keyed by nonce
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionRegistry {
    auctions: BTreeMap<u64, Auction>,
    active_by_owner: BTreeMap<Address, u64>,
    next_nonce: u64,
}

impl Default for AuctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AuctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            auctions: BTreeMap::new(),
            active_by_owner: BTreeMap::new(),
            next_nonce: 1,
        }
    }

    /// Nonce the next auction will receive
    pub fn next_nonce(&self) -> u64 {
        self.next_nonce
    }

    /// Active auction of `owner`, if any
    pub fn active_for(&self, owner: &Address) -> Option<u64> {
        self.active_by_owner.get(owner).copied()
    }

    /// Fail with `AuctionAlreadyActive` if `owner` has an active auction
    pub fn ensure_no_active(&self, owner: &Address) -> Result<()> {
        match self.active_for(owner) {
            Some(nonce) => Err(Error::AuctionAlreadyActive {
                owner: owner.to_string(),
                nonce,
            }),
            None => Ok(()),
        }
    }

    /// Get an auction by nonce
    pub fn get(&self, nonce: u64) -> Result<&Auction> {
        self.auctions.get(&nonce).ok_or(Error::AuctionNotFound(nonce))
    }

    /// Get an auction that still accepts bids
    pub fn get_active(&self, nonce: u64) -> Result<&Auction> {
        let auction = self.get(nonce)?;
        if !auction.is_active() {
            return Err(Error::AuctionClosed(nonce));
        }
        Ok(auction)
    }

    /// All active auctions, by nonce
    pub fn active(&self) -> impl Iterator<Item = &Auction> {
        self.auctions.values().filter(|a| a.is_active())
    }

    /// All auctions ever created, by nonce
    pub fn all(&self) -> impl Iterator<Item = &Auction> {
        self.auctions.values()
    }

    /// Number of auctions ever created
    pub fn len(&self) -> usize {
        self.auctions.len()
    }

    /// Check if no auction was ever created
    pub fn is_empty(&self) -> bool {
        self.auctions.is_empty()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // MUTATIONS
    // ─────────────────────────────────────────────────────────────────────────

    /// Create an active auction and return its nonce
    pub fn open(&mut self, opening: AuctionOpening) -> Result<u64> {
        self.ensure_no_active(&opening.owner)?;

        let nonce = self.next_nonce;
        let next = nonce.checked_add(1).ok_or(Error::Overflow {
            operation: "auction nonce".into(),
        })?;

        let auction = Auction {
            nonce,
            owner: opening.owner,
            initiator: opening.initiator,
            start_time: opening.start_time,
            collateral: opening.collateral,
            debt: opening.debt,
            total_collateral_value: opening.total_collateral_value,
            total_debt_value: opening.total_debt_value,
            filled_ratio: Ratio::ZERO,
            bonus_paid: false,
            debt_paid: UsdValue::ZERO,
            bid_count: 0,
            state: AuctionState::Active,
            closed_at: None,
        };

        self.active_by_owner.insert(auction.owner, nonce);
        self.auctions.insert(nonce, auction);
        self.next_nonce = next;
        Ok(nonce)
    }

    /// Advance the filled ratio after a settled bid
    pub fn record_fill(
        &mut self,
        nonce: u64,
        filled_ratio: Ratio,
        debt_paid: UsdValue,
        bonus_paid: bool,
    ) -> Result<&Auction> {
        let auction = self
            .auctions
            .get_mut(&nonce)
            .ok_or(Error::AuctionNotFound(nonce))?;

        if !auction.is_active() {
            return Err(Error::AuctionClosed(nonce));
        }
        if filled_ratio <= auction.filled_ratio {
            return Err(Error::InvariantViolation(format!(
                "auction {} filled ratio would move from {} to {}",
                nonce, auction.filled_ratio, filled_ratio
            )));
        }

        let total_paid = auction.debt_paid.checked_add(debt_paid)?;
        if total_paid > auction.total_debt_value {
            return Err(Error::InvariantViolation(format!(
                "auction {} debt paid {} exceeds total {}",
                nonce, total_paid, auction.total_debt_value
            )));
        }

        auction.filled_ratio = filled_ratio;
        auction.debt_paid = total_paid;
        auction.bonus_paid |= bonus_paid;
        auction.bid_count += 1;
        Ok(auction)
    }

    /// Move an auction to Closed and release its owner
    pub fn close(&mut self, nonce: u64, timestamp: u64) -> Result<&Auction> {
        let auction = self
            .auctions
            .get_mut(&nonce)
            .ok_or(Error::AuctionNotFound(nonce))?;

        if !auction.is_active() {
            return Err(Error::AuctionClosed(nonce));
        }

        auction.state = AuctionState::Closed;
        auction.closed_at = Some(timestamp);
        self.active_by_owner.remove(&auction.owner);
        Ok(auction)
    }
}
