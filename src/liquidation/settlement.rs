//! Bid settlement.
//!
//! A bid is settled in two phases. `plan_fill` reads the auction and the
//! ledger and either rejects the bid or returns a `FillPlan` whose every
//! transfer is known to be covered. `apply_fill` then executes the plan.
//! Rejections therefore never leave partial state behind.

use serde::{Deserialize, Serialize};

use crate::core::token::{Holdings, TokenAmount, TokenId, UsdValue};
use crate::error::{Error, Result};
use crate::ledger::{holding_of, Ledger};
use crate::liquidation::auction::Auction;
use crate::utils::constants::NATIVE_ASSET_SYMBOL;
use crate::utils::crypto::Address;
use crate::utils::math::Ratio;

// ═══════════════════════════════════════════════════════════════════════════════
// BID REQUEST
// ═══════════════════════════════════════════════════════════════════════════════

/// A bidder's request against one auction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidRequest {
    /// Auction nonce
    pub nonce: u64,
    /// Cumulative ratio the bidder wants filled up to
    pub requested_ratio: Ratio,
    /// Native asset attached to the call
    pub attached_incentive: u128,
}

impl BidRequest {
    /// Bid without attached native asset
    pub fn new(nonce: u64, requested_ratio: Ratio) -> Self {
        Self {
            nonce,
            requested_ratio,
            attached_incentive: 0,
        }
    }

    /// Attach native asset (the initiator bonus on a first bid)
    pub fn with_incentive(mut self, amount: u128) -> Self {
        self.attached_incentive = amount;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FILL PLAN
// ═══════════════════════════════════════════════════════════════════════════════

/// Engine-wide settlement settings
#[derive(Debug, Clone, Copy)]
pub struct SettlementTerms<'a> {
    /// Account pulling and burning the stable token
    pub engine: &'a Address,
    /// Token that settles debt
    pub stable_token: &'a TokenId,
    /// Native bonus the first bidder must attach
    pub initiator_bonus: u128,
    /// Ratio at which an auction closes
    pub max_ratio: Ratio,
}

/// Bonus transfer from the first bidder to the initiator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncentivePayment {
    /// Receiver
    pub initiator: Address,
    /// Native amount
    pub amount: u128,
}

/// Fully validated effects of one bid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillPlan {
    /// Auction nonce
    pub nonce: u64,
    /// Position owner
    pub owner: Address,
    /// Bidder
    pub bidder: Address,
    /// Filled ratio before the bid
    pub from_ratio: Ratio,
    /// Filled ratio after the bid
    pub to_ratio: Ratio,
    /// Debt value charged to the bidder
    pub debt_owed: UsdValue,
    /// Stable tokens pulled from the bidder and burned
    pub stable_amount: TokenAmount,
    /// Collateral handed to the bidder
    pub collateral: Holdings,
    /// Debt removed from the owner's position. On the closing bid this is
    /// the whole unsettled remainder of the debt snapshot.
    pub debt_settled: Holdings,
    /// Initiator bonus, on the first bid only
    pub incentive: Option<IncentivePayment>,
    /// Whether this bid closes the auction
    pub closes: bool,
    /// Collateral returned to the owner at close
    pub owner_refund: Holdings,
}

impl FillPlan {
    /// Incremental ratio this bid fills
    pub fn delta_ratio(&self) -> Ratio {
        self.to_ratio.saturating_sub(self.from_ratio)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLANNING
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate a bid against the auction and ledger and compute its effects
pub fn plan_fill<L>(
    ledger: &L,
    auction: &Auction,
    request: &BidRequest,
    bidder: &Address,
    current_ratio: Ratio,
    terms: &SettlementTerms<'_>,
) -> Result<FillPlan>
where
    L: Ledger + ?Sized,
{
    if !auction.is_active() {
        return Err(Error::AuctionClosed(auction.nonce));
    }

    let from_ratio = auction.filled_ratio;
    let to_ratio = request
        .requested_ratio
        .min(current_ratio)
        .min(terms.max_ratio);
    if to_ratio <= from_ratio {
        return Err(Error::NothingToFill {
            target: to_ratio.raw(),
            filled: from_ratio.raw(),
        });
    }

    let debt_owed = auction.debt_value_slice(from_ratio, to_ratio)?;
    let stable_amount = debt_owed.as_stable_amount();
    let collateral = auction.collateral_slice(from_ratio, to_ratio)?;
    // Stable token: allowance to the engine, then balance
    if !stable_amount.is_zero() {
        let approved = ledger.allowance(terms.stable_token, bidder, terms.engine);
        if approved < stable_amount {
            return Err(Error::InsufficientAllowance {
                required: stable_amount.raw(),
                approved: approved.raw(),
            });
        }
        let balance = ledger.balance_of(terms.stable_token, bidder);
        if balance < stable_amount {
            return Err(Error::InsufficientBalance {
                token: terms.stable_token.to_string(),
                required: stable_amount.raw(),
                available: balance.raw(),
            });
        }
    }

    // Closing releases the snapshot: unsold collateral goes back to the owner
    // and the rest of the snapshotted debt is extinguished with it
    let closes = to_ratio >= terms.max_ratio;
    let (owner_refund, debt_settled) = if closes {
        (
            auction.collateral_slice(to_ratio, Ratio::ONE)?,
            auction.debt_slice(from_ratio, Ratio::ONE)?,
        )
    } else {
        (Vec::new(), auction.debt_slice(from_ratio, to_ratio)?)
    };

    // Escrowed collateral must cover the bidder's share plus any refund
    let escrowed = ledger.collateral_balances(&auction.owner);
    for (token, share) in &collateral {
        let refund = holding_of(&owner_refund, token);
        let required = share.checked_add(refund)?;
        let available = holding_of(&escrowed, token);
        if available < required {
            return Err(Error::InsufficientCollateral {
                token: token.to_string(),
                required: required.raw(),
                available: available.raw(),
            });
        }
    }

    let recorded_debt = ledger.debt_balances(&auction.owner);
    for (token, share) in &debt_settled {
        if holding_of(&recorded_debt, token) < *share {
            return Err(Error::InvariantViolation(format!(
                "auction {} settles {} {} but position records less",
                auction.nonce, share, token
            )));
        }
    }

    let incentive = if auction.bonus_paid {
        None
    } else {
        if request.attached_incentive != terms.initiator_bonus {
            return Err(Error::IncentiveMismatch {
                expected: terms.initiator_bonus,
                attached: request.attached_incentive,
            });
        }
        let native = ledger.native_balance_of(bidder);
        if native < terms.initiator_bonus {
            return Err(Error::InsufficientBalance {
                token: NATIVE_ASSET_SYMBOL.into(),
                required: terms.initiator_bonus,
                available: native,
            });
        }
        Some(IncentivePayment {
            initiator: auction.initiator,
            amount: terms.initiator_bonus,
        })
    };

    Ok(FillPlan {
        nonce: auction.nonce,
        owner: auction.owner,
        bidder: *bidder,
        from_ratio,
        to_ratio,
        debt_owed,
        stable_amount,
        collateral,
        debt_settled,
        incentive,
        closes,
        owner_refund,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXECUTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Execute a plan produced by `plan_fill` against the same ledger state
pub fn apply_fill<L>(ledger: &mut L, plan: &FillPlan, terms: &SettlementTerms<'_>) -> Result<()>
where
    L: Ledger + ?Sized,
{
    if !plan.stable_amount.is_zero() {
        ledger.transfer_from(
            terms.stable_token,
            terms.engine,
            &plan.bidder,
            terms.engine,
            plan.stable_amount,
        )?;
        ledger.burn(terms.stable_token, terms.engine, plan.stable_amount)?;
    }

    for (token, amount) in &plan.collateral {
        ledger.debit_collateral(&plan.owner, token, *amount, &plan.bidder)?;
    }

    for (token, amount) in &plan.debt_settled {
        ledger.settle_debt(&plan.owner, token, *amount)?;
    }

    if let Some(payment) = &plan.incentive {
        if payment.amount > 0 {
            ledger.transfer_native(&plan.bidder, &payment.initiator, payment.amount)?;
        }
    }

    if plan.closes {
        for (token, amount) in &plan.owner_refund {
            ledger.debit_collateral(&plan.owner, token, *amount, &plan.owner)?;
        }
        ledger.set_position_locked(&plan.owner, false);
    }

    Ok(())
}
