//! Liquidation manager.
//!
//! Orchestrates the auction lifecycle:
//! - Eligibility checks against the live ledger and oracle
//! - Auction start (snapshot, lock, initiator recorded)
//! - Partial-fill bids priced by the offering-ratio schedule
//! - Closure once the maximum ratio is sold
//!
//! Ledger and oracle are passed into every call. Each mutating call validates
//! everything first and only then touches state, so a rejected call leaves the
//! engine and the ledger exactly as they were.

use serde::{Deserialize, Serialize};

use crate::core::config::{AuctionParams, EngineConfig};
use crate::core::token::{TokenAmount, TokenId, UsdValue};
use crate::error::{Error, Result};
use crate::events::{AuctionEvent, EventLog};
use crate::governance::{AccessGuard, CallContext};
use crate::ledger::Ledger;
use crate::liquidation::auction::{Auction, AuctionOpening, AuctionRegistry, LiquidationDetails};
use crate::liquidation::eligibility::{position_health, PositionHealth};
use crate::liquidation::schedule::PricingSchedule;
use crate::liquidation::settlement::{apply_fill, plan_fill, BidRequest, FillPlan, SettlementTerms};
use crate::oracle::PriceSource;
use crate::utils::crypto::Address;
use crate::utils::math::{safe_add, Ratio};

// ═══════════════════════════════════════════════════════════════════════════════
// STATISTICS
// ═══════════════════════════════════════════════════════════════════════════════

/// Liquidation statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationStats {
    pub auctions_started: u64,
    pub auctions_closed: u64,
    pub bids_filled: u64,
    pub total_debt_value_repaid: UsdValue,
    pub total_stable_burned: TokenAmount,
    pub total_bonus_paid: u128,
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIQUIDATION MANAGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Auction-based liquidation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationManager {
    /// Auction parameters
    params: AuctionParams,
    /// Account the engine acts as
    engine_address: Address,
    /// Token that settles debt
    stable_token: TokenId,
    /// Fee vault wired by admins
    fee_vault: Address,
    /// Owner, admins and live switch
    guard: AccessGuard,
    /// All auctions
    registry: AuctionRegistry,
    /// Emitted events
    events: EventLog,
    /// Running totals
    stats: LiquidationStats,
}

impl LiquidationManager {
    /// Create a manager from a validated configuration
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            guard: AccessGuard::with_admins(config.owner, config.admins.iter().copied()),
            params: config.params,
            engine_address: config.engine_address,
            stable_token: config.stable_token,
            fee_vault: config.fee_vault,
            registry: AuctionRegistry::new(),
            events: EventLog::new(config.max_events),
            stats: LiquidationStats::default(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ELIGIBILITY
    // ═══════════════════════════════════════════════════════════════════════════

    /// Current health of `account`'s position
    pub fn position_health<L: Ledger + ?Sized>(
        &self,
        ledger: &L,
        prices: &dyn PriceSource,
        account: &Address,
    ) -> Result<PositionHealth> {
        position_health(ledger, prices, account)
    }

    /// True iff `account` has debt and is below the minimum collateral ratio
    pub fn is_eligible_for_liquidation<L: Ledger + ?Sized>(
        &self,
        ledger: &L,
        prices: &dyn PriceSource,
        account: &Address,
    ) -> Result<bool> {
        Ok(self
            .position_health(ledger, prices, account)?
            .is_liquidatable(self.params.min_collateral_ratio))
    }

    /// True iff `account`'s position is healthy
    pub fn collateral_is_eligible<L: Ledger + ?Sized>(
        &self,
        ledger: &L,
        prices: &dyn PriceSource,
        account: &Address,
    ) -> Result<bool> {
        Ok(!self.is_eligible_for_liquidation(ledger, prices, account)?)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // AUCTION START
    // ═══════════════════════════════════════════════════════════════════════════

    /// Put `account`'s position up for auction and return the auction nonce
    pub fn start_liquidation<L: Ledger + ?Sized>(
        &mut self,
        ledger: &mut L,
        prices: &dyn PriceSource,
        ctx: &CallContext,
        account: &Address,
    ) -> Result<u64> {
        self.guard.ensure_live()?;
        if let Err(e) = ctx.ensure_externally_originated() {
            tracing::warn!(account = %account.short(), caller = %ctx.caller.short(), "liquidation trigger from contract rejected");
            return Err(e);
        }
        if self.params.restrict_start_to_admins {
            self.guard.ensure_admin(ctx)?;
        }

        let health = self.position_health(&*ledger, prices, account)?;
        if !health.is_liquidatable(self.params.min_collateral_ratio) {
            return Err(Error::NotEligible(account.to_string()));
        }
        // Nothing to sell: debt without collateral cannot be auctioned
        let collateral = ledger.collateral_balances(account);
        if collateral.iter().all(|(_, amount)| amount.is_zero()) {
            return Err(Error::NotEligible(account.to_string()));
        }
        self.registry.ensure_no_active(account)?;

        let nonce = self.registry.open(AuctionOpening {
            owner: *account,
            initiator: ctx.caller,
            start_time: ctx.timestamp,
            collateral,
            debt: ledger.debt_balances(account),
            total_collateral_value: health.collateral_value,
            total_debt_value: health.debt_value,
        })?;
        ledger.set_position_locked(account, true);

        self.stats.auctions_started += 1;
        self.events.push(AuctionEvent::AuctionStarted {
            nonce,
            owner: *account,
            initiator: ctx.caller,
            total_collateral_value: health.collateral_value,
            total_debt_value: health.debt_value,
            timestamp: ctx.timestamp,
        });

        tracing::info!(
            nonce,
            owner = %account.short(),
            initiator = %ctx.caller.short(),
            collateral_value = %health.collateral_value,
            debt_value = %health.debt_value,
            "auction started"
        );

        Ok(nonce)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BIDDING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Fill the slice between the auction's filled ratio and
    /// `min(requested, current offering ratio)`
    pub fn bid<L: Ledger + ?Sized>(
        &mut self,
        ledger: &mut L,
        ctx: &CallContext,
        request: BidRequest,
    ) -> Result<FillPlan> {
        self.guard.ensure_live()?;
        ctx.ensure_externally_originated()?;

        let schedule = self.schedule()?;
        let terms = SettlementTerms {
            engine: &self.engine_address,
            stable_token: &self.stable_token,
            initiator_bonus: self.params.initiator_bonus,
            max_ratio: self.params.max_offering_ratio,
        };

        let auction = self.registry.get_active(request.nonce)?;
        let current = schedule.current_ratio(auction.start_time, ctx.timestamp);
        let plan = plan_fill(&*ledger, auction, &request, &ctx.caller, current, &terms)?;

        apply_fill(ledger, &plan, &terms).map_err(|e| {
            Error::InvariantViolation(format!(
                "auction {} fill failed after validation: {}",
                plan.nonce, e
            ))
        })?;

        self.registry.record_fill(
            plan.nonce,
            plan.to_ratio,
            plan.debt_owed,
            plan.incentive.is_some(),
        )?;

        self.stats.bids_filled += 1;
        self.stats.total_debt_value_repaid = self.stats.total_debt_value_repaid.checked_add(plan.debt_owed)?;
        self.stats.total_stable_burned = self.stats.total_stable_burned.checked_add(plan.stable_amount)?;

        if let Some(payment) = &plan.incentive {
            self.stats.total_bonus_paid = safe_add(self.stats.total_bonus_paid, payment.amount)?;
            self.events.push(AuctionEvent::InitiatorPaid {
                nonce: plan.nonce,
                initiator: payment.initiator,
                bidder: plan.bidder,
                amount: payment.amount,
            });
        }

        self.events.push(AuctionEvent::BidFilled {
            nonce: plan.nonce,
            bidder: plan.bidder,
            delta_ratio: plan.delta_ratio(),
            filled_ratio: plan.to_ratio,
            debt_paid: plan.debt_owed,
            stable_burned: plan.stable_amount,
            timestamp: ctx.timestamp,
        });

        tracing::debug!(
            nonce = plan.nonce,
            bidder = %plan.bidder.short(),
            delta = %plan.delta_ratio(),
            filled = %plan.to_ratio,
            debt_paid = %plan.debt_owed,
            "bid filled"
        );

        if plan.closes {
            self.registry.close(plan.nonce, ctx.timestamp)?;
            self.stats.auctions_closed += 1;
            self.events.push(AuctionEvent::AuctionClosed {
                nonce: plan.nonce,
                owner: plan.owner,
                refunded: plan.owner_refund.clone(),
                timestamp: ctx.timestamp,
            });
            tracing::info!(nonce = plan.nonce, owner = %plan.owner.short(), "auction closed");
        }

        Ok(plan)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Get an auction by nonce
    pub fn get_auction(&self, nonce: u64) -> Result<&Auction> {
        self.registry.get(nonce)
    }

    /// Offering ratio of an auction at `now`
    pub fn current_offering_ratio(&self, nonce: u64, now: u64) -> Result<Ratio> {
        let auction = self.registry.get(nonce)?;
        Ok(self.schedule()?.current_ratio(auction.start_time, now))
    }

    /// What a bidder needs to size a bid
    pub fn get_liquidation_details(&self, nonce: u64, now: u64) -> Result<LiquidationDetails> {
        let auction = self.registry.get(nonce)?;
        let schedule = self.schedule()?;

        Ok(LiquidationDetails {
            nonce,
            state: auction.state,
            offering_ratio: schedule.current_ratio(auction.start_time, now),
            filled_ratio: auction.filled_ratio,
            start_time: auction.start_time,
            end_time: schedule.end_time(auction.start_time),
            collateral: auction.collateral.clone(),
            total_collateral_value: auction.total_collateral_value,
            debt: auction.debt.clone(),
            total_debt_value: auction.total_debt_value,
        })
    }

    /// Active auctions, by nonce
    pub fn active_auctions(&self) -> Vec<&Auction> {
        self.registry.active().collect()
    }

    /// Active auction of `owner`, if any
    pub fn active_auction_for(&self, owner: &Address) -> Option<&Auction> {
        self.registry
            .active_for(owner)
            .and_then(|nonce| self.registry.get(nonce).ok())
    }

    /// Nonce the next auction will receive
    pub fn next_nonce(&self) -> u64 {
        self.registry.next_nonce()
    }

    /// Current offering-ratio schedule
    pub fn schedule(&self) -> Result<PricingSchedule> {
        PricingSchedule::from_params(&self.params)
    }

    /// Auction parameters
    pub fn params(&self) -> &AuctionParams {
        &self.params
    }

    /// Account the engine acts as (allowance spender)
    pub fn engine_address(&self) -> &Address {
        &self.engine_address
    }

    /// Token that settles debt
    pub fn stable_token(&self) -> &TokenId {
        &self.stable_token
    }

    /// Fee vault
    pub fn fee_vault(&self) -> &Address {
        &self.fee_vault
    }

    /// Owner, admins and live switch
    pub fn access(&self) -> &AccessGuard {
        &self.guard
    }

    /// Check if accepting liquidations and bids
    pub fn live(&self) -> bool {
        self.guard.is_live()
    }

    /// Emitted events
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Get statistics
    pub fn statistics(&self) -> &LiquidationStats {
        &self.stats
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ADMINISTRATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Add an admin (owner only)
    pub fn add_admin(&mut self, ctx: &CallContext, account: Address) -> Result<()> {
        if self.guard.add_admin(ctx, account)? {
            self.events.push(AuctionEvent::AdminAdded {
                account,
                timestamp: ctx.timestamp,
            });
            tracing::info!(admin = %account.short(), "admin added");
        }
        Ok(())
    }

    /// Remove an admin (owner only)
    pub fn remove_admin(&mut self, ctx: &CallContext, account: &Address) -> Result<()> {
        if self.guard.remove_admin(ctx, account)? {
            self.events.push(AuctionEvent::AdminRemoved {
                account: *account,
                timestamp: ctx.timestamp,
            });
            tracing::info!(admin = %account.short(), "admin removed");
        }
        Ok(())
    }

    /// Hand the owner role over (owner only)
    pub fn transfer_ownership(&mut self, ctx: &CallContext, new_owner: Address) -> Result<()> {
        let previous = *self.guard.owner();
        self.guard.transfer_ownership(ctx, new_owner)?;
        self.events.push(AuctionEvent::OwnershipTransferred {
            previous,
            new_owner,
            timestamp: ctx.timestamp,
        });
        tracing::info!(previous = %previous.short(), new_owner = %new_owner.short(), "ownership transferred");
        Ok(())
    }

    /// Stop accepting liquidations and bids
    pub fn pause(&mut self, ctx: &CallContext) -> Result<()> {
        self.guard.pause(ctx)?;
        self.events.push(AuctionEvent::Paused {
            by: ctx.caller,
            timestamp: ctx.timestamp,
        });
        tracing::info!(by = %ctx.caller.short(), "liquidation engine paused");
        Ok(())
    }

    /// Resume accepting liquidations and bids
    pub fn unpause(&mut self, ctx: &CallContext) -> Result<()> {
        self.guard.unpause(ctx)?;
        self.events.push(AuctionEvent::Unpaused {
            by: ctx.caller,
            timestamp: ctx.timestamp,
        });
        tracing::info!(by = %ctx.caller.short(), "liquidation engine unpaused");
        Ok(())
    }

    /// Set the native bonus the first bidder pays the initiator
    pub fn update_initiator_bonus(&mut self, ctx: &CallContext, bonus: u128) -> Result<()> {
        self.guard.ensure_admin(ctx)?;
        let old = self.params.initiator_bonus;
        self.params.initiator_bonus = bonus;
        self.config_changed(ctx, "initiator_bonus", old.to_string(), bonus.to_string());
        Ok(())
    }

    /// Set the fee vault address
    pub fn update_fee_vault(&mut self, ctx: &CallContext, vault: Address) -> Result<()> {
        self.guard.ensure_admin(ctx)?;
        if vault.is_zero() {
            return Err(Error::InvalidParameter {
                name: "fee_vault".into(),
                reason: "cannot be the zero address".into(),
            });
        }
        let old = std::mem::replace(&mut self.fee_vault, vault);
        self.config_changed(ctx, "fee_vault", old.to_string(), vault.to_string());
        Ok(())
    }

    /// Rewire the token that settles debt
    pub fn update_stable_token(&mut self, ctx: &CallContext, token: TokenId) -> Result<()> {
        self.guard.ensure_admin(ctx)?;
        if token.symbol().is_empty() {
            return Err(Error::InvalidParameter {
                name: "stable_token".into(),
                reason: "cannot be empty".into(),
            });
        }
        let new_value = token.to_string();
        let old = std::mem::replace(&mut self.stable_token, token);
        self.config_changed(ctx, "stable_token", old.to_string(), new_value);
        Ok(())
    }

    /// Change the offering-ratio schedule (applies to running auctions too)
    pub fn update_auction_schedule(
        &mut self,
        ctx: &CallContext,
        min_ratio: Ratio,
        duration_secs: u64,
    ) -> Result<()> {
        self.guard.ensure_admin(ctx)?;
        let updated = self.params.clone().with_schedule(min_ratio, duration_secs);
        updated.validate()?;

        let old = format!(
            "{} over {}s",
            self.params.min_offering_ratio, self.params.auction_duration_secs
        );
        self.params = updated;
        self.config_changed(
            ctx,
            "auction_schedule",
            old,
            format!("{} over {}s", min_ratio, duration_secs),
        );
        Ok(())
    }

    /// Change the collateral ratio below which positions can be liquidated
    pub fn update_min_collateral_ratio(&mut self, ctx: &CallContext, ratio: Ratio) -> Result<()> {
        self.guard.ensure_admin(ctx)?;
        if ratio.is_zero() {
            return Err(Error::InvalidParameter {
                name: "min_collateral_ratio".into(),
                reason: "cannot be zero".into(),
            });
        }
        let old = self.params.min_collateral_ratio;
        self.params.min_collateral_ratio = ratio;
        self.config_changed(ctx, "min_collateral_ratio", old.to_string(), ratio.to_string());
        Ok(())
    }

    /// Restrict (or open) `start_liquidation` to admins
    pub fn set_start_restricted(&mut self, ctx: &CallContext, restricted: bool) -> Result<()> {
        self.guard.ensure_admin(ctx)?;
        let old = self.params.restrict_start_to_admins;
        self.params.restrict_start_to_admins = restricted;
        self.config_changed(
            ctx,
            "restrict_start_to_admins",
            old.to_string(),
            restricted.to_string(),
        );
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL
    // ═══════════════════════════════════════════════════════════════════════════

    fn config_changed(&mut self, ctx: &CallContext, parameter: &str, old_value: String, new_value: String) {
        tracing::info!(parameter, old = %old_value, new = %new_value, by = %ctx.caller.short(), "configuration changed");
        self.events.push(AuctionEvent::ConfigChanged {
            parameter: parameter.to_string(),
            old_value,
            new_value,
            changed_by: ctx.caller,
            timestamp: ctx.timestamp,
        });
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }
}
