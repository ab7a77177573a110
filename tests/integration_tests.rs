//! Integration tests for the fMint liquidation engine.
//!
//! These tests drive complete auctions through the public API: a borrower
//! position becomes undercollateralized, a keeper starts the auction and
//! bidders fill it over time.

use fmint_liquidation::cli::{Scenario, ScenarioRunner};
use fmint_liquidation::core::config::EngineConfig;
use fmint_liquidation::core::token::{TokenAmount, TokenId, UsdValue};
use fmint_liquidation::error::Error;
use fmint_liquidation::events::AuctionEvent;
use fmint_liquidation::governance::CallContext;
use fmint_liquidation::ledger::{holding_of, InMemoryLedger, NativeLedger, PositionLedger, TokenLedger};
use fmint_liquidation::liquidation::{AuctionState, BidRequest, LiquidationManager};
use fmint_liquidation::oracle::{Price, PriceFeed};
use fmint_liquidation::utils::constants::TOKEN_UNIT;
use fmint_liquidation::utils::crypto::Address;
use fmint_liquidation::utils::math::Ratio;

// ═══════════════════════════════════════════════════════════════════════════════
// TEST HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

const START: u64 = 1_700_000_000;
const BONUS: u128 = TOKEN_UNIT / 20;

struct World {
    manager: LiquidationManager,
    ledger: InMemoryLedger,
    feed: PriceFeed,
    wftm: TokenId,
    fusd: TokenId,
    borrower: Address,
    keeper: Address,
    bidder1: Address,
    bidder2: Address,
}

impl World {
    /// 9999 wFTM backing 3366.33 fUSD, priced at $1 (healthy)
    fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    fn with_config(config: EngineConfig) -> Self {
        let manager = LiquidationManager::new(config).unwrap();
        let engine = *manager.engine_address();
        let wftm = TokenId::new("wFTM");
        let fusd = TokenId::new("fUSD");
        let borrower = Address::from_label("borrower");
        let keeper = Address::from_label("keeper");
        let bidder1 = Address::from_label("bidder1");
        let bidder2 = Address::from_label("bidder2");

        let mut feed = PriceFeed::new();
        feed.set_price(wftm.clone(), Price::from_wei(TOKEN_UNIT)).unwrap();
        feed.set_price(fusd.clone(), Price::from_wei(TOKEN_UNIT)).unwrap();

        let mut ledger = InMemoryLedger::new(Address::from_label("fmint"));
        ledger.fund(&wftm, &borrower, TokenAmount::from_whole(9999)).unwrap();
        ledger.deposit(&borrower, &wftm, TokenAmount::from_whole(9999)).unwrap();
        ledger.mint(&borrower, &fusd, amount("3366.33"), &feed).unwrap();

        for bidder in [&bidder1, &bidder2] {
            ledger.fund(&fusd, bidder, TokenAmount::from_whole(5000)).unwrap();
            ledger.approve(&fusd, bidder, &engine, TokenAmount::from_whole(5000));
            ledger.fund_native(bidder, TOKEN_UNIT).unwrap();
        }

        Self {
            manager,
            ledger,
            feed,
            wftm,
            fusd,
            borrower,
            keeper,
            bidder1,
            bidder2,
        }
    }

    /// Drop wFTM to $0.5, putting the position at 148.5%
    fn crash(&mut self) {
        self.feed
            .set_price(self.wftm.clone(), Price::from_wei(TOKEN_UNIT / 2))
            .unwrap();
    }

    fn start(&mut self) -> u64 {
        let ctx = CallContext::direct(self.keeper, START);
        self.manager
            .start_liquidation(&mut self.ledger, &self.feed, &ctx, &self.borrower)
            .unwrap()
    }

    fn bid(&mut self, bidder: Address, at: u64, request: BidRequest) -> Result<(), Error> {
        let ctx = CallContext::direct(bidder, START + at);
        self.manager.bid(&mut self.ledger, &ctx, request).map(|_| ())
    }

    fn wftm_of(&self, account: &Address) -> TokenAmount {
        self.ledger.balance_of(&self.wftm, account)
    }

    fn fusd_of(&self, account: &Address) -> TokenAmount {
        self.ledger.balance_of(&self.fusd, account)
    }
}

fn amount(s: &str) -> TokenAmount {
    TokenAmount::parse(s).unwrap()
}

fn pct(p: u64) -> Ratio {
    Ratio::from_percent(p)
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUCTION LIFECYCLE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_first_bid_at_start_fills_minimum_ratio() {
    let mut world = World::new();
    world.crash();
    let nonce = world.start();

    let supply_before = world.ledger.bank().total_supply(&world.fusd);
    world
        .bid(world.bidder1, 0, BidRequest::new(nonce, pct(100)).with_incentive(BONUS))
        .unwrap();

    assert_eq!(world.wftm_of(&world.bidder1), amount("1999.8"));
    assert_eq!(world.fusd_of(&world.bidder1), amount("4326.734"));
    assert_eq!(
        world.ledger.bank().total_supply(&world.fusd),
        supply_before.checked_sub(amount("673.266")).unwrap()
    );

    let auction = world.manager.get_auction(nonce).unwrap();
    assert_eq!(auction.filled_ratio, pct(20));
    assert_eq!(auction.state, AuctionState::Active);
    assert!(auction.bonus_paid);

    let position = world.ledger.position(&world.borrower);
    assert_eq!(position.collateral_of(&world.wftm), amount("7999.2"));
    assert_eq!(position.debt_of(&world.fusd), amount("2693.064"));
}

#[test]
fn test_partial_then_full_fill_conserves_collateral() {
    let mut world = World::new();
    world.crash();
    let nonce = world.start();
    let total_debt = world.manager.get_auction(nonce).unwrap().total_debt_value;
    assert_eq!(total_debt, UsdValue::parse("3366.33").unwrap());

    // 5000s in, the schedule offers 25%
    world
        .bid(world.bidder1, 5_000, BidRequest::new(nonce, pct(25)).with_incentive(BONUS))
        .unwrap();
    world
        .bid(world.bidder2, 80_000, BidRequest::new(nonce, pct(100)))
        .unwrap();

    assert_eq!(world.wftm_of(&world.bidder1), amount("2499.75"));
    assert_eq!(world.wftm_of(&world.bidder2), amount("7499.25"));
    assert_eq!(
        world.wftm_of(&world.bidder1).checked_add(world.wftm_of(&world.bidder2)).unwrap(),
        TokenAmount::from_whole(9999)
    );

    // second bidder pays 75% of the snapshotted debt value
    assert_eq!(
        TokenAmount::from_whole(5000).checked_sub(world.fusd_of(&world.bidder2)).unwrap(),
        amount("2524.7475")
    );

    let auction = world.manager.get_auction(nonce).unwrap();
    assert_eq!(auction.state, AuctionState::Closed);
    assert_eq!(auction.filled_ratio, Ratio::ONE);
    assert_eq!(auction.debt_paid, total_debt);

    assert!(world.ledger.position(&world.borrower).is_empty());
    assert!(!world.ledger.is_locked(&world.borrower));
    assert_eq!(world.ledger.balance_of(&world.wftm, world.ledger.escrow()), TokenAmount::ZERO);
    assert!(world.manager.active_auctions().is_empty());
}

#[test]
fn test_requested_ratio_is_capped_by_schedule() {
    let mut world = World::new();
    world.crash();
    let nonce = world.start();

    world
        .bid(world.bidder1, 40_000, BidRequest::new(nonce, pct(100)).with_incentive(BONUS))
        .unwrap();

    let auction = world.manager.get_auction(nonce).unwrap();
    assert_eq!(auction.filled_ratio, pct(60));
    assert!(auction.is_active());
    assert_eq!(world.wftm_of(&world.bidder1), amount("5999.4"));
}

#[test]
fn test_bid_at_filled_ratio_has_nothing_to_fill() {
    let mut world = World::new();
    world.crash();
    let nonce = world.start();

    world
        .bid(world.bidder1, 0, BidRequest::new(nonce, pct(20)).with_incentive(BONUS))
        .unwrap();
    let err = world
        .bid(world.bidder2, 0, BidRequest::new(nonce, pct(50)))
        .unwrap_err();

    assert!(matches!(err, Error::NothingToFill { .. }));
    assert_eq!(world.wftm_of(&world.bidder2), TokenAmount::ZERO);
    assert_eq!(world.fusd_of(&world.bidder2), TokenAmount::from_whole(5000));
}

#[test]
fn test_closed_auction_rejects_bids() {
    let mut world = World::new();
    world.crash();
    let nonce = world.start();

    world
        .bid(world.bidder1, 80_000, BidRequest::new(nonce, pct(100)).with_incentive(BONUS))
        .unwrap();
    let err = world
        .bid(world.bidder2, 90_000, BidRequest::new(nonce, pct(100)))
        .unwrap_err();
    assert!(matches!(err, Error::AuctionClosed(n) if n == nonce));
}

#[test]
fn test_capped_offering_refunds_owner_and_clears_debt() {
    let mut config = EngineConfig::default();
    config.params.max_offering_ratio = pct(80);
    let mut world = World::with_config(config);
    world.crash();
    let nonce = world.start();

    // the schedule tops out at 80% when the auction duration elapses
    world
        .bid(world.bidder1, 80_000, BidRequest::new(nonce, pct(100)).with_incentive(BONUS))
        .unwrap();

    assert_eq!(world.wftm_of(&world.bidder1), amount("7999.2"));
    assert_eq!(world.wftm_of(&world.borrower), amount("1999.8"));
    assert_eq!(
        TokenAmount::from_whole(5000).checked_sub(world.fusd_of(&world.bidder1)).unwrap(),
        amount("2693.064")
    );

    let auction = world.manager.get_auction(nonce).unwrap();
    assert_eq!(auction.state, AuctionState::Closed);
    assert_eq!(auction.filled_ratio, pct(80));

    // the unsold fifth goes home and the whole snapshotted debt is gone
    assert!(world.ledger.position(&world.borrower).is_empty());
    assert!(world.ledger.debt_balances(&world.borrower).is_empty());
    assert!(!world.ledger.is_locked(&world.borrower));
    assert_eq!(world.ledger.balance_of(&world.wftm, world.ledger.escrow()), TokenAmount::ZERO);

    let closed = world.manager.events().filter_by_type("AuctionClosed");
    assert!(matches!(
        closed[0],
        AuctionEvent::AuctionClosed { refunded, .. } if refunded == &vec![(world.wftm.clone(), amount("1999.8"))]
    ));

    let ctx = CallContext::direct(world.keeper, START + 90_000);
    let restart = world
        .manager
        .start_liquidation(&mut world.ledger, &world.feed, &ctx, &world.borrower);
    assert!(matches!(restart, Err(Error::NotEligible(_))));

    // the owner can use the position again
    let (borrower, wftm) = (world.borrower, world.wftm.clone());
    world.ledger.deposit(&borrower, &wftm, amount("1999.8")).unwrap();
    world
        .ledger
        .withdraw(&borrower, &wftm, amount("999.8"), &world.feed)
        .unwrap();
    assert_eq!(world.ledger.position(&borrower).collateral_of(&wftm), TokenAmount::from_whole(1000));
}

#[test]
fn test_multi_collateral_fill_conserves_each_token() {
    let mut world = World::new();
    let engine = *world.manager.engine_address();
    let wsol = TokenId::new("wSOL");
    let sol_deposit = amount("1234.567891234567891");
    let (borrower, fusd) = (world.borrower, world.fusd.clone());
    let bidder3 = Address::from_label("bidder3");

    world.feed.set_price(wsol.clone(), Price::from_wei(TOKEN_UNIT)).unwrap();
    world.ledger.fund(&wsol, &borrower, sol_deposit).unwrap();
    world.ledger.deposit(&borrower, &wsol, sol_deposit).unwrap();
    world.ledger.fund(&fusd, &bidder3, TokenAmount::from_whole(5000)).unwrap();
    world.ledger.approve(&fusd, &bidder3, &engine, TokenAmount::from_whole(5000));

    // 4999.5 + 12.34567891234567891 against 3366.33 is below 150%
    world.crash();
    world.feed.set_price(wsol.clone(), Price::from_wei(TOKEN_UNIT / 100)).unwrap();
    let nonce = world.start();
    let snapshot = world.manager.get_auction(nonce).unwrap().collateral.clone();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(holding_of(&snapshot, &wsol), sol_deposit);

    world
        .bid(world.bidder1, 0, BidRequest::new(nonce, pct(20)).with_incentive(BONUS))
        .unwrap();
    world
        .bid(world.bidder2, 40_000, BidRequest::new(nonce, pct(60)))
        .unwrap();
    world
        .bid(bidder3, 80_000, BidRequest::new(nonce, pct(100)))
        .unwrap();

    // slices are cut on cumulative boundaries, so the last bidder takes the dust
    let sol_of = |account: &Address| world.ledger.balance_of(&wsol, account);
    assert_eq!(sol_of(&world.bidder1), amount("246.913578246913578"));
    assert_eq!(sol_of(&world.bidder2), amount("493.827156493827156"));
    assert_eq!(sol_of(&bidder3), amount("493.827156493827157"));

    let bidders = [world.bidder1, world.bidder2, bidder3];
    for (token, snapshotted) in &snapshot {
        let received = bidders
            .iter()
            .try_fold(TokenAmount::ZERO, |acc, b| acc.checked_add(world.ledger.balance_of(token, b)))
            .unwrap();
        assert_eq!(received, *snapshotted, "{} not fully distributed", token);
        assert_eq!(world.ledger.balance_of(token, world.ledger.escrow()), TokenAmount::ZERO);
    }

    let auction = world.manager.get_auction(nonce).unwrap();
    assert_eq!(auction.state, AuctionState::Closed);
    assert_eq!(auction.bid_count, 3);
    assert_eq!(auction.debt_paid, auction.total_debt_value);
    assert!(world.ledger.position(&borrower).is_empty());
    assert!(!world.ledger.is_locked(&borrower));
}

// ═══════════════════════════════════════════════════════════════════════════════
// INITIATOR BONUS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_incentive_mismatch_then_follow_up_bid_without_incentive() {
    let mut world = World::new();
    world.crash();
    let nonce = world.start();

    let err = world
        .bid(world.bidder1, 0, BidRequest::new(nonce, pct(20)))
        .unwrap_err();
    assert!(matches!(err, Error::IncentiveMismatch { expected, attached } if expected == BONUS && attached == 0));
    assert_eq!(world.manager.get_auction(nonce).unwrap().filled_ratio, Ratio::ZERO);

    world
        .bid(world.bidder1, 0, BidRequest::new(nonce, pct(20)).with_incentive(BONUS))
        .unwrap();
    world
        .bid(world.bidder2, 40_000, BidRequest::new(nonce, pct(60)))
        .unwrap();

    assert_eq!(world.manager.get_auction(nonce).unwrap().filled_ratio, pct(60));
    assert_eq!(world.ledger.native_balance_of(&world.bidder2), TOKEN_UNIT);
}

#[test]
fn test_bonus_is_paid_exactly_once() {
    let mut world = World::new();
    world.crash();
    let nonce = world.start();

    world
        .bid(world.bidder1, 0, BidRequest::new(nonce, pct(20)).with_incentive(BONUS))
        .unwrap();
    // an attached value on a later bid is ignored
    world
        .bid(world.bidder2, 8_000, BidRequest::new(nonce, pct(30)).with_incentive(BONUS))
        .unwrap();
    world
        .bid(world.bidder2, 80_000, BidRequest::new(nonce, pct(100)))
        .unwrap();

    assert_eq!(world.ledger.native_balance_of(&world.keeper), BONUS);
    assert_eq!(world.ledger.native_balance_of(&world.bidder1), TOKEN_UNIT - BONUS);
    assert_eq!(world.ledger.native_balance_of(&world.bidder2), TOKEN_UNIT);
    assert_eq!(world.manager.statistics().total_bonus_paid, BONUS);
    assert_eq!(world.manager.events().filter_by_type("InitiatorPaid").len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════════
// START CONDITIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_healthy_position_is_not_eligible() {
    let mut world = World::new();
    let ctx = CallContext::direct(world.keeper, START);

    for _ in 0..2 {
        let err = world
            .manager
            .start_liquidation(&mut world.ledger, &world.feed, &ctx, &world.borrower)
            .unwrap_err();
        assert!(matches!(err, Error::NotEligible(_)));
    }

    assert_eq!(world.manager.next_nonce(), 1);
    assert!(world.manager.events().is_empty());
    assert!(!world.ledger.is_locked(&world.borrower));
    assert!(!world
        .manager
        .is_eligible_for_liquidation(&world.ledger, &world.feed, &world.borrower)
        .unwrap());
}

#[test]
fn test_second_start_is_rejected_while_active() {
    let mut world = World::new();
    world.crash();
    let nonce = world.start();

    let ctx = CallContext::direct(world.bidder1, START + 10);
    let err = world
        .manager
        .start_liquidation(&mut world.ledger, &world.feed, &ctx, &world.borrower)
        .unwrap_err();
    assert!(matches!(err, Error::AuctionAlreadyActive { nonce: n, .. } if n == nonce));
    assert_eq!(world.manager.next_nonce(), nonce + 1);
}

#[test]
fn test_contract_callers_are_rejected() {
    let mut world = World::new();
    world.crash();
    let router = Address::from_label("router");

    let ctx = CallContext::via_contract(world.keeper, router, START);
    let err = world
        .manager
        .start_liquidation(&mut world.ledger, &world.feed, &ctx, &world.borrower)
        .unwrap_err();
    assert!(matches!(err, Error::ContractCallerRejected { .. }));

    let nonce = world.start();
    let ctx = CallContext::via_contract(world.bidder1, router, START);
    let err = world
        .manager
        .bid(&mut world.ledger, &ctx, BidRequest::new(nonce, pct(20)).with_incentive(BONUS))
        .unwrap_err();
    assert!(matches!(err, Error::ContractCallerRejected { .. }));
}

#[test]
fn test_restricted_start_requires_admin() {
    let mut config = EngineConfig::default();
    config.params.restrict_start_to_admins = true;
    let mut world = World::with_config(config);
    world.crash();

    let ctx = CallContext::direct(world.keeper, START);
    let err = world
        .manager
        .start_liquidation(&mut world.ledger, &world.feed, &ctx, &world.borrower)
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));

    let owner = CallContext::direct(*world.manager.access().owner(), START);
    world.manager.add_admin(&owner, world.keeper).unwrap();
    assert_eq!(world.start(), 1);
}

#[test]
fn test_pause_blocks_start_and_bids() {
    let mut world = World::new();
    world.crash();
    let nonce = world.start();
    let owner = CallContext::direct(*world.manager.access().owner(), START);

    world.manager.pause(&owner).unwrap();
    let err = world
        .bid(world.bidder1, 0, BidRequest::new(nonce, pct(20)).with_incentive(BONUS))
        .unwrap_err();
    assert!(matches!(err, Error::ProtocolPaused));

    world.manager.unpause(&owner).unwrap();
    world
        .bid(world.bidder1, 0, BidRequest::new(nonce, pct(20)).with_incentive(BONUS))
        .unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// POSITION LOCK AND FUNDING
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_position_is_frozen_during_auction() {
    let mut world = World::new();
    world.crash();
    world.start();

    let (borrower, wftm, fusd) = (world.borrower, world.wftm.clone(), world.fusd.clone());
    let err = world
        .ledger
        .withdraw(&borrower, &wftm, TokenAmount::from_whole(1), &world.feed)
        .unwrap_err();
    assert!(matches!(err, Error::PositionLocked(_)));
    assert!(world
        .ledger
        .repay(&borrower, &fusd, TokenAmount::from_whole(1))
        .is_err());

    // deposits are still accepted but do not change the snapshot
    world.ledger.fund(&wftm, &borrower, TokenAmount::from_whole(1)).unwrap();
    world.ledger.deposit(&borrower, &wftm, TokenAmount::from_whole(1)).unwrap();
    assert_eq!(
        world.manager.get_auction(1).unwrap().collateral[0].1,
        TokenAmount::from_whole(9999)
    );
}

#[test]
fn test_insufficient_allowance_leaves_state_untouched() {
    let mut world = World::new();
    world.crash();
    let nonce = world.start();
    let engine = *world.manager.engine_address();
    world
        .ledger
        .approve(&world.fusd.clone(), &world.bidder1.clone(), &engine, amount("1"));

    let err = world
        .bid(world.bidder1, 0, BidRequest::new(nonce, pct(20)).with_incentive(BONUS))
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientAllowance { .. }));
    assert_eq!(world.ledger.native_balance_of(&world.bidder1), TOKEN_UNIT);
    assert_eq!(
        world.ledger.collateral_balances(&world.borrower)[0].1,
        TokenAmount::from_whole(9999)
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// QUERIES AND EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_liquidation_details() {
    let mut world = World::new();
    world.crash();
    let nonce = world.start();

    let details = world.manager.get_liquidation_details(nonce, START + 40_000).unwrap();
    assert_eq!(details.offering_ratio, pct(60));
    assert_eq!(details.filled_ratio, Ratio::ZERO);
    assert_eq!(details.end_time, START + 80_000);
    assert_eq!(details.total_collateral_value, UsdValue::parse("4999.5").unwrap());
    assert_eq!(details.total_debt_value, UsdValue::parse("3366.33").unwrap());

    assert!(matches!(
        world.manager.get_liquidation_details(99, START),
        Err(Error::AuctionNotFound(99))
    ));
}

#[test]
fn test_event_trail_of_full_auction() {
    let mut world = World::new();
    world.crash();
    let nonce = world.start();
    world
        .bid(world.bidder1, 80_000, BidRequest::new(nonce, pct(100)).with_incentive(BONUS))
        .unwrap();

    let kinds: Vec<&str> = world
        .manager
        .events()
        .for_auction(nonce)
        .iter()
        .map(|e| e.event_type())
        .collect();
    assert_eq!(kinds, vec!["AuctionStarted", "InitiatorPaid", "BidFilled", "AuctionClosed"]);

    let closed = world.manager.events().filter_by_type("AuctionClosed");
    assert!(matches!(closed[0], AuctionEvent::AuctionClosed { refunded, .. } if refunded.iter().all(|(_, a)| a.is_zero())));
}

#[test]
fn test_demo_scenario_replays_cleanly() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/partial-fill.json");
    let scenario = Scenario::load(&path).unwrap();
    let mut runner = ScenarioRunner::new(EngineConfig::default(), &scenario).unwrap();

    let report = runner.run(&scenario);
    assert_eq!(report.failures(), 0, "{:#?}", report.steps);
    assert!(runner.manager().active_auctions().is_empty());
}
