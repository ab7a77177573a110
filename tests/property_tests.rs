//! Property tests for auction fills.
//!
//! Arbitrary bid sequences against one auction must keep the filled ratio
//! monotone, never exceed the offered ratio, and hand out exactly the
//! snapshotted collateral and debt once the auction closes.

use proptest::prelude::*;

use fmint_liquidation::core::config::EngineConfig;
use fmint_liquidation::core::token::{TokenAmount, TokenId, UsdValue};
use fmint_liquidation::error::Error;
use fmint_liquidation::governance::CallContext;
use fmint_liquidation::ledger::{InMemoryLedger, TokenLedger};
use fmint_liquidation::liquidation::{BidRequest, LiquidationManager, PricingSchedule};
use fmint_liquidation::oracle::{Price, PriceFeed};
use fmint_liquidation::utils::constants::TOKEN_UNIT;
use fmint_liquidation::utils::crypto::Address;
use fmint_liquidation::utils::math::{cumulative_slice, Ratio};

const BONUS: u128 = TOKEN_UNIT / 20;

fn bidder(i: usize) -> Address {
    Address::from_label(&format!("bidder{}", i))
}

/// Liquidatable 9999 wFTM / 3366.33 fUSD position with an auction open at t=0
fn open_auction(bidders: usize) -> (LiquidationManager, InMemoryLedger, u64) {
    let mut manager = LiquidationManager::new(EngineConfig::default()).unwrap();
    let engine = *manager.engine_address();
    let wftm = TokenId::new("wFTM");
    let fusd = TokenId::new("fUSD");
    let borrower = Address::from_label("borrower");

    let mut feed = PriceFeed::new();
    feed.set_price(wftm.clone(), Price::from_wei(TOKEN_UNIT)).unwrap();
    feed.set_price(fusd.clone(), Price::from_wei(TOKEN_UNIT)).unwrap();

    let mut ledger = InMemoryLedger::new(Address::from_label("fmint"));
    ledger.fund(&wftm, &borrower, TokenAmount::from_whole(9999)).unwrap();
    ledger.deposit(&borrower, &wftm, TokenAmount::from_whole(9999)).unwrap();
    ledger
        .mint(&borrower, &fusd, TokenAmount::parse("3366.33").unwrap(), &feed)
        .unwrap();
    feed.set_price(wftm, Price::from_wei(TOKEN_UNIT / 2)).unwrap();

    for i in 0..=bidders {
        let account = bidder(i);
        ledger.fund(&fusd, &account, TokenAmount::from_whole(4000)).unwrap();
        ledger.approve(&fusd, &account, &engine, TokenAmount::from_whole(4000));
        ledger.fund_native(&account, TOKEN_UNIT).unwrap();
    }

    let ctx = CallContext::direct(Address::from_label("keeper"), 0);
    let nonce = manager
        .start_liquidation(&mut ledger, &feed, &ctx, &borrower)
        .unwrap();
    (manager, ledger, nonce)
}

fn bid_sequence() -> impl Strategy<Value = Vec<(u64, u64)>> {
    prop::collection::vec((0u64..90_000, 1u64..=100), 1..8).prop_map(|mut bids| {
        bids.sort_by_key(|(at, _)| *at);
        bids
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_fills_are_monotone_and_within_offer(bids in bid_sequence()) {
        let (mut manager, mut ledger, nonce) = open_auction(bids.len());
        let schedule = PricingSchedule::default();
        let mut last = Ratio::ZERO;

        for (i, (at, pct)) in bids.iter().enumerate() {
            let ctx = CallContext::direct(bidder(i), *at);
            let request = BidRequest::new(nonce, Ratio::from_percent(*pct)).with_incentive(BONUS);
            match manager.bid(&mut ledger, &ctx, request) {
                Ok(plan) => {
                    prop_assert_eq!(plan.from_ratio, last);
                    prop_assert!(plan.to_ratio > last);
                    prop_assert!(plan.to_ratio <= schedule.ratio_at(*at));
                    prop_assert!(plan.to_ratio <= Ratio::from_percent(*pct));
                    last = plan.to_ratio;
                }
                Err(Error::NothingToFill { .. }) | Err(Error::AuctionClosed(_)) => {}
                Err(e) => prop_assert!(false, "unexpected error: {}", e),
            }
            prop_assert_eq!(manager.get_auction(nonce).unwrap().filled_ratio, last);
        }
    }

    #[test]
    fn prop_closing_distributes_exact_snapshot(bids in bid_sequence()) {
        let (mut manager, mut ledger, nonce) = open_auction(bids.len());
        let wftm = TokenId::new("wFTM");
        let closer = bidder(bids.len());

        for (i, (at, pct)) in bids.iter().enumerate() {
            let ctx = CallContext::direct(bidder(i), *at);
            let request = BidRequest::new(nonce, Ratio::from_percent(*pct)).with_incentive(BONUS);
            let _ = manager.bid(&mut ledger, &ctx, request);
        }
        if manager.get_auction(nonce).unwrap().is_active() {
            let ctx = CallContext::direct(closer, 80_000);
            manager
                .bid(&mut ledger, &ctx, BidRequest::new(nonce, Ratio::ONE).with_incentive(BONUS))
                .unwrap();
        }

        let received = (0..=bids.len()).try_fold(TokenAmount::ZERO, |acc, i| {
            acc.checked_add(ledger.balance_of(&wftm, &bidder(i)))
        }).unwrap();
        prop_assert_eq!(received, TokenAmount::from_whole(9999));

        let auction = manager.get_auction(nonce).unwrap();
        prop_assert!(!auction.is_active());
        prop_assert_eq!(auction.debt_paid, auction.total_debt_value);
        prop_assert_eq!(manager.statistics().total_bonus_paid, BONUS);
    }

    #[test]
    fn prop_cumulative_slices_telescope(
        total in 0u128..1_000_000_000_000_000_000_000_000u128,
        cuts in prop::collection::vec(0u64..=100_000_000, 0..10),
    ) {
        let mut cuts = cuts;
        cuts.push(0);
        cuts.push(100_000_000);
        cuts.sort_unstable();

        let sum = cuts.windows(2).try_fold(0u128, |acc, w| {
            cumulative_slice(total, Ratio::from_raw(w[0]), Ratio::from_raw(w[1])).map(|s| acc + s)
        }).unwrap();
        prop_assert_eq!(sum, total);
    }

    #[test]
    fn prop_debt_value_slices_never_exceed_total(pct_a in 0u64..=100, pct_b in 0u64..=100) {
        let total = UsdValue::parse("3366.33").unwrap().raw();
        let (lo, hi) = (pct_a.min(pct_b), pct_a.max(pct_b));
        let slice = cumulative_slice(total, Ratio::from_percent(lo), Ratio::from_percent(hi)).unwrap();
        prop_assert!(slice <= total);
    }
}
