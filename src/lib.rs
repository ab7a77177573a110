//! # fMint Liquidation
//!
//! Liquidation engine for fMint collateralized debt positions, built on a
//! time-decaying, partial-fill Dutch auction.
//!
//! ## Architecture
//!
//! - **Core**: Auction parameters, engine configuration, token amounts
//! - **Ledger**: Token, native-asset and position ledger interfaces with an
//!   in-memory implementation
//! - **Oracle**: USD price source consumed for eligibility checks
//! - **Liquidation**: Eligibility, offering schedule, auction registry,
//!   fill settlement and the `LiquidationManager` that ties them together
//! - **Governance**: Owner/admin roles, pause switch, caller checks
//! - **Events**: Bounded event log for indexers
//!
//! ## Auction model
//!
//! When a position's collateral ratio falls below the minimum, anyone may
//! start an auction that snapshots its collateral and debt. The offered
//! share of the collateral grows linearly from the minimum to the maximum
//! offering ratio over the auction duration. Bidders fill the auction
//! cumulatively: each bid buys the slice between the current filled ratio
//! and its target, paying the same share of the snapshotted debt value in
//! the stable token.
//!
//! ## Example
//!
//! ```rust,ignore
//! use fmint_liquidation::prelude::*;
//!
//! let mut manager = LiquidationManager::new(EngineConfig::default())?;
//! let nonce = manager.start_liquidation(&mut ledger, &feed, &ctx, &borrower)?;
//! let plan = manager.bid(&mut ledger, &bidder_ctx, BidRequest::new(nonce, Ratio::from_percent(25)))?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod cli;
pub mod core;
pub mod error;
pub mod events;
pub mod governance;
pub mod ledger;
pub mod liquidation;
pub mod oracle;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        config::{AuctionParams, EngineConfig},
        token::{Holdings, TokenAmount, TokenId, UsdValue},
    };
    pub use crate::error::{Error, Result};
    pub use crate::events::{AuctionEvent, EventLog};
    pub use crate::governance::{AccessGuard, CallContext};
    pub use crate::ledger::{InMemoryLedger, Ledger, NativeLedger, PositionLedger, TokenLedger};
    pub use crate::liquidation::{
        Auction, AuctionState, BidRequest, FillPlan, LiquidationDetails, LiquidationManager,
        PricingSchedule,
    };
    pub use crate::oracle::{Price, PriceFeed, PriceSource};
    pub use crate::utils::{
        crypto::{Address, Hash},
        math::Ratio,
    };
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol name
pub const PROTOCOL_NAME: &str = "fMint";
