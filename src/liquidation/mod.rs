//! Liquidation module.
//!
//! Positions below the minimum collateral ratio are sold off through a
//! time-decaying, partial-fill Dutch auction:
//! - Eligibility evaluation against live ledger and oracle state
//! - Offering-ratio schedule (pure function of elapsed time)
//! - Auction registry (nonce-keyed arena, one active auction per owner)
//! - Bid settlement (validated plan, then atomic application)
//! - Liquidation manager tying it together

pub mod auction;
pub mod eligibility;
pub mod engine;
pub mod schedule;
pub mod settlement;

pub use auction::*;
pub use eligibility::*;
pub use engine::*;
pub use schedule::*;
pub use settlement::*;
