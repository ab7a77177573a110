//! Oracle module.
//!
//! The engine consumes prices through the `PriceSource` trait; `PriceFeed`
//! is the in-memory source used by the CLI and tests.

pub mod price_feed;

pub use price_feed::*;
