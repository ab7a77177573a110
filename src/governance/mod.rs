//! Access control for the liquidation engine.
//!
//! - Owner role: manages the admin set and can hand itself over
//! - Admins: adjust auction parameters, wiring and the live switch
//! - Caller check: liquidation triggers and bids must come straight from the
//!   transaction originator, never through a relaying contract

pub mod access;

pub use access::*;
