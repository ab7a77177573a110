//! Utility modules for the liquidation engine.
//!
//! This module contains shared utilities used across the crate:
//! - Account addresses and hashing
//! - Fixed-point arithmetic
//! - Constants

pub mod constants;
pub mod crypto;
pub mod math;

pub use constants::*;
pub use crypto::*;
pub use math::*;
