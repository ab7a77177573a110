//! Core types for the liquidation engine.
//!
//! This module contains the fundamental building blocks:
//! - Engine configuration and auction parameters
//! - Token identifiers, amounts and USD values

pub mod config;
pub mod token;

pub use config::*;
pub use token::*;
