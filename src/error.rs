//! Error types for the fMint liquidation engine.
//!
//! Every rejection is a local, synchronous failure of the whole call: the
//! engine never applies part of an operation and never retries internally.

use thiserror::Error;

/// Result type alias for liquidation engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the liquidation engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Auction Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Position is healthy, liquidation refused
    #[error("Collateral of {0} is not eligible for liquidation")]
    NotEligible(String),

    /// An auction is already running for this owner
    #[error("Auction {nonce} is already active for {owner}")]
    AuctionAlreadyActive {
        /// Owner of the position
        owner: String,
        /// Nonce of the running auction
        nonce: u64,
    },

    /// No auction with this nonce
    #[error("Auction {0} not found")]
    AuctionNotFound(u64),

    /// Auction has already been fully settled
    #[error("Auction {0} is closed")]
    AuctionClosed(u64),

    // ═══════════════════════════════════════════════════════════════════
    // Bid Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Effective bid ratio does not exceed what is already filled
    #[error("Nothing to fill: target ratio {target} does not exceed filled ratio {filled}")]
    NothingToFill {
        /// min(requested, current offering ratio), 1e8 precision
        target: u64,
        /// Ratio already sold, 1e8 precision
        filled: u64,
    },

    /// Bidder approved less stable token than the fill costs
    #[error("Insufficient allowance: required {required}, approved {approved}")]
    InsufficientAllowance {
        /// Stable token owed for the fill
        required: u128,
        /// Allowance granted to the engine
        approved: u128,
    },

    /// First bid did not attach the exact initiator bonus
    #[error("Incentive mismatch: expected {expected}, attached {attached}")]
    IncentiveMismatch {
        /// Required initiator bonus
        expected: u128,
        /// Value attached to the bid
        attached: u128,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Oracle Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Price source has no price for the token
    #[error("No price available for token {0}")]
    PriceUnavailable(String),

    // ═══════════════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// A contract (origin != caller) attempted a liquidation-triggering call
    #[error("Smart contract callers are not allowed: origin {origin}, caller {caller}")]
    ContractCallerRejected {
        /// Transaction origin
        origin: String,
        /// Immediate caller
        caller: String,
    },

    /// Not authorized to perform this action
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    // ═══════════════════════════════════════════════════════════════════
    // Validation Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Invalid input parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Amount is zero
    #[error("Amount cannot be zero")]
    ZeroAmount,

    /// Account holds less of a token than required
    #[error("Insufficient {token} balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Token symbol (or "native")
        token: String,
        /// Required amount
        required: u128,
        /// Available amount
        available: u128,
    },

    /// Position escrow holds less collateral than required
    #[error("Insufficient {token} collateral: required {required}, available {available}")]
    InsufficientCollateral {
        /// Collateral token
        token: String,
        /// Required amount
        required: u128,
        /// Available amount
        available: u128,
    },

    /// Collateralization ratio below the required minimum
    #[error("Collateralization ratio {current} below minimum {minimum}")]
    CollateralizationRatioTooLow {
        /// Current ratio, 1e8 precision
        current: u64,
        /// Minimum ratio, 1e8 precision
        minimum: u64,
    },

    /// Position is under liquidation and cannot be changed
    #[error("Position {0} is locked by an active auction")]
    PositionLocked(String),

    /// Overflow in calculation
    #[error("Arithmetic overflow in {operation}")]
    Overflow {
        /// Operation that overflowed
        operation: String,
    },

    /// Underflow in calculation
    #[error("Arithmetic underflow in {operation}")]
    Underflow {
        /// Operation that underflowed
        operation: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Protocol Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Engine is not live
    #[error("Liquidation engine is paused")]
    ProtocolPaused,

    /// Pause or unpause requested while already in that state
    #[error("Pause state unchanged: engine is already {}", pause_state(.paused))]
    PauseStateUnchanged {
        /// Current pause state
        paused: bool,
    },

    /// Invariant violation detected
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    // ═══════════════════════════════════════════════════════════════════
    // Serialization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ═══════════════════════════════════════════════════════════════════
    // Internal Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Operation not valid in the current engine state
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if the caller can resend with corrected parameters
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NothingToFill { .. }
                | Error::InsufficientAllowance { .. }
                | Error::IncentiveMismatch { .. }
                | Error::InsufficientBalance { .. }
                | Error::PriceUnavailable(_)
        )
    }

    /// Returns true if this is a critical error requiring immediate attention
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Error::InvariantViolation(_) | Error::Overflow { .. } | Error::Underflow { .. }
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Auction errors: 1xxx
            Error::NotEligible(_) => 1001,
            Error::AuctionAlreadyActive { .. } => 1002,
            Error::AuctionNotFound(_) => 1003,
            Error::AuctionClosed(_) => 1004,

            // Bid errors: 2xxx
            Error::NothingToFill { .. } => 2001,
            Error::InsufficientAllowance { .. } => 2002,
            Error::IncentiveMismatch { .. } => 2003,

            // Oracle errors: 3xxx
            Error::PriceUnavailable(_) => 3001,

            // Authorization errors: 4xxx
            Error::ContractCallerRejected { .. } => 4001,
            Error::Unauthorized(_) => 4002,

            // Validation errors: 5xxx
            Error::InvalidParameter { .. } => 5001,
            Error::ZeroAmount => 5002,
            Error::InsufficientBalance { .. } => 5003,
            Error::InsufficientCollateral { .. } => 5004,
            Error::CollateralizationRatioTooLow { .. } => 5005,
            Error::PositionLocked(_) => 5006,
            Error::Overflow { .. } => 5007,
            Error::Underflow { .. } => 5008,

            // Protocol errors: 6xxx
            Error::ProtocolPaused => 6001,
            Error::InvariantViolation(_) => 6002,
            Error::Config(_) => 6003,
            Error::PauseStateUnchanged { .. } => 6004,

            // Serialization errors: 7xxx
            Error::Serialization(_) => 7001,
            Error::Deserialization(_) => 7002,

            // Internal errors: 9xxx
            Error::Internal(_) => 9001,
        }
    }
}

fn pause_state(paused: &bool) -> &'static str {
    if *paused {
        "paused"
    } else {
        "live"
    }
}
