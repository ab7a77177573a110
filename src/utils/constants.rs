//! Protocol constants and magic numbers.
//!
//! All protocol-wide constants are defined here for easy auditing and modification.

// ═══════════════════════════════════════════════════════════════════════════════
// FIXED-POINT SCALES
// ═══════════════════════════════════════════════════════════════════════════════

/// Ratio precision (1e8 = 100%)
pub const RATIO_PRECISION: u64 = 100_000_000;

/// Native token precision (18 decimals)
pub const TOKEN_DECIMALS: u32 = 18;

/// One whole token in native units (1e18)
pub const TOKEN_UNIT: u128 = 1_000_000_000_000_000_000;

/// USD values carry the same 18 decimals as token amounts
pub const USD_UNIT: u128 = TOKEN_UNIT;

// ═══════════════════════════════════════════════════════════════════════════════
// PRICING SCHEDULE DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Offering ratio at auction start - 20%
pub const DEFAULT_MIN_OFFERING_RATIO: u64 = 20_000_000;

/// Offering ratio once the schedule saturates - 100%
pub const DEFAULT_MAX_OFFERING_RATIO: u64 = RATIO_PRECISION;

/// Time for the offering ratio to climb from min to max (about 22.2 hours)
pub const DEFAULT_AUCTION_DURATION_SECS: u64 = 80_000;

// ═══════════════════════════════════════════════════════════════════════════════
// LIQUIDATION DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Minimum collateralization ratio - 150%
/// Below this ratio a position with debt can be liquidated
pub const DEFAULT_MIN_COLLATERAL_RATIO: u64 = 150_000_000;

/// Initiator bonus - 0.05 native units
pub const DEFAULT_INITIATOR_BONUS: u128 = TOKEN_UNIT / 20;

/// Collateralization ratio the ledger requires for minting - 250%
pub const DEFAULT_MINT_COLLATERAL_RATIO: u64 = 250_000_000;

/// Maximum events kept in memory by the event log
pub const DEFAULT_MAX_EVENTS: usize = 1000;

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTIFIERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Length of an account address in bytes
pub const ADDRESS_LENGTH: usize = 20;

/// Length of a hash in bytes (SHA256)
pub const HASH_LENGTH: usize = 32;

/// Symbol of the pegged stable token
pub const STABLE_TOKEN_SYMBOL: &str = "fUSD";

/// Label of the native asset in balance errors
pub const NATIVE_ASSET_SYMBOL: &str = "native";

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "FMINT_";
