//! Engine configuration and auction parameters.
//!
//! Parameters are divided into:
//! - Auction parameters: schedule shape, bonus and eligibility threshold,
//!   adjustable by admins at runtime
//! - Engine wiring: owner, engine address, stable token, fee vault and the
//!   initial admin set, read once at construction

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::token::TokenId;
use crate::error::{Error, Result};
use crate::utils::constants::*;
use crate::utils::crypto::Address;
use crate::utils::math::Ratio;

// ═══════════════════════════════════════════════════════════════════════════════
// AUCTION PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Protocol-wide auction parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuctionParams {
    /// Offering ratio available the moment an auction starts
    pub min_offering_ratio: Ratio,

    /// Offering ratio once the schedule saturates
    pub max_offering_ratio: Ratio,

    /// Seconds for the offering ratio to climb from min to max
    pub auction_duration_secs: u64,

    /// Native-asset bonus the first bidder pays to the initiator
    pub initiator_bonus: u128,

    /// Minimum collateralization ratio (collateral value / debt value)
    /// Below this a position with debt can be liquidated
    pub min_collateral_ratio: Ratio,

    /// When set, only admins may start liquidations
    pub restrict_start_to_admins: bool,
}

impl Default for AuctionParams {
    fn default() -> Self {
        Self {
            min_offering_ratio: Ratio::from_raw(DEFAULT_MIN_OFFERING_RATIO),
            max_offering_ratio: Ratio::from_raw(DEFAULT_MAX_OFFERING_RATIO),
            auction_duration_secs: DEFAULT_AUCTION_DURATION_SECS,
            initiator_bonus: DEFAULT_INITIATOR_BONUS,
            min_collateral_ratio: Ratio::from_raw(DEFAULT_MIN_COLLATERAL_RATIO),
            restrict_start_to_admins: false,
        }
    }
}

impl AuctionParams {
    /// Override the schedule (for testing and admin updates)
    pub fn with_schedule(mut self, min_ratio: Ratio, duration_secs: u64) -> Self {
        self.min_offering_ratio = min_ratio;
        self.auction_duration_secs = duration_secs;
        self
    }

    /// Override the initiator bonus
    pub fn with_initiator_bonus(mut self, bonus: u128) -> Self {
        self.initiator_bonus = bonus;
        self
    }

    /// Validate parameters are consistent
    pub fn validate(&self) -> Result<()> {
        if self.min_offering_ratio > self.max_offering_ratio {
            return Err(Error::InvalidParameter {
                name: "min_offering_ratio".into(),
                reason: format!(
                    "{} exceeds max offering ratio {}",
                    self.min_offering_ratio, self.max_offering_ratio
                ),
            });
        }
        if self.max_offering_ratio > Ratio::ONE {
            return Err(Error::InvalidParameter {
                name: "max_offering_ratio".into(),
                reason: format!("{} exceeds 100%", self.max_offering_ratio),
            });
        }
        if self.max_offering_ratio.is_zero() {
            return Err(Error::InvalidParameter {
                name: "max_offering_ratio".into(),
                reason: "cannot be zero".into(),
            });
        }
        if self.auction_duration_secs == 0 {
            return Err(Error::InvalidParameter {
                name: "auction_duration_secs".into(),
                reason: "cannot be zero".into(),
            });
        }
        if self.min_collateral_ratio.is_zero() {
            return Err(Error::InvalidParameter {
                name: "min_collateral_ratio".into(),
                reason: "cannot be zero".into(),
            });
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Full engine configuration (JSON on disk)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Auction parameters
    pub params: AuctionParams,

    /// Privileged owner (manages the admin set)
    pub owner: Address,

    /// Account the engine acts as (allowance spender, stable token sink)
    pub engine_address: Address,

    /// Pegged stable token that settles debt
    pub stable_token: TokenId,

    /// Fee vault wired by admins
    pub fee_vault: Address,

    /// Initial admin set
    pub admins: Vec<Address>,

    /// Maximum events kept in memory
    pub max_events: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            params: AuctionParams::default(),
            owner: Address::from_label("owner"),
            engine_address: Address::from_label("liquidation-manager"),
            stable_token: TokenId::new(STABLE_TOKEN_SYMBOL),
            fee_vault: Address::ZERO,
            admins: Vec::new(),
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

impl EngineConfig {
    /// Create configuration with the given owner
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            ..Default::default()
        }
    }

    /// Replace the auction parameters
    pub fn with_params(mut self, params: AuctionParams) -> Self {
        self.params = params;
        self
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Config(e.to_string()))?;
        }

        std::fs::write(path, content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load defaults, then apply `FMINT_*` environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `FMINT_*` environment overrides on top of this configuration
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(owner) = env_var("OWNER") {
            self.owner = owner.parse()?;
        }
        if let Some(vault) = env_var("FEE_VAULT") {
            self.fee_vault = vault.parse()?;
        }
        if let Some(token) = env_var("STABLE_TOKEN") {
            self.stable_token = TokenId::new(token);
        }
        if let Some(bonus) = env_var("INITIATOR_BONUS") {
            self.params.initiator_bonus = parse_env("INITIATOR_BONUS", &bonus)?;
        }
        if let Some(duration) = env_var("AUCTION_DURATION_SECS") {
            self.params.auction_duration_secs = parse_env("AUCTION_DURATION_SECS", &duration)?;
        }
        if let Some(ratio) = env_var("MIN_OFFERING_RATIO") {
            self.params.min_offering_ratio =
                Ratio::from_raw(parse_env("MIN_OFFERING_RATIO", &ratio)?);
        }
        if let Some(ratio) = env_var("MIN_COLLATERAL_RATIO") {
            self.params.min_collateral_ratio =
                Ratio::from_raw(parse_env("MIN_COLLATERAL_RATIO", &ratio)?);
        }
        if let Some(flag) = env_var("RESTRICT_START_TO_ADMINS") {
            self.params.restrict_start_to_admins = parse_env("RESTRICT_START_TO_ADMINS", &flag)?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;

        if self.owner.is_zero() {
            return Err(Error::Config("owner cannot be the zero address".into()));
        }
        if self.engine_address.is_zero() {
            return Err(Error::Config("engine address cannot be the zero address".into()));
        }
        if self.stable_token.symbol().is_empty() {
            return Err(Error::Config("stable token must be set".into()));
        }
        if self.max_events == 0 {
            return Err(Error::Config("max_events must be greater than 0".into()));
        }
        Ok(())
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, key)).ok()
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| Error::Config(format!("{}{}: {}", ENV_PREFIX, key, e)))
}
