//! fMint liquidation command line support.
//!
//! Configuration loading, scenario replay and output rendering used by the
//! `fmint-liquidation` binary.

pub mod output;
pub mod scenario;

pub use output::*;
pub use scenario::*;

use std::path::Path;

use crate::core::config::EngineConfig;
use crate::error::Result;

/// Resolve the engine configuration for a CLI run.
///
/// Starts from `path` when given (defaults otherwise), applies `FMINT_*`
/// environment overrides and validates the result.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    config.apply_env()?;
    config.validate()?;

    tracing::debug!(
        owner = %config.owner.short(),
        stable_token = %config.stable_token,
        from_file = path.is_some(),
        "configuration loaded"
    );
    Ok(config)
}
