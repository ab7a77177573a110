//! Offering-ratio schedule.
//!
//! ```text
//! ratio(t) = min + (max - min) * min(t, duration) / duration
//! ```
//!
//! Pure function of elapsed time, re-evaluated on every bid and never stored.

use serde::{Deserialize, Serialize};

use crate::core::config::AuctionParams;
use crate::error::{Error, Result};
use crate::utils::math::{mul_div, Ratio};

/// Linear schedule from `min_ratio` to `max_ratio` over `duration_secs`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSchedule {
    /// Ratio offered at t = 0
    pub min_ratio: Ratio,
    /// Ratio offered from t = duration onward
    pub max_ratio: Ratio,
    /// Seconds from min to max
    pub duration_secs: u64,
}

impl PricingSchedule {
    /// Create a schedule, validating its bounds
    pub fn new(min_ratio: Ratio, max_ratio: Ratio, duration_secs: u64) -> Result<Self> {
        if min_ratio > max_ratio {
            return Err(Error::InvalidParameter {
                name: "min_ratio".into(),
                reason: format!("{} exceeds max ratio {}", min_ratio, max_ratio),
            });
        }
        if max_ratio > Ratio::ONE {
            return Err(Error::InvalidParameter {
                name: "max_ratio".into(),
                reason: format!("{} exceeds 100%", max_ratio),
            });
        }
        if duration_secs == 0 {
            return Err(Error::InvalidParameter {
                name: "duration_secs".into(),
                reason: "cannot be zero".into(),
            });
        }
        Ok(Self {
            min_ratio,
            max_ratio,
            duration_secs,
        })
    }

    /// Schedule described by the auction parameters
    pub fn from_params(params: &AuctionParams) -> Result<Self> {
        Self::new(
            params.min_offering_ratio,
            params.max_offering_ratio,
            params.auction_duration_secs,
        )
    }

    /// Offering ratio after `elapsed_secs`
    pub fn ratio_at(&self, elapsed_secs: u64) -> Ratio {
        let t = elapsed_secs.min(self.duration_secs);
        let span = self.max_ratio.saturating_sub(self.min_ratio).raw();

        // span <= 1e8 and t <= duration, so the quotient never exceeds span
        let climbed = mul_div(span as u128, t as u128, self.duration_secs as u128)
            .map(|v| v as u64)
            .unwrap_or(span);

        Ratio::from_raw(self.min_ratio.raw() + climbed)
    }

    /// Offering ratio at `now` for an auction that started at `start_time`
    pub fn current_ratio(&self, start_time: u64, now: u64) -> Ratio {
        self.ratio_at(now.saturating_sub(start_time))
    }

    /// Time at which the schedule saturates for an auction started at `start_time`
    pub fn end_time(&self, start_time: u64) -> u64 {
        start_time.saturating_add(self.duration_secs)
    }

    /// Sample the curve at `steps + 1` evenly spaced points
    pub fn curve(&self, steps: u64) -> Vec<(u64, Ratio)> {
        let steps = steps.max(1);
        (0..=steps)
            .map(|i| {
                let t = mul_div(self.duration_secs as u128, i as u128, steps as u128)
                    .map(|v| v as u64)
                    .unwrap_or(self.duration_secs);
                (t, self.ratio_at(t))
            })
            .collect()
    }
}

impl Default for PricingSchedule {
    fn default() -> Self {
        let params = AuctionParams::default();
        Self {
            min_ratio: params.min_offering_ratio,
            max_ratio: params.max_offering_ratio,
            duration_secs: params.auction_duration_secs,
        }
    }
}
