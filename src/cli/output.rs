//! CLI Output Formatting.
//!
//! Renders parameters, price curves and scenario reports as styled text or
//! JSON. Renderers return lines so the binary decides where they go.

use chrono::DateTime;
use console::style;
use serde::Serialize;

use crate::cli::scenario::{ScenarioReport, StepOutcome};
use crate::core::config::EngineConfig;
use crate::core::token::TokenAmount;
use crate::error::{Error, Result};
use crate::events::AuctionEvent;
use crate::liquidation::PricingSchedule;

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
    /// Pretty JSON format
    JsonPretty,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// Serialize any value in one of the JSON formats
pub fn to_json<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value),
        _ => serde_json::to_string(value),
    };
    rendered.map_err(|e| Error::Serialization(e.to_string()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEXT RENDERERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Format a unix timestamp as UTC
pub fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

/// Format a duration in seconds as `1d 2h 3m 4s`
pub fn format_duration(secs: u64) -> String {
    let (days, rest) = (secs / 86_400, secs % 86_400);
    let (hours, rest) = (rest / 3_600, rest % 3_600);
    let (minutes, seconds) = (rest / 60, rest % 60);

    let parts: Vec<String> = [(days, "d"), (hours, "h"), (minutes, "m"), (seconds, "s")]
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| format!("{}{}", n, unit))
        .collect();

    if parts.is_empty() {
        "0s".into()
    } else {
        parts.join(" ")
    }
}

/// Engine parameters as key/value lines
pub fn render_params(config: &EngineConfig) -> Vec<String> {
    let params = &config.params;
    let admins: Vec<String> = config.admins.iter().map(|a| a.short()).collect();

    vec![
        format!("{}", style("Liquidation parameters").bold().underlined()),
        format!("  min offering ratio:   {}", params.min_offering_ratio),
        format!("  max offering ratio:   {}", params.max_offering_ratio),
        format!(
            "  auction duration:     {} ({})",
            params.auction_duration_secs,
            format_duration(params.auction_duration_secs)
        ),
        format!("  min collateral ratio: {}", params.min_collateral_ratio),
        format!(
            "  initiator bonus:      {}",
            TokenAmount::from_raw(params.initiator_bonus)
        ),
        format!("  admin-only start:     {}", params.restrict_start_to_admins),
        format!("{}", style("Accounts").bold().underlined()),
        format!("  owner:        {}", config.owner),
        format!("  engine:       {}", config.engine_address),
        format!("  stable token: {}", config.stable_token),
        format!("  fee vault:    {}", config.fee_vault),
        format!(
            "  admins:       {}",
            if admins.is_empty() { "-".to_string() } else { admins.join(", ") }
        ),
    ]
}

/// Offering ratio over the auction lifetime, one line per sample
pub fn render_schedule(schedule: &PricingSchedule, steps: u64, start_time: u64) -> Vec<String> {
    let mut lines = vec![format!(
        "{}  {} -> {} over {}",
        style("Offering curve").bold(),
        schedule.min_ratio,
        schedule.max_ratio,
        format_duration(schedule.duration_secs)
    )];

    for (elapsed, ratio) in schedule.curve(steps) {
        let when = if start_time > 0 {
            format_timestamp(start_time.saturating_add(elapsed))
        } else {
            format!("+{}s", elapsed)
        };
        lines.push(format!("  {:>24}  {}", when, style(ratio).cyan()));
    }
    lines
}

/// Human description of an engine event
pub fn describe_event(event: &AuctionEvent) -> String {
    match event {
        AuctionEvent::AuctionStarted {
            nonce,
            owner,
            total_collateral_value,
            total_debt_value,
            ..
        } => format!(
            "auction #{} started for {} (collateral {}, debt {})",
            nonce,
            owner.short(),
            total_collateral_value,
            total_debt_value
        ),
        AuctionEvent::BidFilled {
            nonce,
            bidder,
            delta_ratio,
            filled_ratio,
            stable_burned,
            ..
        } => format!(
            "auction #{} filled +{} to {} by {}, {} burned",
            nonce,
            delta_ratio,
            filled_ratio,
            bidder.short(),
            stable_burned
        ),
        AuctionEvent::InitiatorPaid {
            nonce, initiator, amount, ..
        } => format!(
            "auction #{} paid initiator {} bonus {}",
            nonce,
            initiator.short(),
            TokenAmount::from_raw(*amount)
        ),
        AuctionEvent::AuctionClosed { nonce, refunded, .. } => {
            if refunded.is_empty() {
                format!("auction #{} closed", nonce)
            } else {
                let refunds: Vec<String> = refunded
                    .iter()
                    .map(|(token, amount)| format!("{} {}", amount, token))
                    .collect();
                format!("auction #{} closed, refunded {}", nonce, refunds.join(", "))
            }
        }
        AuctionEvent::ConfigChanged {
            parameter,
            old_value,
            new_value,
            ..
        } => format!("{} changed: {} -> {}", parameter, old_value, new_value),
        AuctionEvent::AdminAdded { account, .. } => format!("admin {} added", account.short()),
        AuctionEvent::AdminRemoved { account, .. } => format!("admin {} removed", account.short()),
        AuctionEvent::OwnershipTransferred {
            previous, new_owner, ..
        } => format!("ownership {} -> {}", previous.short(), new_owner.short()),
        AuctionEvent::Paused { by, .. } => format!("paused by {}", by.short()),
        AuctionEvent::Unpaused { by, .. } => format!("unpaused by {}", by.short()),
    }
}

/// Step results, emitted events and a summary line
pub fn render_report(report: &ScenarioReport, show_events: bool) -> Vec<String> {
    let mut lines = Vec::new();
    if !report.name.is_empty() {
        lines.push(format!("{}", style(&report.name).bold().underlined()));
    }

    for step in &report.steps {
        let (marker, detail) = match &step.outcome {
            StepOutcome::Ok(detail) => (style("✓").green(), detail.clone()),
            StepOutcome::ExpectedFailure(reason) => {
                (style("✓").green(), format!("rejected as expected: {}", reason))
            }
            StepOutcome::UnexpectedFailure(reason) => (style("✗").red(), reason.clone()),
            StepOutcome::UnexpectedSuccess(code) => {
                (style("✗").red(), format!("expected error {} but succeeded", code))
            }
        };
        lines.push(format!(
            "{} {:>3} [t={}] {}: {}",
            marker,
            step.index,
            step.timestamp,
            style(&step.action).cyan(),
            detail
        ));
    }

    if show_events {
        lines.push(format!("{}", style("Events").bold().underlined()));
        for record in &report.events {
            lines.push(format!("  {:>4}  {}", record.sequence, describe_event(&record.event)));
        }
    }

    let failures = report.failures();
    let summary = format!("{} steps, {} unexpected", report.steps.len(), failures);
    lines.push(if failures == 0 {
        format!("{}", style(summary).green().bold())
    } else {
        format!("{}", style(summary).red().bold())
    });
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::crypto::Address;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(80_000), "22h 13m 20s");
        assert_eq!(format_duration(86_401), "1d 1s");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_timestamp(u64::MAX), u64::MAX.to_string());
    }

    #[test]
    fn test_render_schedule_samples() {
        let schedule = PricingSchedule::default();
        let lines = render_schedule(&schedule, 4, 0);
        assert_eq!(lines.len(), 6);
        assert!(lines[1].contains("+0s"));
    }

    #[test]
    fn test_describe_event() {
        let text = describe_event(&AuctionEvent::Paused {
            by: Address::from_label("admin"),
            timestamp: 0,
        });
        assert!(text.starts_with("paused by"));
    }

    #[test]
    fn test_render_params_mentions_accounts() {
        let lines = render_params(&EngineConfig::default());
        assert!(lines.iter().any(|l| l.contains("fee vault")));
    }
}
