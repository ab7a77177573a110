//! Scenario files for the simulator.
//!
//! A scenario seeds prices and balances, then replays a list of timed steps
//! (deposits, mints, price moves, liquidation starts, bids) through the
//! in-memory ledger and the liquidation manager. Steps may declare the error
//! code they are expected to fail with.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use crate::core::config::EngineConfig;
use crate::core::token::{TokenAmount, TokenId, UsdValue};
use crate::error::{Error, Result};
use crate::events::EventRecord;
use crate::governance::CallContext;
use crate::ledger::InMemoryLedger;
use crate::liquidation::{BidRequest, LiquidationManager};
use crate::oracle::{Price, PriceFeed};
use crate::utils::crypto::Address;
use crate::utils::math::Ratio;

// ═══════════════════════════════════════════════════════════════════════════════
// SCENARIO FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Wallet balance seeded before the first step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    /// Account label or `0x` address
    pub account: String,
    /// Token symbol
    pub token: String,
    /// Decimal amount
    pub amount: String,
}

/// Native balance seeded before the first step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeAllocation {
    /// Account label or `0x` address
    pub account: String,
    /// Decimal amount
    pub amount: String,
}

/// One scenario action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Move wallet tokens into a position
    Deposit {
        account: String,
        token: String,
        amount: String,
    },
    /// Return collateral to the wallet
    Withdraw {
        account: String,
        token: String,
        amount: String,
    },
    /// Mint debt against a position
    Mint {
        account: String,
        token: String,
        amount: String,
    },
    /// Repay debt
    Repay {
        account: String,
        token: String,
        amount: String,
    },
    /// Approve the engine to pull tokens
    Approve {
        account: String,
        token: String,
        amount: String,
    },
    /// Move a USD price
    SetPrice { token: String, price: String },
    /// Let time pass
    Advance { seconds: u64 },
    /// Trigger a liquidation
    Start {
        caller: String,
        account: String,
        #[serde(default)]
        via: Option<String>,
    },
    /// Bid on an auction
    Bid {
        bidder: String,
        nonce: u64,
        /// Requested cumulative ratio, in percent
        ratio: String,
        #[serde(default)]
        incentive: Option<String>,
        #[serde(default)]
        via: Option<String>,
    },
    /// Suspend starts and bids
    Pause { caller: String },
    /// Resume starts and bids
    Unpause { caller: String },
    /// Grant the admin role
    AddAdmin { caller: String, account: String },
    /// Toggle admin-only liquidation starts
    RestrictStart { caller: String, restricted: bool },
}

/// Action plus the error code it is expected to fail with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// What to do
    #[serde(flatten)]
    pub action: Action,
    /// Expected `Error::code()`, if the step should fail
    #[serde(default)]
    pub expect_error: Option<u32>,
}

/// A complete scenario file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Human-readable name
    #[serde(default)]
    pub name: String,
    /// Clock at the first step (unix seconds)
    #[serde(default)]
    pub start_time: u64,
    /// Initial USD prices per token
    #[serde(default)]
    pub prices: BTreeMap<String, String>,
    /// Initial wallet balances
    #[serde(default)]
    pub balances: Vec<Allocation>,
    /// Initial native balances
    #[serde(default)]
    pub native: Vec<NativeAllocation>,
    /// Steps in order
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    /// Parse from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// How a step ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// Succeeded as expected
    Ok(String),
    /// Failed with the expected code
    ExpectedFailure(String),
    /// Failed although success (or another code) was expected
    UnexpectedFailure(String),
    /// Succeeded although a failure was expected
    UnexpectedSuccess(u32),
}

impl StepOutcome {
    /// Check whether the step matched its expectation
    pub fn is_expected(&self) -> bool {
        matches!(self, StepOutcome::Ok(_) | StepOutcome::ExpectedFailure(_))
    }
}

/// Result of one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    /// Step index (1-based)
    pub index: usize,
    /// Clock when the step ran
    pub timestamp: u64,
    /// Short description of the action
    pub action: String,
    /// Outcome
    pub outcome: StepOutcome,
}

/// Result of a whole scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// Per-step results
    pub steps: Vec<StepReport>,
    /// Events emitted by the engine
    pub events: Vec<EventRecord>,
}

impl ScenarioReport {
    /// Number of steps that did not match their expectation
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| !s.outcome.is_expected()).count()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RUNNER
// ═══════════════════════════════════════════════════════════════════════════════

/// Replays scenarios against an in-memory world
pub struct ScenarioRunner {
    manager: LiquidationManager,
    ledger: InMemoryLedger,
    feed: PriceFeed,
    now: u64,
}

impl ScenarioRunner {
    /// Build the world described by `scenario` under `config`
    pub fn new(config: EngineConfig, scenario: &Scenario) -> Result<Self> {
        let manager = LiquidationManager::new(config)?;
        let mut ledger = InMemoryLedger::new(Address::from_label("fmint"));
        let mut feed = PriceFeed::new();

        for (token, price) in &scenario.prices {
            feed.set_price(TokenId::new(token.as_str()), parse_price(price, scenario.start_time)?)?;
        }
        for allocation in &scenario.balances {
            ledger.fund(
                &TokenId::new(allocation.token.as_str()),
                &resolve_account(&allocation.account)?,
                TokenAmount::parse(&allocation.amount)?,
            )?;
        }
        for allocation in &scenario.native {
            ledger.fund_native(
                &resolve_account(&allocation.account)?,
                TokenAmount::parse(&allocation.amount)?.raw(),
            )?;
        }

        Ok(Self {
            manager,
            ledger,
            feed,
            now: scenario.start_time,
        })
    }

    /// Run every step and collect the report
    pub fn run(&mut self, scenario: &Scenario) -> ScenarioReport {
        let mut steps = Vec::with_capacity(scenario.steps.len());

        for (i, step) in scenario.steps.iter().enumerate() {
            let action = describe(&step.action);
            let outcome = match (self.execute(&step.action), step.expect_error) {
                (Ok(detail), None) => StepOutcome::Ok(detail),
                (Ok(_), Some(code)) => StepOutcome::UnexpectedSuccess(code),
                (Err(e), Some(code)) if e.code() == code => StepOutcome::ExpectedFailure(e.to_string()),
                (Err(e), _) => StepOutcome::UnexpectedFailure(format!("[{}] {}", e.code(), e)),
            };

            if !outcome.is_expected() {
                tracing::warn!(step = i + 1, action = %action, "scenario step did not match expectation");
            }

            steps.push(StepReport {
                index: i + 1,
                timestamp: self.now,
                action,
                outcome,
            });
        }

        ScenarioReport {
            name: scenario.name.clone(),
            steps,
            events: self.manager.events().records().to_vec(),
        }
    }

    /// Liquidation manager
    pub fn manager(&self) -> &LiquidationManager {
        &self.manager
    }

    /// Ledger
    pub fn ledger(&self) -> &InMemoryLedger {
        &self.ledger
    }

    /// Current clock
    pub fn now(&self) -> u64 {
        self.now
    }

    fn execute(&mut self, action: &Action) -> Result<String> {
        match action {
            Action::Deposit { account, token, amount } => {
                let amount = TokenAmount::parse(amount)?;
                self.ledger
                    .deposit(&resolve_account(account)?, &TokenId::new(token.as_str()), amount)?;
                Ok(format!("{} {} deposited", amount, token))
            }
            Action::Withdraw { account, token, amount } => {
                let amount = TokenAmount::parse(amount)?;
                self.ledger.withdraw(
                    &resolve_account(account)?,
                    &TokenId::new(token.as_str()),
                    amount,
                    &self.feed,
                )?;
                Ok(format!("{} {} withdrawn", amount, token))
            }
            Action::Mint { account, token, amount } => {
                let amount = TokenAmount::parse(amount)?;
                self.ledger.mint(
                    &resolve_account(account)?,
                    &TokenId::new(token.as_str()),
                    amount,
                    &self.feed,
                )?;
                Ok(format!("{} {} minted", amount, token))
            }
            Action::Repay { account, token, amount } => {
                let amount = TokenAmount::parse(amount)?;
                self.ledger
                    .repay(&resolve_account(account)?, &TokenId::new(token.as_str()), amount)?;
                Ok(format!("{} {} repaid", amount, token))
            }
            Action::Approve { account, token, amount } => {
                let amount = TokenAmount::parse(amount)?;
                let spender = *self.manager.engine_address();
                self.ledger.approve(
                    &TokenId::new(token.as_str()),
                    &resolve_account(account)?,
                    &spender,
                    amount,
                );
                Ok(format!("{} {} approved", amount, token))
            }
            Action::SetPrice { token, price } => {
                self.feed
                    .set_price(TokenId::new(token.as_str()), parse_price(price, self.now)?)?;
                Ok(format!("{} = ${}", token, price))
            }
            Action::Advance { seconds } => {
                self.now = self.now.saturating_add(*seconds);
                Ok(format!("clock at {}", self.now))
            }
            Action::Start { caller, account, via } => {
                let ctx = call_context(caller, via.as_deref(), self.now)?;
                let nonce = self.manager.start_liquidation(
                    &mut self.ledger,
                    &self.feed,
                    &ctx,
                    &resolve_account(account)?,
                )?;
                Ok(format!("auction {} started", nonce))
            }
            Action::Bid {
                bidder,
                nonce,
                ratio,
                incentive,
                via,
            } => {
                let ctx = call_context(bidder, via.as_deref(), self.now)?;
                let attached = match incentive {
                    Some(amount) => TokenAmount::parse(amount)?.raw(),
                    None => 0,
                };
                let request = BidRequest::new(*nonce, parse_percent(ratio)?).with_incentive(attached);
                let plan = self.manager.bid(&mut self.ledger, &ctx, request)?;

                let collateral = plan
                    .collateral
                    .iter()
                    .map(|(token, amount)| format!("{} {}", amount, token))
                    .collect::<Vec<_>>()
                    .join(", ");
                Ok(format!(
                    "filled {} (+{}), paid {} {}, received {}{}",
                    plan.to_ratio,
                    plan.delta_ratio(),
                    plan.stable_amount,
                    self.manager.stable_token(),
                    collateral,
                    if plan.closes { ", auction closed" } else { "" }
                ))
            }
            Action::Pause { caller } => {
                self.manager.pause(&call_context(caller, None, self.now)?)?;
                Ok("engine paused".into())
            }
            Action::Unpause { caller } => {
                self.manager.unpause(&call_context(caller, None, self.now)?)?;
                Ok("engine resumed".into())
            }
            Action::AddAdmin { caller, account } => {
                let account = resolve_account(account)?;
                self.manager
                    .add_admin(&call_context(caller, None, self.now)?, account)?;
                Ok(format!("admin {} added", account.short()))
            }
            Action::RestrictStart { caller, restricted } => {
                self.manager
                    .set_start_restricted(&call_context(caller, None, self.now)?, *restricted)?;
                Ok(format!("start restricted: {}", restricted))
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolve an account label (`"borrower"`) or hex address
pub fn resolve_account(label: &str) -> Result<Address> {
    if label.starts_with("0x") {
        Address::from_hex(label)
    } else {
        Ok(Address::from_label(label))
    }
}

/// Parse a percentage ("25", "12.5") into a ratio
pub fn parse_percent(input: &str) -> Result<Ratio> {
    let invalid = |reason: String| Error::InvalidParameter {
        name: "ratio".into(),
        reason,
    };

    let pct = Decimal::from_str(input.trim()).map_err(|e| invalid(e.to_string()))?;
    if pct.is_sign_negative() {
        return Err(invalid(format!("negative ratio {}", input)));
    }
    let raw = (pct * Decimal::from(1_000_000u64))
        .trunc()
        .to_u64()
        .ok_or_else(|| invalid(format!("ratio {} out of range", input)))?;
    Ok(Ratio::from_raw(raw))
}

fn parse_price(input: &str, timestamp: u64) -> Result<Price> {
    let value = UsdValue::parse(input)?;
    Ok(Price {
        timestamp,
        ..Price::from_wei(value.raw())
    })
}

fn call_context(caller: &str, via: Option<&str>, now: u64) -> Result<CallContext> {
    let origin = resolve_account(caller)?;
    Ok(match via {
        Some(contract) => CallContext::via_contract(origin, resolve_account(contract)?, now),
        None => CallContext::direct(origin, now),
    })
}

fn describe(action: &Action) -> String {
    match action {
        Action::Deposit { account, .. } => format!("deposit ({})", account),
        Action::Withdraw { account, .. } => format!("withdraw ({})", account),
        Action::Mint { account, .. } => format!("mint ({})", account),
        Action::Repay { account, .. } => format!("repay ({})", account),
        Action::Approve { account, .. } => format!("approve ({})", account),
        Action::SetPrice { token, .. } => format!("set price {}", token),
        Action::Advance { seconds } => format!("advance {}s", seconds),
        Action::Start { caller, account, .. } => format!("start {} by {}", account, caller),
        Action::Bid { bidder, nonce, ratio, .. } => {
            format!("bid {}% on #{} by {}", ratio, nonce, bidder)
        }
        Action::Pause { caller } => format!("pause by {}", caller),
        Action::Unpause { caller } => format!("unpause by {}", caller),
        Action::AddAdmin { account, .. } => format!("add admin {}", account),
        Action::RestrictStart { restricted, .. } => format!("restrict start = {}", restricted),
    }
}
