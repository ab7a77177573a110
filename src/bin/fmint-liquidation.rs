//! fMint Liquidation CLI
//!
//! Inspect auction parameters, print the offering curve and replay
//! liquidation scenarios against an in-memory ledger.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::{style, Term};

use fmint_liquidation::cli::{
    load_config, render_params, render_report, render_schedule, to_json, OutputFormat, Scenario,
    ScenarioRunner,
};
use fmint_liquidation::liquidation::PricingSchedule;

/// fMint liquidation engine - partial-fill Dutch auctions for fMint positions
#[derive(Parser)]
#[command(name = "fmint-liquidation")]
#[command(author = "fMint Liquidation Team")]
#[command(version = fmint_liquidation::VERSION)]
#[command(about = "Dutch-auction liquidation engine for fMint positions", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(short, long, env = "FMINT_CONFIG")]
    config: Option<PathBuf>,

    /// Output format: text, json, json-pretty
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the effective engine configuration
    Params,

    /// Print the offering-ratio curve
    Schedule {
        /// Number of samples over the auction duration
        #[arg(short, long, default_value_t = 8)]
        steps: u64,

        /// Auction start time (unix seconds) for absolute timestamps
        #[arg(long, default_value_t = 0)]
        start: u64,
    },

    /// Replay a scenario file
    Simulate {
        /// Scenario file (JSON)
        scenario: PathBuf,

        /// Also list emitted events
        #[arg(short, long)]
        events: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let term = Term::stdout();

    if let Err(e) = run_command(&cli, &term) {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run_command(cli: &Cli, term: &Term) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Params => cmd_params(cli, term),
        Commands::Schedule { steps, start } => cmd_schedule(cli, *steps, *start, term),
        Commands::Simulate { scenario, events } => cmd_simulate(cli, scenario, *events, term),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND HANDLERS
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_params(cli: &Cli, term: &Term) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref()).context("loading configuration")?;

    match cli.format {
        OutputFormat::Text => write_lines(term, &render_params(&config)),
        format => Ok(term.write_line(&to_json(&config, format)?)?),
    }
}

fn cmd_schedule(cli: &Cli, steps: u64, start: u64, term: &Term) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref()).context("loading configuration")?;
    let schedule = PricingSchedule::from_params(&config.params)?;

    match cli.format {
        OutputFormat::Text => write_lines(term, &render_schedule(&schedule, steps, start)),
        format => Ok(term.write_line(&to_json(&schedule.curve(steps), format)?)?),
    }
}

fn cmd_simulate(cli: &Cli, path: &Path, show_events: bool, term: &Term) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref()).context("loading configuration")?;
    let scenario = Scenario::load(path).with_context(|| format!("reading {}", path.display()))?;

    if cli.format == OutputFormat::Text {
        term.write_line(&format!(
            "{} Replaying {} steps from {}",
            style("→").cyan(),
            scenario.steps.len(),
            path.display()
        ))?;
    }

    let mut runner = ScenarioRunner::new(config, &scenario)?;
    let report = runner.run(&scenario);

    match cli.format {
        OutputFormat::Text => write_lines(term, &render_report(&report, show_events))?,
        format => term.write_line(&to_json(&report, format)?)?,
    }

    let failures = report.failures();
    if failures > 0 {
        anyhow::bail!("{} step(s) did not match their expectation", failures);
    }
    Ok(())
}

fn write_lines(term: &Term, lines: &[String]) -> anyhow::Result<()> {
    for line in lines {
        term.write_line(line)?;
    }
    Ok(())
}
