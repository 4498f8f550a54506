//! Backrun Simulator
//!
//! Loads engine settings and a scenario, builds a router over the scenario's
//! market, feeds it the scenario's triggers (single entry point, or batch when
//! the scenario asks for it) and reports what each trigger produced. Journaled
//! events are appended to a JSONL log.
//!
//! Usage:
//!   cargo run --bin backrun-sim -- --scenario scenarios/weth_usdc.toml
//!   cargo run --bin backrun-sim -- --settings config/engine.toml --scenario s.toml --batch

use anyhow::{Context, Result};
use backrun_engine::config::EngineSettings;
use backrun_engine::events::EventLog;
use backrun_engine::scenario::{display_amount, Scenario};
use backrun_engine::{BackrunRouter, ExecutionOutcome};
use clap::Parser;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Backrun engine simulator
#[derive(Parser)]
#[command(name = "backrun-sim")]
struct Args {
    /// Engine settings (TOML)
    #[arg(long, env = "BACKRUN_SETTINGS", default_value = "config/engine.toml")]
    settings: PathBuf,

    /// Scenario to run (TOML)
    #[arg(long, env = "BACKRUN_SCENARIO")]
    scenario: PathBuf,

    /// Event log output (JSONL)
    #[arg(long, default_value = "data/backrun_events.jsonl")]
    events: PathBuf,

    /// Run the triggers through the batch entry point
    #[arg(long)]
    batch: bool,

    /// Log as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = EngineSettings::load(&args.settings)
        .context("Failed to load engine settings")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    if args.json || settings.logging.json {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).with_target(false).init();
    }

    info!("===========================================");
    info!("   Backrun Simulator");
    info!("===========================================");
    info!("Settings: {}", args.settings.display());
    for applied in &settings.env_overrides {
        info!("Environment override: {}", applied);
    }
    info!("Scenario: {}", args.scenario.display());

    let scenario = Scenario::load(&args.scenario)?;
    let oracle = scenario.oracle().context("Failed to build oracle from scenario")?;
    let router = settings.build_router(Rc::new(oracle))?;
    scenario.install(&router)?;

    let triggers = scenario.triggers()?;
    let outcomes = if args.batch || scenario.runs_batch() {
        info!("Running {} triggers as one batch", triggers.len());
        router.backrun_batch(scenario.pass_through()?, &triggers)?
    } else {
        run_singles(&router, &triggers)
    };

    for (i, outcome) in outcomes.iter().enumerate() {
        report(&scenario, i, outcome);
    }
    let settled = outcomes.iter().filter(|o| !o.is_none()).count();
    info!("{} of {} triggers settled", settled, outcomes.len());

    let mut log = EventLog::new(&args.events)?;
    let written = log.append(&router.drain_events())?;
    info!("📋 {} events written to {}", written, log.path().display());

    Ok(())
}

/// Single entry point per trigger. A failing trigger is reported and skipped.
fn run_singles(router: &BackrunRouter, triggers: &[backrun_engine::BackrunTrigger]) -> Vec<ExecutionOutcome> {
    triggers
        .iter()
        .enumerate()
        .map(|(i, trigger)| match router.backrun(trigger) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Trigger {} failed: {}", i, e);
                ExecutionOutcome::none()
            }
        })
        .collect()
}

fn report(scenario: &Scenario, index: usize, outcome: &ExecutionOutcome) {
    match outcome.profit_asset {
        Some(asset) => info!(
            "Trigger {} | profit {}",
            index,
            display_amount(outcome.realized_profit, scenario.asset_by_address(asset))
        ),
        None => info!("Trigger {} | no profit", index),
    }
}
