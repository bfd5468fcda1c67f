// In app/src/main.rs

use anyhow::{Context, Result};
use api_client::{HyperliquidClient, OkxClient};
use app_config::Settings;
use clap::{Parser, Subcommand};
use engine::{Engine, PlannedAction, StopReason};
use execution::{HyperliquidVenue, OkxVenue, ReferenceVenue, TargetVenue};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::prelude::*;

// --- Command-Line Interface Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = "Mirrors a Hyperliquid account's perpetual positions onto an OKX account.")]
struct Cli {
    /// Directory holding `base.toml` and the per-environment overrides.
    #[arg(long, global = true, default_value = "config")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Starts the copy loop. Runs until the local account is flat or Ctrl-C is pressed.
    Run,

    /// Prints the orders a reconciliation pass would send right now. Nothing is sent.
    Plan,
}

// --- Main Application Entry Point ---

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from a .env file, if it exists.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = app_config::load_settings_from(&cli.config_dir).context("loading settings")?;
    init_tracing(&settings.app.log_level);

    tracing::info!(environment = %settings.app.environment, "Starting mirror");

    match cli.command {
        Commands::Run => run_app(settings).await?,
        Commands::Plan => handle_plan(settings).await?,
    }

    Ok(())
}

fn init_tracing(log_level: &str) {
    let level = log_level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(
        tracing_subscriber::filter::Targets::new()
            .with_target("reqwest", tracing::Level::WARN)
            .with_target("hyper", tracing::Level::WARN)
            .with_default(level),
    );
    tracing_subscriber::registry().with(fmt_layer).init();
}

/// Builds the live venue adapters from the settings.
fn build_venues(settings: &Settings) -> Result<(Arc<dyn ReferenceVenue>, Arc<dyn TargetVenue>)> {
    let okx = OkxClient::new(&settings.okx)?;
    let hyperliquid = HyperliquidClient::new(&settings.hyperliquid.rest_base_url)?;

    if settings.okx.simulated {
        tracing::info!("OKX demo trading enabled.");
    } else {
        tracing::warn!("LIVE TRADING IS ENABLED. REAL ORDERS WILL BE PLACED.");
    }

    Ok((Arc::new(HyperliquidVenue::new(hyperliquid)), Arc::new(OkxVenue::new(okx))))
}

// --- "Run" Subcommand Logic ---

async fn run_app(settings: Settings) -> Result<()> {
    let registry = settings.instrument_registry()?;
    tracing::info!(instruments = registry.len(), "Instrument table loaded.");

    let (reference, target) = build_venues(&settings)?;
    let engine = Engine::new(&settings, registry, reference, target).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, stopping after the current cycle...");
            let _ = shutdown_tx.send(true);
        }
    });

    match engine.run(shutdown_rx).await? {
        StopReason::LocalFlat => tracing::info!("Local account flat, exiting."),
        StopReason::Interrupted => tracing::info!("Stopped by user."),
    }
    Ok(())
}

// --- "Plan" Subcommand Logic ---

async fn handle_plan(settings: Settings) -> Result<()> {
    let registry = settings.instrument_registry()?;
    let (reference, target) = build_venues(&settings)?;

    let plan = engine::preview(&settings, &registry, reference.as_ref(), target).await?;

    println!("\n--- Reconciliation Plan ---");
    println!("Copy budget:    {} USD", settings.copy.budget_usd);
    println!("Scaling factor: {}", plan.scaling_factor);
    println!("{:<18} {:>14} {:>14}  {}", "Instrument", "Target", "Held", "Action");
    for step in &plan.steps {
        let target = step
            .target
            .as_ref()
            .map(|t| t.contracts.round_dp(4).to_string())
            .unwrap_or_else(|| "-".into());
        let action = match &step.action {
            PlannedAction::MissingSpec => "skip (no instrument rules)".to_string(),
            PlannedAction::Synchronized => "in sync".to_string(),
            PlannedAction::BelowLot { diff } => format!("skip (diff {} below one lot)", diff.round_dp(4)),
            PlannedAction::Trade(intent) => match intent.leverage {
                Some(leverage) => format!("{} {} @ {}x", intent.side, intent.contracts, leverage),
                None => format!("{} {} (close)", intent.side, intent.contracts),
            },
        };
        println!("{:<18} {:>14} {:>14}  {}", step.instrument.to_string(), target, step.current.to_string(), action);
    }
    println!("{} order(s) would be sent.", plan.intents().count());
    Ok(())
}
