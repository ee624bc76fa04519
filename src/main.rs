// =============================================================================
// RSI Sentinel — Main Entry Point
// =============================================================================
//
// Polls Binance klines on a fixed interval, watches for RSI threshold
// crossings per symbol, and fans alerts out to the configured channels.
// Dedup state survives restarts via a JSON snapshot.
// =============================================================================

mod binance;
mod config;
mod detector;
mod engine;
mod indicators;
mod market_data;
mod notify;
mod state;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::binance::BinanceClient;
use crate::config::Config;
use crate::engine::AlertEngine;
use crate::state::AlertState;

#[derive(Debug, Parser)]
#[command(name = "rsi-sentinel", about = "RSI threshold alert bot for Binance spot pairs")]
struct Cli {
    /// Run a single poll cycle and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Config errors are fatal here, before any I/O happens.
    let config = Config::from_env()?;

    info!(
        symbols = ?config.symbols,
        interval = %config.interval,
        period = config.rsi_period,
        oversold = config.oversold,
        overbought = config.overbought,
        "RSI Sentinel starting"
    );

    let mut state = AlertState::load(&config.state_file);
    let client = BinanceClient::new();
    let notifiers = notify::build_notifiers(&config);

    let engine = AlertEngine::new(config.clone(), client, notifiers);

    if cli.once {
        engine.run(&mut state, true).await;
    } else {
        info!(every_seconds = config.check_every_seconds, "entering poll loop, Ctrl+C to stop");

        tokio::select! {
            _ = engine.run(&mut state, false) => {}
            _ = tokio::signal::ctrl_c() => {
                warn!("shutdown signal received, stopping");
            }
        }

        // The cycle already saves after each pass; this catches a shutdown
        // that lands mid-cycle.
        if let Err(e) = state.save(&config.state_file) {
            error!(error = %e, "failed to save alert state on shutdown");
        }
    }

    info!("RSI Sentinel stopped");
    Ok(())
}
