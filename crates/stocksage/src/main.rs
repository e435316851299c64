use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "stocksage",
    about = "StockSage - forecast-backed stock suggestions, predictions and critiques"
)]
struct Cli {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full analysis pipeline over one or more symbols
    Analyze {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Fit the forecaster for one symbol and print its signal rows
    Forecast {
        symbol: String,

        /// Days to forecast past the last observation (config value when omitted)
        #[arg(long)]
        horizon: Option<u32>,

        /// Also score the model on this many trailing observations
        #[arg(long, value_name = "DAYS")]
        backtest: Option<usize>,

        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable (respects RUST_LOG)
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    let config = stocksage::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Analyze { symbols, pretty } => {
            let orchestrator =
                stocksage::build_orchestrator(&config).context("Failed to build orchestrator")?;

            let cancel = CancellationToken::new();
            let signal = cancel.clone();
            tokio::spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Received interrupt, cancelling analysis");
                signal.cancel();
            });

            let result = stocksage::analyze(&orchestrator, &symbols, cancel)
                .await
                .map_err(|e| anyhow::anyhow!("Analysis failed: {e}"))?;
            print_json(&result, pretty)?;
        }
        Command::Forecast {
            symbol,
            horizon,
            backtest,
            pretty,
        } => {
            let provider = stocksage::build_provider(&config.market)?;
            let horizon = horizon.unwrap_or(config.forecast.horizon_days);
            let report =
                stocksage::forecast_symbol(provider.as_ref(), &config, &symbol, horizon, backtest)
                    .await?;
            print_json(&report, pretty)?;
        }
    }

    Ok(())
}
