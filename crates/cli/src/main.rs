use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cryptoconnect_core::*;
use cryptoconnect_engine::{run_all, ExchangeOutcomes};
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "cryptoconnect")]
#[command(about = "Fetch account balances and current rates from crypto exchanges")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch balances and rates from every exchange with credentials
    Fetch {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Currency pairs to report rates for (e.g. "BTCUSDT", "eth/usdt")
        #[arg(long, num_args = 1..)]
        currency_pairs: Option<Vec<String>>,

        /// Binance API key
        #[arg(long, env = "BINANCE_API_KEY", hide_env_values = true)]
        api_key_binance: Option<String>,

        /// Binance API secret key
        #[arg(long, env = "BINANCE_API_SECRET", hide_env_values = true)]
        api_secret_key_binance: Option<String>,

        /// HTTP timeout per request, in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Print the outcome of every exchange as JSON
        #[arg(long)]
        json: bool,
    },

    /// List supported exchanges
    Exchanges,
}

/// Command-line values layered over the config file.
struct FetchOverrides {
    currency_pairs: Option<Vec<String>>,
    api_key_binance: Option<String>,
    api_secret_key_binance: Option<String>,
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only the report.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Fetch {
            config,
            currency_pairs,
            api_key_binance,
            api_secret_key_binance,
            timeout_secs,
            json,
        } => {
            let overrides = FetchOverrides {
                currency_pairs,
                api_key_binance,
                api_secret_key_binance,
                timeout_secs,
            };
            let config = load_config(config, overrides)?;
            fetch(config, json).await?;
        }
        Commands::Exchanges => {
            println!("Supported exchanges:");
            for exchange in ExchangeId::ALL {
                println!("  {}", exchange);
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>, overrides: FetchOverrides) -> Result<AppConfig> {
    let mut config = match &path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::default(),
    };

    if let Some(pairs) = overrides.currency_pairs {
        config.symbols = pairs;
    }
    if let Some(timeout) = overrides.timeout_secs {
        config.timeout_secs = timeout;
    }
    if overrides.api_key_binance.is_some() || overrides.api_secret_key_binance.is_some() {
        let binance = config.exchange_mut(ExchangeId::Binance);
        if let Some(key) = overrides.api_key_binance {
            binance.api_key = Some(key);
        }
        if let Some(secret) = overrides.api_secret_key_binance {
            binance.api_secret = Some(secret);
        }
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn fetch(config: AppConfig, as_json: bool) -> Result<()> {
    let requested = RequestedSymbols::normalize(&config.symbols);

    tracing::info!(
        symbols = %requested.as_slice().join(", "),
        timeout_secs = config.timeout_secs,
        "Starting fetch"
    );

    let outcomes = run_all(&config.exchanges, &requested, config.http_settings()).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&render_json(&outcomes))?);
    } else if outcomes.is_empty() {
        println!("No exchange configured with both an API key and a secret.");
    } else {
        print!("{}", render_text(&outcomes));
    }

    Ok(())
}

fn render_text(outcomes: &ExchangeOutcomes) -> String {
    let mut out = String::new();

    for (exchange, outcome) in outcomes {
        let _ = writeln!(out, "== {} ==", exchange);
        match outcome {
            Ok(report) => {
                if report.balances().is_empty() {
                    let _ = writeln!(out, "No balance found.");
                } else {
                    let _ = writeln!(out, "List of balances:");
                    for (asset, free) in report.balances() {
                        let _ = writeln!(out, "{}: {}", asset, free);
                    }
                }

                if !report.matched_rates().is_empty() {
                    let _ = writeln!(out, "\nCurrent rates:");
                    for (symbol, price) in report.matched_rates() {
                        let _ = writeln!(out, "{}: {}", symbol, price);
                    }
                }

                if !report.unmatched_symbols().is_empty() {
                    let _ = writeln!(out, "\nNo rate found:");
                    let _ = writeln!(out, "{}", report.unmatched_symbols().join(", "));
                }
            }
            Err(e) => {
                let _ = writeln!(out, "An error occurred: {}. Review your API keys.", e);
            }
        }
        out.push('\n');
    }

    out
}

fn render_json(outcomes: &ExchangeOutcomes) -> Value {
    let entries = outcomes
        .iter()
        .map(|(exchange, outcome)| {
            let entry = match outcome {
                Ok(report) => json!({ "status": "ok", "report": report }),
                Err(e) => json!({
                    "status": "error",
                    "kind": e.kind(),
                    "message": e.to_string(),
                }),
            };
            (exchange.clone(), entry)
        })
        .collect::<serde_json::Map<_, _>>();

    Value::Object(entries)
}
