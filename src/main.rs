//! Mempool Intelligence Engine — CLI entry point.
//!
//! One subcommand per exposed operation:
//!     conditions — pool status + congestion + gas tiers for one network
//!     compare    — snapshot several networks and rank them
//!     analyze    — find and decode PYUSD transactions in the pool
//!     check      — probe which txpool methods the endpoint serves
//!
//! Output is pretty-printed JSON on stdout; diagnostics go to stderr via
//! tracing.

use anyhow::Result;
use clap::{Parser, Subcommand};
use poolwatch::config::load_config;
use poolwatch::mempool::MempoolService;
use serde::Serialize;
use tracing::{info, Level};

/// Mempool Intelligence Engine — congestion, gas tiers, PYUSD activity
#[derive(Parser)]
#[command(name = "poolwatch")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pool status, congestion assessment, and gas tiers for one network
    Conditions {
        #[arg(short, long, env = "NETWORK", default_value = "mainnet")]
        network: String,
    },
    /// Snapshot several networks concurrently and rank them
    Compare {
        /// Comma-separated network names (defaults to every configured one)
        #[arg(short, long, value_delimiter = ',')]
        networks: Vec<String>,
    },
    /// Find and decode PYUSD transactions in the pool (or recent blocks)
    Analyze {
        #[arg(short, long, env = "NETWORK", default_value = "mainnet")]
        network: String,
        /// Skip the queued section, scan pending only
        #[arg(long)]
        pending_only: bool,
    },
    /// Probe which txpool methods the endpoint actually serves
    Check {
        #[arg(short, long, env = "NETWORK", default_value = "mainnet")]
        network: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (stderr, so stdout stays machine-readable)
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = load_config()?;
    info!(
        "Mempool engine starting — {} network(s) configured, fallback window {} blocks",
        config.networks.len(),
        config.recent_blocks
    );

    let service = MempoolService::from_config(&config)?;

    match args.command {
        Command::Conditions { network } => {
            info!("Fetching network conditions for {network}...");
            print_json(&service.get_network_conditions(&network).await?)?;
        }
        Command::Compare { networks } => {
            let networks = if networks.is_empty() {
                config.networks.iter().map(|n| n.name.clone()).collect()
            } else {
                networks
            };
            info!("Comparing {} network(s)...", networks.len());
            print_json(&service.compare_networks(&networks).await?)?;
        }
        Command::Analyze {
            network,
            pending_only,
        } => {
            info!("Analyzing PYUSD pool activity on {network}...");
            let report = service
                .analyze_token_transactions(&network, pending_only)
                .await?;
            info!(
                "Scanned {} transactions, {} matched ({:.2}%)",
                report.total_transactions_scanned, report.match_count, report.match_percentage
            );
            print_json(&report)?;
        }
        Command::Check { network } => {
            info!("Probing txpool method availability on {network}...");
            print_json(&service.check_method_availability(&network).await?)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
