//! Configuration management
//! Network registry + engine constants, loaded from .env

use alloy::primitives::Address;
use anyhow::{Context, Result};
use std::str::FromStr;

/// Average transactions included per block, used for confirmation estimates.
pub const AVG_TX_PER_BLOCK: f64 = 250.0;

/// Average block interval in seconds.
pub const AVG_BLOCK_TIME_SECS: f64 = 12.0;

/// Base fee assumed when the node exposes no EIP-1559 fee data (gwei).
pub const FALLBACK_BASE_FEE_GWEI: f64 = 20.0;

/// How many recent blocks the fallback scanner walks by default.
pub const DEFAULT_RECENT_BLOCKS: u64 = 5;

/// How many pooled transactions are structurally validated per pool section.
/// Bounded on purpose: a mainnet pool can hold tens of thousands of entries
/// and exhaustive validation would dominate the query cost.
pub const CONTENT_SAMPLE_SIZE: usize = 5;

/// PYUSD token contract on Ethereum mainnet.
pub const PYUSD_MAINNET: &str = "0x6c3ea9036406852006290770BEdFcAbA0e23A0e8";

/// PYUSD token contract on Sepolia.
pub const PYUSD_SEPOLIA: &str = "0xCaC524BcA292aaade2DF8A05cC58F0a65B1B3bB9";

/// Per-network settings
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub name: String,
    pub rpc_url: String,
    pub chain_id: u64,
    /// Token contract whose pool activity is tracked
    pub token_contract: Address,
    /// Capability-registry key ("gcp", "alchemy", ...), sniffed from the RPC URL
    pub provider: String,
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub networks: Vec<NetworkConfig>,
    /// Block window for the recent-block fallback scan
    pub recent_blocks: u64,
}

impl AppConfig {
    pub fn network(&self, name: &str) -> Option<&NetworkConfig> {
        self.networks.iter().find(|n| n.name == name)
    }
}

pub fn load_config() -> Result<AppConfig> {
    dotenv::dotenv().ok();

    let networks_str =
        std::env::var("NETWORKS").unwrap_or_else(|_| "mainnet,sepolia".to_string());

    let mut networks = Vec::new();
    for name in networks_str.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        networks.push(load_network(name)?);
    }

    let recent_blocks = match std::env::var("RECENT_BLOCKS") {
        Ok(v) => v.parse().context("RECENT_BLOCKS is not a number")?,
        Err(_) => DEFAULT_RECENT_BLOCKS,
    };

    Ok(AppConfig {
        networks,
        recent_blocks,
    })
}

fn load_network(name: &str) -> Result<NetworkConfig> {
    let upper = name.to_uppercase();

    let rpc_url = std::env::var(format!("RPC_URL_{}", upper))
        .ok()
        .or_else(|| default_rpc_url(name).map(str::to_string))
        .with_context(|| format!("no RPC_URL_{} set and no default for '{}'", upper, name))?;

    let token_str = std::env::var(format!("TOKEN_CONTRACT_{}", upper))
        .ok()
        .or_else(|| default_token_contract(name).map(str::to_string))
        .with_context(|| format!("no TOKEN_CONTRACT_{} set and no default for '{}'", upper, name))?;

    let token_contract = Address::from_str(&token_str)
        .with_context(|| format!("invalid token contract address for '{}': {}", name, token_str))?;

    Ok(NetworkConfig {
        name: name.to_string(),
        chain_id: default_chain_id(name),
        provider: provider_hint(&rpc_url).to_string(),
        rpc_url,
        token_contract,
    })
}

fn default_rpc_url(network: &str) -> Option<&'static str> {
    match network {
        "mainnet" => Some("https://ethereum-rpc.publicnode.com"),
        "sepolia" => Some("https://ethereum-sepolia-rpc.publicnode.com"),
        "holesky" => Some("https://ethereum-holesky-rpc.publicnode.com"),
        _ => None,
    }
}

fn default_token_contract(network: &str) -> Option<&'static str> {
    match network {
        "mainnet" => Some(PYUSD_MAINNET),
        "sepolia" | "holesky" => Some(PYUSD_SEPOLIA),
        _ => None,
    }
}

fn default_chain_id(network: &str) -> u64 {
    match network {
        "mainnet" => 1,
        "sepolia" => 11155111,
        "holesky" => 17000,
        _ => 0,
    }
}

/// Derive the capability-registry key from the RPC endpoint host.
pub fn provider_hint(rpc_url: &str) -> &'static str {
    let url = rpc_url.to_lowercase();
    if url.contains("alchemy") {
        "alchemy"
    } else if url.contains("infura") {
        "infura"
    } else if url.contains("quiknode") || url.contains("quicknode") {
        "quicknode"
    } else if url.contains("googleapis") || url.contains("blockchain.googleapis") {
        "gcp"
    } else if url.contains("localhost") || url.contains("127.0.0.1") {
        "geth"
    } else {
        "unknown"
    }
}
