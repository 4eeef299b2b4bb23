//! Mempool data model — typed views over the node's txpool and block JSON.
//!
//! Two layers, kept apart on purpose:
//!     raw wire shapes    — RawTransaction, BlockView, PoolContent
//!                          (serde over the node's camelCase hex conventions)
//!     derived reports    — ClassifiedTransaction, TokenActivityReport,
//!                          NetworkSnapshot, NetworkComparison, PoolTrend
//!                          (serializable outputs handed to the caller)

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::congestion::CongestionAssessment;
use crate::gas::GasTierSet;
use crate::gateway::{hex_to_u64, hex_to_u256, wei_to_eth, wei_to_gwei};

// ── Wire shapes ─────────────────────────────────────────────────────

/// Pool depth as reported by `txpool_status`.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub pending: u64,
    pub queued: u64,
    /// Always pending + queued
    pub total: u64,
    pub timestamp_ms: i64,
    pub network: String,
}

/// The node's raw view of a pooled or mined transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    pub hash: String,
    pub from: String,
    /// None for contract creation
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub gas_price: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default, alias = "data")]
    pub input: Option<String>,
}

impl RawTransaction {
    pub fn sender(&self) -> Option<Address> {
        Address::from_str(&self.from).ok()
    }

    pub fn recipient(&self) -> Option<Address> {
        self.to.as_deref().and_then(|s| Address::from_str(s).ok())
    }

    pub fn gas_price_gwei(&self) -> f64 {
        wei_to_gwei(hex_to_u256(self.gas_price.as_deref().unwrap_or("0x0")))
    }

    pub fn value_eth(&self) -> f64 {
        wei_to_eth(hex_to_u256(self.value.as_deref().unwrap_or("0x0")))
    }

    pub fn nonce_u64(&self) -> u64 {
        hex_to_u64(self.nonce.as_deref().unwrap_or("0x0"))
    }

    pub fn input_data(&self) -> &str {
        self.input.as_deref().unwrap_or("0x")
    }

    pub fn value_wei(&self) -> U256 {
        hex_to_u256(self.value.as_deref().unwrap_or("0x0"))
    }
}

/// `txpool_content`: sender address → nonce → transaction, per section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoolContent {
    #[serde(default)]
    pub pending: BTreeMap<String, BTreeMap<String, RawTransaction>>,
    #[serde(default)]
    pub queued: BTreeMap<String, BTreeMap<String, RawTransaction>>,
}

impl PoolContent {
    pub fn pending_count(&self) -> usize {
        self.pending.values().map(BTreeMap::len).sum()
    }

    pub fn queued_count(&self) -> usize {
        self.queued.values().map(BTreeMap::len).sum()
    }
}

/// `eth_getBlockByNumber`, reduced to the fields this engine reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockView {
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub base_fee_per_gas: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub transactions: Vec<BlockTx>,
}

/// Blocks carry full objects or bare hashes depending on the request flag.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BlockTx {
    Full(Box<RawTransaction>),
    Hash(String),
}

impl BlockView {
    pub fn full_transactions(&self) -> impl Iterator<Item = &RawTransaction> {
        self.transactions.iter().filter_map(|tx| match tx {
            BlockTx::Full(tx) => Some(tx.as_ref()),
            BlockTx::Hash(_) => None,
        })
    }
}

// ── Decoded calldata ────────────────────────────────────────────────

/// Where a classified transaction was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolSection {
    Pending,
    Queued,
    /// Found by the recent-block fallback scan
    Recent,
}

/// A decoded parameter value. Addresses render checksummed, amounts as
/// raw token units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Address(Address),
    Amount(U256),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Address(addr) => write!(f, "{addr}"),
            ParamValue::Amount(amount) => write!(f, "{amount}"),
        }
    }
}

/// Outcome of decoding one transaction's input bytes.
///
/// `params` is present only when the selector is recognized and the input
/// carries the full fixed-size parameter block; it is never partially
/// filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedCall {
    /// Function name, or "Unknown" for foreign selectors
    pub name: String,
    /// 4-byte selector as "0x" + 8 hex chars
    pub selector: String,
    pub params: Option<BTreeMap<String, ParamValue>>,
}

impl DecodedCall {
    pub fn unknown(selector: String) -> Self {
        Self {
            name: "Unknown".to_string(),
            selector,
            params: None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.name != "Unknown"
    }
}

/// A pooled transaction confirmed to touch the token contract, enriched
/// with everything the caller displays.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedTransaction {
    pub hash: String,
    pub from: Address,
    pub to: Option<Address>,
    pub nonce: u64,
    pub gas_price_gwei: f64,
    /// Only set when the transaction moves ETH alongside the call
    pub value_eth: Option<f64>,
    pub function: DecodedCall,
    pub pool: PoolSection,
    pub first_seen_ms: i64,
}

// ── Analysis reports ────────────────────────────────────────────────

/// Per-function aggregate within one analysis pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FunctionStats {
    pub count: usize,
    /// Share of all matched transactions, percent
    pub percentage: f64,
    pub avg_gas_price_gwei: f64,
    pub total_value_eth: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub total_scanned: usize,
    pub match_count: usize,
    pub match_percentage: f64,
    pub top_function: Option<String>,
    pub avg_gas_price_gwei: f64,
}

/// Token activity over the pool (or recent blocks, when the privileged
/// path is unavailable). Both paths produce this same shape.
#[derive(Debug, Clone, Serialize)]
pub struct TokenActivityReport {
    pub total_transactions_scanned: usize,
    pub matches: Vec<ClassifiedTransaction>,
    pub match_count: usize,
    pub match_percentage: f64,
    pub function_distribution: BTreeMap<String, FunctionStats>,
    pub summary: AnalysisSummary,
}

// ── Network-level aggregates ────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct NetworkSnapshot {
    pub network: String,
    pub status: PoolStatus,
    pub congestion: CongestionAssessment,
    pub base_fee_gwei: f64,
    pub gas: GasTierSet,
    pub last_updated_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkComparison {
    pub snapshots: Vec<NetworkSnapshot>,
    pub most_congested: String,
    pub least_congested: String,
    pub average_pending: f64,
    pub total_transactions: u64,
    /// Networks above the moderate band (high/extreme)
    pub congested_networks: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Pending-count movement of the latest status against a recent window.
#[derive(Debug, Clone, Serialize)]
pub struct PoolTrend {
    pub direction: TrendDirection,
    pub change_percent: f64,
    pub recommendation: String,
}

/// Result of probing which txpool methods the endpoint actually serves.
#[derive(Debug, Clone, Serialize)]
pub struct MethodAvailability {
    pub supports_status: bool,
    pub supports_content: bool,
    pub errors: Vec<String>,
    pub recommendations: Vec<String>,
}
