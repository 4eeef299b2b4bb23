//! JSON-RPC gateway abstraction.
//!
//! The engine consumes a narrow, read-only RPC surface. Transports only
//! implement `send_rpc`; the typed helpers (`get_block`, `get_fee_data`,
//! `get_block_number`) are provided on top of it, so a test double is a
//! single match over method names.
//!
//! All helpers speak the node's native conventions: quantities are
//! 0x-prefixed hex strings, and unknown blocks come back as JSON null.

pub mod http;

use alloy::primitives::U256;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

pub use http::HttpGateway;

/// Legacy + EIP-1559 fee readings, whichever the node exposes.
#[derive(Debug, Clone, Default)]
pub struct FeeData {
    pub gas_price: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
}

#[async_trait]
pub trait RpcGateway: Send + Sync {
    /// Raw JSON-RPC call. Errors carry the node's message verbatim so the
    /// query layer can classify them by shape.
    async fn send_rpc(&self, method: &str, params: Value) -> Result<Value>;

    /// `eth_getBlockByNumber`; `tag` is "latest" or an 0x-hex number.
    /// Returns None when the node does not know the block.
    async fn get_block(&self, tag: &str, include_transactions: bool) -> Result<Option<Value>> {
        let block = self
            .send_rpc("eth_getBlockByNumber", json!([tag, include_transactions]))
            .await?;
        Ok(if block.is_null() { None } else { Some(block) })
    }

    async fn get_fee_data(&self) -> Result<FeeData> {
        let gas_price = self
            .send_rpc("eth_gasPrice", json!([]))
            .await
            .ok()
            .and_then(|v| v.as_str().map(hex_to_u256));

        // Not every endpoint serves this one; treat absence as None.
        let max_priority_fee_per_gas = self
            .send_rpc("eth_maxPriorityFeePerGas", json!([]))
            .await
            .ok()
            .and_then(|v| v.as_str().map(hex_to_u256));

        Ok(FeeData {
            gas_price,
            max_priority_fee_per_gas,
        })
    }

    async fn get_block_number(&self) -> Result<u64> {
        let raw = self.send_rpc("eth_blockNumber", json!([])).await?;
        raw.as_str()
            .map(hex_to_u64)
            .ok_or_else(|| anyhow!("eth_blockNumber returned a non-string: {raw}"))
    }
}

// ── Wire-format helpers ─────────────────────────────────────────────

/// Parse an 0x-hex quantity; malformed or missing input is zero.
pub fn hex_to_u64(hex: &str) -> u64 {
    u64::from_str_radix(hex.trim_start_matches("0x"), 16).unwrap_or(0)
}

/// Parse an 0x-hex quantity into U256; malformed input is zero.
pub fn hex_to_u256(hex: &str) -> U256 {
    U256::from_str_radix(hex.trim_start_matches("0x"), 16).unwrap_or(U256::ZERO)
}

/// Pool counts arrive as hex strings from geth but as plain numbers from
/// some proxies; accept both, treat anything else as zero.
pub fn quantity_to_u64(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::String(s)) => hex_to_u64(s),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        _ => 0,
    }
}

pub fn u256_to_f64(value: U256) -> f64 {
    u128::try_from(value).map(|v| v as f64).unwrap_or(f64::MAX)
}

pub fn wei_to_gwei(wei: U256) -> f64 {
    u256_to_f64(wei) / 1e9
}

pub fn wei_to_eth(wei: U256) -> f64 {
    u256_to_f64(wei) / 1e18
}
