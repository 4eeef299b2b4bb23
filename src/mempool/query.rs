//! Pool query layer.
//!
//! Typed, validated reads over the gateway: txpool status/content, base
//! fee, block lookups, transaction traces. Raw transport failures are
//! classified here: by the time an error leaves this module it carries a
//! kind, the failing operation, and a retry hint when retrying can help.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::types::{BlockView, PoolContent, PoolStatus};
use crate::config::{CONTENT_SAMPLE_SIZE, FALLBACK_BASE_FEE_GWEI};
use crate::error::PoolError;
use crate::gateway::{quantity_to_u64, wei_to_gwei, RpcGateway};

pub struct PoolQuery {
    gateway: Arc<dyn RpcGateway>,
    network: String,
}

impl PoolQuery {
    pub fn new(gateway: Arc<dyn RpcGateway>, network: impl Into<String>) -> Self {
        Self {
            gateway,
            network: network.into(),
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// Pool depth via `txpool_status`. Missing fields read as zero.
    pub async fn fetch_status(&self) -> Result<PoolStatus, PoolError> {
        let raw = self
            .gateway
            .send_rpc("txpool_status", json!([]))
            .await
            .map_err(|e| self.classify("txpool_status", e))?;

        let pending = quantity_to_u64(raw.get("pending"));
        let queued = quantity_to_u64(raw.get("queued"));

        Ok(PoolStatus {
            pending,
            queued,
            total: pending + queued,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            network: self.network.clone(),
        })
    }

    /// Full pool via `txpool_content`, structurally validated on a bounded
    /// sample before deserialization. Sampling keeps validation cheap on
    /// pools with tens of thousands of entries, at the cost of not
    /// catching malformed entries past the sample.
    pub async fn fetch_content(&self) -> Result<PoolContent, PoolError> {
        let raw = self
            .gateway
            .send_rpc("txpool_content", json!([]))
            .await
            .map_err(|e| self.classify("txpool_content", e))?;

        validate_content(&raw)?;

        serde_json::from_value(raw).map_err(|e| {
            PoolError::validation("txpool_content", format!("malformed pool content: {e}"))
        })
    }

    /// Current base fee in gwei. Prefers the latest block's EIP-1559 field,
    /// falls back to `eth_gasPrice`, then to the hard-coded constant.
    pub async fn fetch_base_fee(&self) -> Result<f64, PoolError> {
        let block = self
            .gateway
            .get_block("latest", false)
            .await
            .map_err(|e| self.classify("eth_getBlockByNumber", e))?;

        if let Some(raw) = block {
            if let Some(fee_hex) = raw.get("baseFeePerGas").and_then(Value::as_str) {
                return Ok(wei_to_gwei(crate::gateway::hex_to_u256(fee_hex)));
            }
        }

        // Pre-London chains and some proxies omit the field entirely.
        if let Ok(fee_data) = self.gateway.get_fee_data().await {
            if let Some(gas_price) = fee_data.gas_price {
                return Ok(wei_to_gwei(gas_price));
            }
        }

        warn!(
            "{}: no fee data exposed; assuming {} gwei",
            self.network, FALLBACK_BASE_FEE_GWEI
        );
        Ok(FALLBACK_BASE_FEE_GWEI)
    }

    pub async fn head_block_number(&self) -> Result<u64, PoolError> {
        self.gateway
            .get_block_number()
            .await
            .map_err(|e| self.classify("eth_blockNumber", e))
    }

    /// One block with full transaction objects. None when the node does
    /// not know the block.
    pub async fn fetch_block(&self, number: u64) -> Result<Option<BlockView>, PoolError> {
        let tag = format!("0x{number:x}");
        let raw = self
            .gateway
            .get_block(&tag, true)
            .await
            .map_err(|e| self.classify("eth_getBlockByNumber", e))?;

        raw.map(|v| {
            serde_json::from_value(v).map_err(|e| {
                PoolError::validation(
                    "eth_getBlockByNumber",
                    format!("malformed block {number}: {e}"),
                )
            })
        })
        .transpose()
    }

    /// callTracer execution record, used as a best-effort enrichment
    /// source during the fallback scan.
    pub async fn trace_transaction(&self, hash: &str) -> Result<Value, PoolError> {
        self.gateway
            .send_rpc(
                "debug_traceTransaction",
                json!([hash, {"tracer": "callTracer"}]),
            )
            .await
            .map_err(|e| self.classify("debug_traceTransaction", e))
    }

    fn classify(&self, operation: &str, err: anyhow::Error) -> PoolError {
        let classified = PoolError::classify(operation, err.to_string(), &[&self.network]);
        debug!(
            "{}: {} classified as {:?}",
            self.network, operation, classified.kind
        );
        classified
    }
}

/// Structural checks over the raw `txpool_content` response: both sections
/// must be address-keyed maps of nonce-keyed maps, and the first few
/// sampled transactions must carry hash/from/gasPrice.
fn validate_content(raw: &Value) -> Result<(), PoolError> {
    for section in ["pending", "queued"] {
        let entries = raw
            .get(section)
            .and_then(Value::as_object)
            .ok_or_else(|| {
                PoolError::validation(
                    "txpool_content",
                    format!("'{section}' is not an address-keyed map"),
                )
            })?;

        let mut sampled = 0usize;
        'section: for (sender, by_nonce) in entries {
            let by_nonce = by_nonce.as_object().ok_or_else(|| {
                PoolError::validation(
                    "txpool_content",
                    format!("{section} entry for {sender} is not a nonce-keyed map"),
                )
            })?;

            for (nonce, tx) in by_nonce {
                if sampled >= CONTENT_SAMPLE_SIZE {
                    break 'section;
                }
                validate_sampled_tx(section, sender, nonce, tx)?;
                sampled += 1;
            }
        }
    }
    Ok(())
}

fn validate_sampled_tx(
    section: &str,
    sender: &str,
    nonce: &str,
    tx: &Value,
) -> Result<(), PoolError> {
    let complain = |what: &str| {
        PoolError::validation(
            "txpool_content",
            format!("{section} transaction {sender}/{nonce} {what}"),
        )
    };

    let tx = tx.as_object().ok_or_else(|| complain("is not an object"))?;

    for field in ["hash", "from", "gasPrice"] {
        let ok = tx
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty());
        if !ok {
            return Err(complain(&format!("lacks {field}")));
        }
    }
    Ok(())
}
