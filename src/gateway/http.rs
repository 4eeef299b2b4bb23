//! reqwest-based JSON-RPC 2.0 transport.
//!
//! Deliberately thin: one POST per call, no batching, no connection
//! management beyond reqwest's pool. Node-side errors are surfaced with
//! their original message so the query layer can classify them; HTTP 429
//! is rewritten to the phrasing the classifier looks for.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::trace;

use super::RpcGateway;

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct HttpGateway {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl HttpGateway {
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl RpcGateway for HttpGateway {
    async fn send_rpc(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        trace!("rpc -> {} (id {})", method, id);

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("{} request failed", method))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            bail!("too many requests (HTTP 429)");
        }

        let status = response.status();
        if !status.is_success() {
            bail!("{} returned HTTP {}", method, status);
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .with_context(|| format!("{} returned a non-JSON body", method))?;

        if let Some(err) = rpc.error {
            bail!("{} (code {})", err.message, err.code);
        }

        // A null result is legitimate (e.g. unknown block); keep it as
        // JSON null rather than treating it as a missing field.
        Ok(rpc.result.unwrap_or(Value::Null))
    }
}
