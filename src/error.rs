//! Error taxonomy for RPC-backed pool queries.
//!
//! Every failure that crosses a public boundary is classified into one of
//! four kinds. The split drives behavior: `Rpc` triggers the recent-block
//! fallback, `RateLimit` and `Network` are retryable, `Validation` is
//! surfaced verbatim and never retried.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Generic connectivity/transport failure
    Network,
    /// Method unsupported by the endpoint
    Rpc,
    /// Endpoint throttled the request
    RateLimit,
    /// Malformed response shape
    Validation,
}

/// Enough to re-issue the failing operation without holding a closure,
/// so the error stays serializable.
#[derive(Debug, Clone, Serialize)]
pub struct RetryHint {
    pub operation: String,
    pub params: Vec<String>,
}

#[derive(Debug, Clone, Error, Serialize)]
#[error("{operation}: {message}")]
pub struct PoolError {
    pub kind: ErrorKind,
    /// Name of the operation that failed (e.g. "txpool_content")
    pub operation: String,
    pub message: String,
    /// Present on recoverable kinds only
    pub retry: Option<RetryHint>,
}

impl PoolError {
    pub fn network(operation: &str, message: impl Into<String>, params: &[&str]) -> Self {
        Self {
            kind: ErrorKind::Network,
            operation: operation.to_string(),
            message: message.into(),
            retry: Some(retry_hint(operation, params)),
        }
    }

    pub fn rpc(operation: &str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Rpc,
            operation: operation.to_string(),
            message: message.into(),
            retry: None,
        }
    }

    pub fn rate_limited(operation: &str, message: impl Into<String>, params: &[&str]) -> Self {
        Self {
            kind: ErrorKind::RateLimit,
            operation: operation.to_string(),
            message: message.into(),
            retry: Some(retry_hint(operation, params)),
        }
    }

    pub fn validation(operation: &str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            operation: operation.to_string(),
            message: message.into(),
            retry: None,
        }
    }

    /// Classify a raw transport failure by message shape. Nodes phrase
    /// method rejection and throttling in a handful of well-known ways;
    /// everything else is treated as transient connectivity trouble.
    pub fn classify(operation: &str, message: impl Into<String>, params: &[&str]) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        if lower.contains("method not found")
            || lower.contains("does not exist")
            || lower.contains("not supported")
            || lower.contains("not available")
        {
            Self::rpc(operation, message)
        } else if lower.contains("rate limit")
            || lower.contains("too many requests")
            || lower.contains("429")
        {
            Self::rate_limited(operation, message, params)
        } else {
            Self::network(operation, message, params)
        }
    }

    pub fn recoverable(&self) -> bool {
        matches!(self.kind, ErrorKind::Network | ErrorKind::RateLimit)
    }
}

fn retry_hint(operation: &str, params: &[&str]) -> RetryHint {
    RetryHint {
        operation: operation.to_string(),
        params: params.iter().map(|p| p.to_string()).collect(),
    }
}
