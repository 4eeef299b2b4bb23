//! Bounded exponential backoff with jitter around recoverable RPC calls.
//!
//! Mirrors the reconnect discipline used elsewhere in the codebase: cap the
//! attempt count, sleep between tries, warn on each retry. Non-recoverable
//! kinds (`Rpc`, `Validation`) are returned to the caller immediately.

use crate::error::PoolError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

pub const MAX_ATTEMPTS: u32 = 4;
const BASE_DELAY_MS: u64 = 250;

pub async fn with_backoff<T, F, Fut>(operation: &str, mut call: F) -> Result<T, PoolError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PoolError>>,
{
    let mut attempt = 0u32;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.recoverable() && attempt + 1 < MAX_ATTEMPTS => {
                attempt += 1;
                let delay = backoff_delay(attempt);
                warn!(
                    "{} failed ({}); retry {}/{} in {:?}",
                    operation,
                    err.message,
                    attempt,
                    MAX_ATTEMPTS - 1,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let base = BASE_DELAY_MS * (1u64 << attempt);
    let jitter = rand::thread_rng().gen_range(0..=base / 2);
    Duration::from_millis(base + jitter)
}
