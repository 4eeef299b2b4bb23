//! Mempool service — the coordination layer.
//!
//! Purpose:
//!     One entry point per exposed operation: network conditions,
//!     cross-network comparison, token activity analysis, method probing.
//!     Owns the fallback strategy: privileged pool content first, recent
//!     blocks when the endpoint refuses or throttles, best-effort trace
//!     enrichment on top.
//!
//! Failure semantics:
//!     Every public method returns a fully-populated result or one
//!     classified error tagged with the failing operation. Partial
//!     failure is tolerated only where documented: comparison proceeds on
//!     the surviving networks, base-fee fetch degrades to the fallback
//!     constant, single-network snapshots fail whole.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::comparison::build_comparison;
use super::decoder;
use super::query::PoolQuery;
use super::types::{
    AnalysisSummary, ClassifiedTransaction, DecodedCall, FunctionStats, MethodAvailability,
    NetworkComparison, NetworkSnapshot, PoolContent, PoolSection, RawTransaction,
    TokenActivityReport,
};
use crate::capability::capabilities_for;
use crate::config::{AppConfig, NetworkConfig, FALLBACK_BASE_FEE_GWEI};
use crate::error::{ErrorKind, PoolError};
use crate::gas::{recommend, round2};
use crate::gateway::{HttpGateway, RpcGateway};
use crate::retry::with_backoff;

struct NetworkHandle {
    config: NetworkConfig,
    query: PoolQuery,
}

pub struct MempoolService {
    networks: BTreeMap<String, NetworkHandle>,
    recent_blocks: u64,
}

impl MempoolService {
    /// Wire the configured networks to HTTP gateways.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let mut handles = Vec::with_capacity(config.networks.len());
        for net in &config.networks {
            let gateway: Arc<dyn RpcGateway> = Arc::new(HttpGateway::new(&net.rpc_url)?);
            handles.push((net.clone(), gateway));
        }
        Ok(Self::new(handles, config.recent_blocks))
    }

    /// Assemble from pre-built gateways (tests inject doubles here).
    pub fn new(networks: Vec<(NetworkConfig, Arc<dyn RpcGateway>)>, recent_blocks: u64) -> Self {
        let networks = networks
            .into_iter()
            .map(|(config, gateway)| {
                let query = PoolQuery::new(gateway, config.name.clone());
                (config.name.clone(), NetworkHandle { config, query })
            })
            .collect();
        Self {
            networks,
            recent_blocks,
        }
    }

    fn handle(&self, network: &str) -> Result<&NetworkHandle, PoolError> {
        self.networks.get(network).ok_or_else(|| {
            PoolError::validation("lookup_network", format!("unknown network '{network}'"))
        })
    }

    // ── Network conditions ──────────────────────────────────────────

    /// One conditions snapshot: pool status, congestion, gas tiers.
    /// Status failure is fatal; a failed base-fee fetch degrades to the
    /// fallback constant.
    pub async fn get_network_conditions(
        &self,
        network: &str,
    ) -> Result<NetworkSnapshot, PoolError> {
        let handle = self.handle(network)?;

        // Status is worth a few retries (it is cheap and the snapshot is
        // useless without it); the base fee has its own fallback chain.
        let (status, base_fee) = tokio::join!(
            with_backoff("txpool_status", || handle.query.fetch_status()),
            handle.query.fetch_base_fee()
        );

        let status = status?;
        let base_fee_gwei = base_fee.unwrap_or_else(|err| {
            warn!(
                "{}: base fee unavailable ({}); assuming {} gwei",
                network, err.message, FALLBACK_BASE_FEE_GWEI
            );
            FALLBACK_BASE_FEE_GWEI
        });

        let congestion = crate::congestion::classify(status.pending);
        let gas = recommend(base_fee_gwei, &congestion);

        Ok(NetworkSnapshot {
            network: network.to_string(),
            status,
            congestion,
            base_fee_gwei,
            gas,
            last_updated_ms: Utc::now().timestamp_millis(),
        })
    }

    /// Snapshot every requested network concurrently and aggregate the
    /// survivors. Only fails when no network answered at all.
    pub async fn compare_networks(
        &self,
        networks: &[String],
    ) -> Result<NetworkComparison, PoolError> {
        let fetches = networks.iter().map(|name| async move {
            (name.as_str(), self.get_network_conditions(name).await)
        });
        let results = futures::future::join_all(fetches).await;

        let mut snapshots = Vec::with_capacity(results.len());
        for (name, result) in results {
            match result {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(err) => warn!("{name} dropped from comparison: {err}"),
            }
        }

        build_comparison(snapshots).ok_or_else(|| {
            PoolError::network(
                "compare_networks",
                "every requested network failed",
                &networks.iter().map(String::as_str).collect::<Vec<_>>(),
            )
        })
    }

    // ── Token activity analysis ─────────────────────────────────────

    /// Find and decode token-contract transactions in the pool.
    ///
    /// Privileged path first (`txpool_content`), recent-block scan when
    /// the endpoint refuses the method or throttles. Both paths return
    /// the same report shape; fallback entries are tagged `recent`.
    pub async fn analyze_token_transactions(
        &self,
        network: &str,
        pending_only: bool,
    ) -> Result<TokenActivityReport, PoolError> {
        let handle = self.handle(network)?;

        let caps = capabilities_for(&handle.config.provider);
        if !caps.supports_content {
            info!(
                "{}: provider '{}' does not serve txpool_content; scanning recent blocks",
                network, handle.config.provider
            );
            return self.scan_recent_blocks(handle).await;
        }

        match handle.query.fetch_content().await {
            Ok(content) => Ok(scan_pool_content(
                &content,
                handle.config.token_contract,
                pending_only,
            )),
            Err(err) if matches!(err.kind, ErrorKind::Rpc | ErrorKind::RateLimit) => {
                warn!(
                    "{}: txpool_content unavailable ({}); falling back to recent blocks",
                    network, err.message
                );
                self.scan_recent_blocks(handle).await
            }
            Err(err) => Err(err),
        }
    }

    /// Fallback path: walk the last `recent_blocks` blocks and classify
    /// every transaction. Individual block failures are skipped, not
    /// fatal; the scan reports whatever it reached.
    async fn scan_recent_blocks(
        &self,
        handle: &NetworkHandle,
    ) -> Result<TokenActivityReport, PoolError> {
        let head = handle.query.head_block_number().await?;
        let start = head.saturating_sub(self.recent_blocks.saturating_sub(1));
        let now = Utc::now().timestamp_millis();
        let try_trace = capabilities_for(&handle.config.provider).supports_trace;

        let mut total_scanned = 0usize;
        let mut matches = Vec::new();

        for number in start..=head {
            let block = match handle.query.fetch_block(number).await {
                Ok(Some(block)) => block,
                Ok(None) => {
                    debug!("{}: block {} not available", handle.query.network(), number);
                    continue;
                }
                Err(err) => {
                    warn!(
                        "{}: skipping block {} during fallback scan: {}",
                        handle.query.network(),
                        number,
                        err
                    );
                    continue;
                }
            };

            for tx in block.full_transactions() {
                total_scanned += 1;
                if !decoder::is_token_transaction(tx, handle.config.token_contract) {
                    continue;
                }
                let decoded = if try_trace {
                    self.decode_with_trace(handle, tx).await
                } else {
                    decoder::decode_calldata(tx.input_data())
                };
                if let Some(classified) =
                    classify_transaction(tx, decoded, PoolSection::Recent, now)
                {
                    matches.push(classified);
                }
            }
        }

        Ok(build_report(total_scanned, matches))
    }

    /// Prefer the trace's view of the input (covers proxied calls whose
    /// outer input is opaque); any trace failure degrades to the static
    /// decode.
    async fn decode_with_trace(&self, handle: &NetworkHandle, tx: &RawTransaction) -> DecodedCall {
        match handle.query.trace_transaction(&tx.hash).await {
            Ok(trace) => {
                if let Some(input) = trace.get("input").and_then(|v| v.as_str()) {
                    let traced = decoder::decode_calldata(input);
                    if traced.is_known() {
                        return traced;
                    }
                }
                decoder::decode_calldata(tx.input_data())
            }
            Err(err) => {
                debug!("trace unavailable for {}: {}", tx.hash, err.message);
                decoder::decode_calldata(tx.input_data())
            }
        }
    }

    // ── Method probing ──────────────────────────────────────────────

    /// Probe which txpool methods the endpoint actually serves and turn
    /// the outcome into user guidance.
    pub async fn check_method_availability(
        &self,
        network: &str,
    ) -> Result<MethodAvailability, PoolError> {
        let handle = self.handle(network)?;

        let (status, content) = tokio::join!(
            handle.query.fetch_status(),
            handle.query.fetch_content()
        );

        let mut errors = Vec::new();
        let supports_status = match status {
            Ok(_) => true,
            Err(err) => {
                errors.push(err.to_string());
                false
            }
        };
        let supports_content = match content {
            Ok(_) => true,
            Err(err) => {
                errors.push(err.to_string());
                false
            }
        };

        let mut recommendations = vec![capabilities_for(&handle.config.provider)
            .guidance
            .to_string()];
        if supports_status && supports_content {
            recommendations.push("Full txpool access available on this endpoint".to_string());
        } else if !supports_content {
            recommendations.push(
                "Pool-level analysis will fall back to recent-block scanning".to_string(),
            );
        }

        Ok(MethodAvailability {
            supports_status,
            supports_content,
            errors,
            recommendations,
        })
    }
}

// ── Scan + report building (pure over fetched data) ─────────────────

fn scan_pool_content(
    content: &PoolContent,
    token_contract: alloy::primitives::Address,
    pending_only: bool,
) -> TokenActivityReport {
    let now = Utc::now().timestamp_millis();
    let mut total_scanned = 0usize;
    let mut matches = Vec::new();

    let mut sections: Vec<(&BTreeMap<_, _>, PoolSection)> =
        vec![(&content.pending, PoolSection::Pending)];
    if !pending_only {
        sections.push((&content.queued, PoolSection::Queued));
    }

    for (section_map, section) in sections {
        for by_nonce in section_map.values() {
            for tx in by_nonce.values() {
                total_scanned += 1;
                if !decoder::is_token_transaction(tx, token_contract) {
                    continue;
                }
                let decoded = decoder::decode_calldata(tx.input_data());
                if let Some(classified) = classify_transaction(tx, decoded, section, now) {
                    matches.push(classified);
                }
            }
        }
    }

    build_report(total_scanned, matches)
}

/// Enrich a raw match. Entries whose sender does not parse are dropped;
/// they carry no usable identity.
fn classify_transaction(
    tx: &RawTransaction,
    function: DecodedCall,
    pool: PoolSection,
    first_seen_ms: i64,
) -> Option<ClassifiedTransaction> {
    let from = tx.sender()?;
    let value_eth = tx.value_eth();

    Some(ClassifiedTransaction {
        hash: tx.hash.clone(),
        from,
        to: tx.recipient(),
        nonce: tx.nonce_u64(),
        gas_price_gwei: round2(tx.gas_price_gwei()),
        value_eth: (value_eth > 0.0).then_some(value_eth),
        function,
        pool,
        first_seen_ms,
    })
}

fn build_report(total_scanned: usize, matches: Vec<ClassifiedTransaction>) -> TokenActivityReport {
    let match_count = matches.len();
    let match_percentage = if total_scanned > 0 {
        round2(match_count as f64 / total_scanned as f64 * 100.0)
    } else {
        0.0
    };

    // Per-function accumulation
    let mut distribution: BTreeMap<String, FunctionStats> = BTreeMap::new();
    let mut gas_sums: BTreeMap<String, f64> = BTreeMap::new();
    for tx in &matches {
        let stats = distribution.entry(tx.function.name.clone()).or_default();
        stats.count += 1;
        stats.total_value_eth += tx.value_eth.unwrap_or(0.0);
        *gas_sums.entry(tx.function.name.clone()).or_default() += tx.gas_price_gwei;
    }
    for (name, stats) in distribution.iter_mut() {
        stats.percentage = round2(stats.count as f64 / match_count as f64 * 100.0);
        stats.avg_gas_price_gwei = round2(gas_sums[name] / stats.count as f64);
        stats.total_value_eth = round2(stats.total_value_eth);
    }

    let top_function = distribution
        .iter()
        .max_by_key(|(_, stats)| stats.count)
        .map(|(name, _)| name.clone());

    let avg_gas_price_gwei = if match_count > 0 {
        round2(matches.iter().map(|tx| tx.gas_price_gwei).sum::<f64>() / match_count as f64)
    } else {
        0.0
    };

    TokenActivityReport {
        total_transactions_scanned: total_scanned,
        match_count,
        match_percentage,
        summary: AnalysisSummary {
            total_scanned,
            match_count,
            match_percentage,
            top_function,
            avg_gas_price_gwei,
        },
        function_distribution: distribution,
        matches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PYUSD_MAINNET;
    use alloy::primitives::Address;
    use anyhow::bail;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::str::FromStr;

    const HOLDER: &str = "0x1111111111111111111111111111111111111111";

    struct CannedGateway {
        responses: HashMap<&'static str, Value>,
        failures: HashMap<&'static str, &'static str>,
    }

    impl CannedGateway {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                failures: HashMap::new(),
            }
        }

        fn respond(mut self, method: &'static str, value: Value) -> Self {
            self.responses.insert(method, value);
            self
        }

        fn fail(mut self, method: &'static str, message: &'static str) -> Self {
            self.failures.insert(method, message);
            self
        }
    }

    #[async_trait]
    impl RpcGateway for CannedGateway {
        async fn send_rpc(&self, method: &str, _params: Value) -> anyhow::Result<Value> {
            if let Some(message) = self.failures.get(method) {
                bail!("{message}");
            }
            match self.responses.get(method) {
                Some(value) => Ok(value.clone()),
                None => bail!("unexpected method {method}"),
            }
        }
    }

    fn net_config(name: &str, provider: &str) -> NetworkConfig {
        NetworkConfig {
            name: name.to_string(),
            rpc_url: "http://localhost:8545".to_string(),
            chain_id: 1,
            token_contract: Address::from_str(PYUSD_MAINNET).unwrap(),
            provider: provider.to_string(),
        }
    }

    fn service_with(
        networks: Vec<(&str, &str, CannedGateway)>,
        recent_blocks: u64,
    ) -> MempoolService {
        MempoolService::new(
            networks
                .into_iter()
                .map(|(name, provider, gateway)| {
                    let gw: Arc<dyn RpcGateway> = Arc::new(gateway);
                    (net_config(name, provider), gw)
                })
                .collect(),
            recent_blocks,
        )
    }

    fn transfer_input() -> String {
        format!(
            "0xa9059cbb{:0>64}{:064x}",
            HOLDER.trim_start_matches("0x"),
            1_000_000u64
        )
    }

    fn transfer_tx(hash: &str) -> Value {
        json!({
            "hash": hash,
            "from": HOLDER,
            "to": PYUSD_MAINNET,
            "gasPrice": "0x5d21dba00",
            "nonce": "0x1",
            "value": "0x0",
            "input": transfer_input()
        })
    }

    fn unrelated_tx(hash: &str) -> Value {
        json!({
            "hash": hash,
            "from": HOLDER,
            "to": "0x2222222222222222222222222222222222222222",
            "gasPrice": "0x3b9aca00",
            "nonce": "0x2",
            "value": "0xde0b6b3a7640000",
            "input": "0x"
        })
    }

    fn healthy_status() -> Value {
        json!({"pending": "0x1f4", "queued": "0x64"})
    }

    fn latest_block() -> Value {
        json!({"number": "0x64", "baseFeePerGas": "0x3b9aca00"})
    }

    // ── Privileged path ─────────────────────────────────────────────

    #[tokio::test]
    async fn pool_content_path_builds_a_full_report() {
        let gateway = CannedGateway::new().respond(
            "txpool_content",
            json!({
                "pending": {HOLDER: {"1": transfer_tx("0xt1"), "2": unrelated_tx("0xu1")}},
                "queued": {"0x3333333333333333333333333333333333333333": {"9": transfer_tx("0xt2")}}
            }),
        );
        let service = service_with(vec![("mainnet", "unknown", gateway)], 5);

        let report = service
            .analyze_token_transactions("mainnet", false)
            .await
            .unwrap();

        assert_eq!(report.total_transactions_scanned, 3);
        assert_eq!(report.match_count, 2);
        assert_eq!(report.match_percentage, 66.67);
        assert_eq!(report.summary.top_function.as_deref(), Some("transfer"));

        let transfer_stats = &report.function_distribution["transfer"];
        assert_eq!(transfer_stats.count, 2);
        assert_eq!(transfer_stats.percentage, 100.0);
        assert_eq!(transfer_stats.avg_gas_price_gwei, 25.0);

        let sections: Vec<_> = report.matches.iter().map(|m| m.pool).collect();
        assert!(sections.contains(&PoolSection::Pending));
        assert!(sections.contains(&PoolSection::Queued));
    }

    #[tokio::test]
    async fn pending_only_skips_the_queued_section() {
        let gateway = CannedGateway::new().respond(
            "txpool_content",
            json!({
                "pending": {HOLDER: {"1": transfer_tx("0xt1")}},
                "queued": {"0x3333333333333333333333333333333333333333": {"9": transfer_tx("0xt2")}}
            }),
        );
        let service = service_with(vec![("mainnet", "unknown", gateway)], 5);

        let report = service
            .analyze_token_transactions("mainnet", true)
            .await
            .unwrap();

        assert_eq!(report.total_transactions_scanned, 1);
        assert_eq!(report.match_count, 1);
        assert_eq!(report.matches[0].pool, PoolSection::Pending);
    }

    // ── Fallback path ───────────────────────────────────────────────

    #[tokio::test]
    async fn method_rejection_falls_back_to_recent_blocks() {
        let gateway = CannedGateway::new()
            .fail(
                "txpool_content",
                "the method txpool_content does not exist/is not available",
            )
            .respond("eth_blockNumber", json!("0x64"))
            .respond(
                "eth_getBlockByNumber",
                json!({
                    "number": "0x64",
                    "transactions": [transfer_tx("0xt1"), unrelated_tx("0xu1")]
                }),
            )
            .fail("debug_traceTransaction", "tracing not supported");
        let service = service_with(vec![("mainnet", "unknown", gateway)], 1);

        let report = service
            .analyze_token_transactions("mainnet", false)
            .await
            .unwrap();

        assert_eq!(report.total_transactions_scanned, 2);
        assert_eq!(report.match_count, 1);
        assert_eq!(report.matches[0].pool, PoolSection::Recent);
        // trace failed, static decode still identified the function
        assert_eq!(report.matches[0].function.name, "transfer");
    }

    #[tokio::test]
    async fn known_restricted_provider_skips_the_privileged_call() {
        // No txpool_content canned: the registry must route straight to
        // blocks, never touching the method.
        let gateway = CannedGateway::new()
            .respond("eth_blockNumber", json!("0x64"))
            .respond(
                "eth_getBlockByNumber",
                json!({"number": "0x64", "transactions": [transfer_tx("0xt1")]}),
            );
        let service = service_with(vec![("mainnet", "infura", gateway)], 1);

        let report = service
            .analyze_token_transactions("mainnet", false)
            .await
            .unwrap();

        assert_eq!(report.match_count, 1);
        assert_eq!(report.matches[0].pool, PoolSection::Recent);
    }

    #[tokio::test]
    async fn validation_failures_do_not_fall_back() {
        let gateway = CannedGateway::new().respond(
            "txpool_content",
            json!({"pending": "not a map", "queued": {}}),
        );
        let service = service_with(vec![("mainnet", "unknown", gateway)], 5);

        let err = service
            .analyze_token_transactions("mainnet", false)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    // ── Conditions + comparison ─────────────────────────────────────

    #[tokio::test]
    async fn conditions_snapshot_combines_status_and_fees() {
        let gateway = CannedGateway::new()
            .respond("txpool_status", healthy_status())
            .respond("eth_getBlockByNumber", latest_block());
        let service = service_with(vec![("mainnet", "unknown", gateway)], 5);

        let snapshot = service.get_network_conditions("mainnet").await.unwrap();

        assert_eq!(snapshot.status.pending, 500);
        assert_eq!(snapshot.status.total, 600);
        assert_eq!(snapshot.base_fee_gwei, 1.0);
        assert_eq!(snapshot.congestion.level, crate::congestion::CongestionLevel::Low);
        assert_eq!(snapshot.gas.rapid.price_gwei, 1.5);
    }

    #[tokio::test]
    async fn failed_base_fee_degrades_to_the_fallback_constant() {
        let gateway = CannedGateway::new()
            .respond("txpool_status", healthy_status())
            .fail("eth_getBlockByNumber", "connection reset")
            .fail("eth_gasPrice", "connection reset")
            .fail("eth_maxPriorityFeePerGas", "connection reset");
        let service = service_with(vec![("mainnet", "unknown", gateway)], 5);

        let snapshot = service.get_network_conditions("mainnet").await.unwrap();
        assert_eq!(snapshot.base_fee_gwei, FALLBACK_BASE_FEE_GWEI);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_is_fatal_to_the_snapshot() {
        let gateway = CannedGateway::new()
            .fail("txpool_status", "connection reset")
            .respond("eth_getBlockByNumber", latest_block());
        let service = service_with(vec![("mainnet", "unknown", gateway)], 5);

        assert!(service.get_network_conditions("mainnet").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn comparison_survives_a_failed_network() {
        let ok1 = CannedGateway::new()
            .respond("txpool_status", json!({"pending": "0x2710", "queued": "0x0"}))
            .respond("eth_getBlockByNumber", latest_block());
        let ok2 = CannedGateway::new()
            .respond("txpool_status", json!({"pending": "0x64", "queued": "0x0"}))
            .respond("eth_getBlockByNumber", latest_block());
        let broken = CannedGateway::new()
            .fail("txpool_status", "connection reset")
            .respond("eth_getBlockByNumber", latest_block());

        let service = service_with(
            vec![
                ("mainnet", "unknown", ok1),
                ("sepolia", "unknown", ok2),
                ("holesky", "unknown", broken),
            ],
            5,
        );

        let networks: Vec<String> = ["mainnet", "sepolia", "holesky"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let comparison = service.compare_networks(&networks).await.unwrap();

        assert_eq!(comparison.snapshots.len(), 2);
        assert_eq!(comparison.most_congested, "mainnet");
        assert_eq!(comparison.least_congested, "sepolia");
        // failed network excluded from the aggregates
        assert_eq!(comparison.average_pending, (10_000.0 + 100.0) / 2.0);
        assert!(!comparison
            .snapshots
            .iter()
            .any(|s| s.network == "holesky"));
    }

    #[tokio::test(start_paused = true)]
    async fn comparison_fails_only_when_every_network_fails() {
        let broken = CannedGateway::new().fail("txpool_status", "connection reset");
        let service = service_with(vec![("mainnet", "unknown", broken)], 5);

        let err = service
            .compare_networks(&["mainnet".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
    }

    // ── Probing ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn availability_probe_reports_partial_support() {
        let gateway = CannedGateway::new()
            .respond("txpool_status", healthy_status())
            .fail(
                "txpool_content",
                "the method txpool_content does not exist/is not available",
            );
        let service = service_with(vec![("mainnet", "unknown", gateway)], 5);

        let availability = service.check_method_availability("mainnet").await.unwrap();

        assert!(availability.supports_status);
        assert!(!availability.supports_content);
        assert_eq!(availability.errors.len(), 1);
        assert!(availability
            .recommendations
            .iter()
            .any(|r| r.contains("recent-block scanning")));
    }

    #[tokio::test]
    async fn unknown_network_is_a_validation_error() {
        let service = service_with(vec![], 5);
        let err = service.get_network_conditions("nowhere").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
