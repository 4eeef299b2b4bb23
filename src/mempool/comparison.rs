//! Cross-network comparison and pool trend detection.
//!
//! Pure aggregation over already-fetched snapshots; the orchestrator owns
//! the fan-out and failure tolerance, this module owns the arithmetic and
//! the narrative recommendations.

use super::types::{NetworkComparison, NetworkSnapshot, PoolStatus, PoolTrend, TrendDirection};
use crate::congestion::CongestionLevel;
use crate::gas::round2;

/// Pending-count spread beyond which routing to the quieter network is
/// worth suggesting.
const SPREAD_SUGGESTION_FLOOR: u64 = 5_000;

/// Trend is "stable" within this percentage band.
const TREND_BAND_PERCENT: f64 = 10.0;

/// Aggregate surviving snapshots into a comparison. None when every
/// network failed and nothing is left to compare.
pub fn build_comparison(snapshots: Vec<NetworkSnapshot>) -> Option<NetworkComparison> {
    let most = snapshots.iter().max_by_key(|s| s.status.pending)?;
    let least = snapshots.iter().min_by_key(|s| s.status.pending)?;

    let most_congested = most.network.clone();
    let least_congested = least.network.clone();
    let spread = most.status.pending - least.status.pending;

    let average_pending =
        snapshots.iter().map(|s| s.status.pending).sum::<u64>() as f64 / snapshots.len() as f64;
    let total_transactions = snapshots.iter().map(|s| s.status.total).sum();

    let congested_networks: Vec<String> = snapshots
        .iter()
        .filter(|s| s.congestion.level >= CongestionLevel::High)
        .map(|s| s.network.clone())
        .collect();

    let mean_severity =
        snapshots.iter().map(|s| s.congestion.severity).sum::<f64>() / snapshots.len() as f64;

    let mut recommendations = vec![format!(
        "{} has the lightest pool right now ({} pending transactions)",
        least_congested, least.status.pending
    )];
    for snapshot in &snapshots {
        if snapshot.congestion.level >= CongestionLevel::High {
            recommendations.push(format!(
                "Avoid {} if possible — congestion is {}",
                snapshot.network, snapshot.congestion.level
            ));
        }
    }
    if spread > SPREAD_SUGGESTION_FLOOR {
        recommendations.push(format!(
            "Pool depth varies widely between networks; route batched transfers through {}",
            least_congested
        ));
    }
    if mean_severity > 0.7 {
        recommendations
            .push("All monitored networks are busy; expect elevated fees everywhere".to_string());
    } else if mean_severity < 0.3 {
        recommendations
            .push("Fees are low across the board; a good window for batch operations".to_string());
    }

    Some(NetworkComparison {
        most_congested,
        least_congested,
        average_pending: round2(average_pending),
        total_transactions,
        congested_networks,
        recommendations,
        snapshots,
    })
}

/// Compare the current pending count against the average of a recent
/// window. More than ±10% off the average counts as a trend.
pub fn detect_trend(current: &PoolStatus, history: &[PoolStatus]) -> PoolTrend {
    if history.is_empty() {
        return PoolTrend {
            direction: TrendDirection::Stable,
            change_percent: 0.0,
            recommendation: "Not enough history to read a trend".to_string(),
        };
    }

    let window_avg =
        history.iter().map(|s| s.pending).sum::<u64>() as f64 / history.len() as f64;
    let change_percent = if window_avg > 0.0 {
        (current.pending as f64 - window_avg) / window_avg * 100.0
    } else {
        0.0
    };

    let (direction, recommendation) = if change_percent > TREND_BAND_PERCENT {
        (
            TrendDirection::Increasing,
            "Pool is filling up — submit soon or raise the gas tier".to_string(),
        )
    } else if change_percent < -TREND_BAND_PERCENT {
        (
            TrendDirection::Decreasing,
            "Pool is draining — a good moment to submit at standard prices".to_string(),
        )
    } else {
        (
            TrendDirection::Stable,
            "Pool depth is steady; no timing adjustment needed".to_string(),
        )
    };

    PoolTrend {
        direction,
        change_percent: round2(change_percent),
        recommendation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::congestion::classify;
    use crate::gas::recommend;
    use pretty_assertions::assert_eq;

    fn snapshot(network: &str, pending: u64) -> NetworkSnapshot {
        let congestion = classify(pending);
        let gas = recommend(20.0, &congestion);
        NetworkSnapshot {
            network: network.to_string(),
            status: PoolStatus {
                pending,
                queued: 10,
                total: pending + 10,
                timestamp_ms: 0,
                network: network.to_string(),
            },
            congestion,
            base_fee_gwei: 20.0,
            gas,
            last_updated_ms: 0,
        }
    }

    fn status(pending: u64) -> PoolStatus {
        PoolStatus {
            pending,
            queued: 0,
            total: pending,
            timestamp_ms: 0,
            network: "testnet".to_string(),
        }
    }

    #[test]
    fn extremes_and_averages() {
        let cmp = build_comparison(vec![
            snapshot("mainnet", 12_000),
            snapshot("sepolia", 300),
            snapshot("holesky", 3_000),
        ])
        .unwrap();

        assert_eq!(cmp.most_congested, "mainnet");
        assert_eq!(cmp.least_congested, "sepolia");
        assert_eq!(cmp.average_pending, 5_100.0);
        assert_eq!(cmp.total_transactions, 12_010 + 310 + 3_010);
        assert_eq!(cmp.congested_networks, vec!["mainnet".to_string()]);
    }

    #[test]
    fn recommendations_name_the_quiet_network_and_warn_off_busy_ones() {
        let cmp = build_comparison(vec![snapshot("mainnet", 20_000), snapshot("sepolia", 100)])
            .unwrap();

        assert!(cmp.recommendations[0].contains("sepolia"));
        assert!(cmp
            .recommendations
            .iter()
            .any(|r| r.contains("Avoid mainnet")));
        // spread 19_900 > 5_000
        assert!(cmp
            .recommendations
            .iter()
            .any(|r| r.contains("route batched transfers through sepolia")));
    }

    #[test]
    fn quiet_fleet_suggests_batching() {
        let cmp = build_comparison(vec![snapshot("mainnet", 100), snapshot("sepolia", 50)]).unwrap();
        // mean severity 0.2 < 0.3
        assert!(cmp
            .recommendations
            .iter()
            .any(|r| r.contains("good window for batch operations")));
    }

    #[test]
    fn busy_fleet_warns_globally() {
        let cmp =
            build_comparison(vec![snapshot("mainnet", 20_000), snapshot("sepolia", 16_000)])
                .unwrap();
        assert!(cmp
            .recommendations
            .iter()
            .any(|r| r.contains("expect elevated fees everywhere")));
    }

    #[test]
    fn rising_pool_is_flagged() {
        let trend = detect_trend(&status(1_500), &[status(1_000), status(1_000)]);
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert_eq!(trend.change_percent, 50.0);
    }

    #[test]
    fn draining_pool_is_flagged() {
        let trend = detect_trend(&status(500), &[status(1_000)]);
        assert_eq!(trend.direction, TrendDirection::Decreasing);
        assert_eq!(trend.change_percent, -50.0);
    }

    #[test]
    fn small_movements_are_stable() {
        let trend = detect_trend(&status(1_050), &[status(1_000)]);
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert_eq!(trend.change_percent, 5.0);
    }

    #[test]
    fn no_surviving_snapshots_yields_none() {
        assert!(build_comparison(vec![]).is_none());
    }

    #[test]
    fn empty_history_is_stable() {
        let trend = detect_trend(&status(9_999), &[]);
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert_eq!(trend.change_percent, 0.0);
    }
}
