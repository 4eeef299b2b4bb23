//! Congestion classification over pending-pool depth.
//!
//! Pure functions: the same pending count always yields the same
//! assessment. Thresholds and the per-level policy text are fixed:
//! the descriptions and recommendations are user-facing copy, not
//! derived values.

use crate::config::{AVG_BLOCK_TIME_SECS, AVG_TX_PER_BLOCK};
use serde::Serialize;
use std::fmt;

/// Pending-count floor of each band above `Low`.
const MODERATE_FLOOR: u64 = 1_000;
const HIGH_FLOOR: u64 = 5_000;
const EXTREME_FLOOR: u64 = 15_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionLevel {
    Low,
    Moderate,
    High,
    Extreme,
}

impl fmt::Display for CongestionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CongestionLevel::Low => write!(f, "low"),
            CongestionLevel::Moderate => write!(f, "moderate"),
            CongestionLevel::High => write!(f, "high"),
            CongestionLevel::Extreme => write!(f, "extreme"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CongestionAssessment {
    pub level: CongestionLevel,
    /// Normalized [0, 1] score driving gas multiplier selection
    pub severity: f64,
    pub description: &'static str,
    pub color: &'static str,
    pub recommendations: Vec<&'static str>,
    pub estimated_confirmation: String,
}

pub fn classify(pending: u64) -> CongestionAssessment {
    let (level, severity, description, color, recommendations) = if pending < MODERATE_FLOOR {
        (
            CongestionLevel::Low,
            0.2,
            "Network is quiet — transactions confirm quickly",
            "green",
            vec![
                "Standard gas prices should confirm within a block or two",
                "Good window for large or non-urgent transfers",
            ],
        )
    } else if pending < HIGH_FLOOR {
        (
            CongestionLevel::Moderate,
            0.5,
            "Network is moderately busy",
            "yellow",
            vec![
                "Add a small gas premium for time-sensitive transactions",
                "Batch non-urgent transfers to save on fees",
            ],
        )
    } else if pending < EXTREME_FLOOR {
        (
            CongestionLevel::High,
            0.8,
            "Network is congested — expect delays at standard prices",
            "orange",
            vec![
                "Use the fast or rapid tier for time-sensitive transactions",
                "Consider delaying non-urgent transfers",
                "Watch the pool before submitting large batches",
            ],
        )
    } else {
        (
            CongestionLevel::Extreme,
            1.0,
            "Network is severely congested",
            "red",
            vec![
                "Only submit urgent transactions",
                "Expect long confirmation delays even at high gas prices",
                "Wait for congestion to subside if at all possible",
            ],
        )
    };

    CongestionAssessment {
        level,
        severity,
        description,
        color,
        recommendations,
        estimated_confirmation: estimate_confirmation(pending),
    }
}

/// Estimate how long a standard-priced transaction waits for inclusion.
pub fn estimate_confirmation(pending: u64) -> String {
    let blocks_to_wait = (pending as f64 / AVG_TX_PER_BLOCK).max(1.0);
    format_wait(blocks_to_wait * AVG_BLOCK_TIME_SECS)
}

fn format_wait(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.0} seconds", secs)
    } else if secs < 3600.0 {
        format!("{:.1} minutes", secs / 60.0)
    } else {
        format!("{:.1} hours", secs / 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bands_are_exact_at_the_boundaries() {
        assert_eq!(classify(0).level, CongestionLevel::Low);
        assert_eq!(classify(999).level, CongestionLevel::Low);
        assert_eq!(classify(1_000).level, CongestionLevel::Moderate);
        assert_eq!(classify(4_999).level, CongestionLevel::Moderate);
        assert_eq!(classify(5_000).level, CongestionLevel::High);
        assert_eq!(classify(14_999).level, CongestionLevel::High);
        assert_eq!(classify(15_000).level, CongestionLevel::Extreme);
    }

    #[test]
    fn whole_low_band_is_low() {
        for pending in 0..1_000 {
            assert_eq!(classify(pending).level, CongestionLevel::Low);
        }
    }

    #[test]
    fn severity_tracks_level() {
        assert_eq!(classify(500).severity, 0.2);
        assert_eq!(classify(2_000).severity, 0.5);
        assert_eq!(classify(10_000).severity, 0.8);
        assert_eq!(classify(20_000).severity, 1.0);
    }

    #[test]
    fn quiet_pool_estimate_is_in_seconds() {
        // 500 pending / 250 per block = 2 blocks = 24s
        let assessment = classify(500);
        assert_eq!(assessment.level, CongestionLevel::Low);
        assert_eq!(assessment.estimated_confirmation, "24 seconds");
    }

    #[test]
    fn deep_pool_estimate_switches_units() {
        // 20000 / 250 = 80 blocks = 960s = 16 minutes
        assert_eq!(classify(20_000).estimated_confirmation, "16.0 minutes");
        // 100000 / 250 = 400 blocks = 4800s = 1.3 hours
        assert_eq!(classify(100_000).estimated_confirmation, "1.3 hours");
    }

    #[test]
    fn floor_of_one_block_applies_to_an_empty_pool() {
        assert_eq!(classify(0).estimated_confirmation, "12 seconds");
    }

    #[test]
    fn classification_is_idempotent() {
        let a = classify(7_500);
        let b = classify(7_500);
        assert_eq!(a.level, b.level);
        assert_eq!(a.severity, b.severity);
        assert_eq!(a.estimated_confirmation, b.estimated_confirmation);
    }

    #[test]
    fn levels_are_ordered() {
        assert!(CongestionLevel::Low < CongestionLevel::Moderate);
        assert!(CongestionLevel::Moderate < CongestionLevel::High);
        assert!(CongestionLevel::High < CongestionLevel::Extreme);
    }
}
