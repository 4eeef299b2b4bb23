//! Gas-price tier recommendations.
//!
//! Four named tiers over the current base fee, with the multiplier table
//! keyed off the congestion severity band. The fallback base fee flows
//! through unchanged, so recommendations still compute when the node
//! hides EIP-1559 fee data.

use crate::congestion::CongestionAssessment;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct GasTier {
    pub price_gwei: f64,
    pub expected_confirmation: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct GasTierSet {
    pub slow: GasTier,
    pub standard: GasTier,
    pub fast: GasTier,
    pub rapid: GasTier,
}

struct Multipliers {
    slow: f64,
    standard: f64,
    fast: f64,
    rapid: f64,
}

const BASE_MULTIPLIERS: Multipliers = Multipliers {
    slow: 1.0,
    standard: 1.1,
    fast: 1.25,
    rapid: 1.5,
};

/// Applied when severity is in (0.4, 0.7].
const MODERATE_MULTIPLIERS: Multipliers = Multipliers {
    slow: 1.0,
    standard: 1.15,
    fast: 1.35,
    rapid: 1.7,
};

/// Applied when severity exceeds 0.7.
const HIGH_MULTIPLIERS: Multipliers = Multipliers {
    slow: 1.0,
    standard: 1.2,
    fast: 1.5,
    rapid: 2.0,
};

pub fn recommend(base_fee_gwei: f64, assessment: &CongestionAssessment) -> GasTierSet {
    let m = if assessment.severity > 0.7 {
        &HIGH_MULTIPLIERS
    } else if assessment.severity > 0.4 {
        &MODERATE_MULTIPLIERS
    } else {
        &BASE_MULTIPLIERS
    };

    GasTierSet {
        slow: GasTier {
            price_gwei: round2(base_fee_gwei * m.slow),
            expected_confirmation: "5-10 minutes",
            description: "Cheapest option for non-urgent transfers",
            icon: "🐢",
        },
        standard: GasTier {
            price_gwei: round2(base_fee_gwei * m.standard),
            expected_confirmation: "1-3 minutes",
            description: "Reasonable price for everyday transactions",
            icon: "🚶",
        },
        fast: GasTier {
            price_gwei: round2(base_fee_gwei * m.fast),
            expected_confirmation: "30-60 seconds",
            description: "Priority inclusion for time-sensitive transactions",
            icon: "🚗",
        },
        rapid: GasTier {
            price_gwei: round2(base_fee_gwei * m.rapid),
            expected_confirmation: "under 30 seconds",
            description: "Near-immediate inclusion at a premium",
            icon: "🚀",
        },
    }
}

/// Single price targeting inclusion within `target_blocks`, scaled by how
/// backed up the pool is.
pub fn optimal_gas_price(base_fee_gwei: f64, severity: f64, target_blocks: u32) -> f64 {
    let speed = if target_blocks <= 1 {
        1.5
    } else if target_blocks <= 3 {
        1.25
    } else if target_blocks <= 5 {
        1.1
    } else {
        1.0
    };

    round2(base_fee_gwei * speed * (1.0 + severity * 0.5))
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
