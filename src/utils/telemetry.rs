//! Scoring telemetry
//!
//! In-memory counters for the stats endpoint. Only tier counts and
//! latency are kept; no client data or individual predictions are stored.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::types::RiskTier;

/// Aggregated statistics snapshot
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct TelemetryStats {
    /// Total clients scored
    pub total_scored: u64,
    /// Scores per tier label
    pub by_tier: BTreeMap<String, u64>,
    /// Average scoring latency (ms)
    pub avg_latency_ms: f64,
    /// Requests refused because artifacts are missing
    pub refused_unconfigured: u64,
}

/// Lock-free counters shared across request handlers
#[derive(Debug, Default)]
pub struct TelemetryCollector {
    total_scored: AtomicU64,
    per_tier: [AtomicU64; 4],
    total_latency_us: AtomicU64,
    refused_unconfigured: AtomicU64,
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn tier_slot(tier: RiskTier) -> usize {
        match tier {
            RiskTier::Low => 0,
            RiskTier::Moderate => 1,
            RiskTier::High => 2,
            RiskTier::Critical => 3,
        }
    }

    /// Record one completed scoring
    pub fn record_score(&self, tier: RiskTier, latency_us: u64) {
        self.total_scored.fetch_add(1, Ordering::Relaxed);
        self.per_tier[Self::tier_slot(tier)].fetch_add(1, Ordering::Relaxed);
        self.total_latency_us.fetch_add(latency_us, Ordering::Relaxed);
    }

    /// Record a request refused for missing artifacts
    pub fn record_refused(&self) {
        self.refused_unconfigured.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> TelemetryStats {
        let total_scored = self.total_scored.load(Ordering::Relaxed);
        let total_latency_us = self.total_latency_us.load(Ordering::Relaxed);

        let by_tier = RiskTier::ALL
            .iter()
            .map(|tier| {
                let count = self.per_tier[Self::tier_slot(*tier)].load(Ordering::Relaxed);
                (tier.as_str().to_string(), count)
            })
            .collect();

        let avg_latency_ms = if total_scored > 0 {
            total_latency_us as f64 / total_scored as f64 / 1000.0
        } else {
            0.0
        };

        TelemetryStats {
            total_scored,
            by_tier,
            avg_latency_ms,
            refused_unconfigured: self.refused_unconfigured.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let telemetry = TelemetryCollector::new();
        telemetry.record_score(RiskTier::Low, 1000);
        telemetry.record_score(RiskTier::Low, 3000);
        telemetry.record_score(RiskTier::Critical, 2000);
        telemetry.record_refused();

        let stats = telemetry.get_stats();
        assert_eq!(stats.total_scored, 3);
        assert_eq!(stats.by_tier["Low"], 2);
        assert_eq!(stats.by_tier["Moderate"], 0);
        assert_eq!(stats.by_tier["Critical"], 1);
        assert!((stats.avg_latency_ms - 2.0).abs() < 1e-9);
        assert_eq!(stats.refused_unconfigured, 1);
    }

    #[test]
    fn test_empty_stats() {
        let stats = TelemetryCollector::new().get_stats();
        assert_eq!(stats.total_scored, 0);
        assert_eq!(stats.avg_latency_ms, 0.0);
        assert_eq!(stats.by_tier.len(), 4);
    }
}
