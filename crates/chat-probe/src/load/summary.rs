// Load summary - Aggregates request samples into headline numbers

use super::RequestSample;
use crate::config::LoadThresholds;
use crate::probes::FailureSignal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Latency distribution in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub min: u64,
    pub mean: f64,
    pub p50: u64,
    pub p90: u64,
    pub p95: u64,
    pub p99: u64,
    pub max: u64,
}

impl LatencyStats {
    /// Computes stats over `samples_ms` (order does not matter)
    pub fn from_millis(mut samples_ms: Vec<u64>) -> Self {
        if samples_ms.is_empty() {
            return Self::default();
        }
        samples_ms.sort_unstable();
        let sum: u64 = samples_ms.iter().sum();
        Self {
            min: samples_ms[0],
            mean: sum as f64 / samples_ms.len() as f64,
            p50: percentile(&samples_ms, 50.0),
            p90: percentile(&samples_ms, 90.0),
            p95: percentile(&samples_ms, 95.0),
            p99: percentile(&samples_ms, 99.0),
            max: samples_ms[samples_ms.len() - 1],
        }
    }
}

/// Nearest-rank percentile of a sorted, non-empty slice
pub fn percentile(sorted: &[u64], pct: f64) -> u64 {
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Headline numbers for a load run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub error_rate: f64,
    pub throughput_rps: f64,
    /// Over requests that received a response
    pub latency: LatencyStats,
    pub status_counts: BTreeMap<u16, usize>,
    /// Transport failures by kind (`timeout`, `connect`, `other`)
    pub error_counts: BTreeMap<String, usize>,
}

impl LoadSummary {
    pub fn from_samples(samples: &[RequestSample], elapsed: Duration) -> Self {
        let total = samples.len();
        let succeeded = samples.iter().filter(|s| s.is_success()).count();
        let failed = total - succeeded;

        let mut status_counts = BTreeMap::new();
        let mut error_counts = BTreeMap::new();
        for sample in samples {
            if let Some(status) = sample.status {
                *status_counts.entry(status).or_insert(0) += 1;
            }
            if let Some(error) = &sample.error {
                *error_counts.entry(error.kind.name().to_string()).or_insert(0) += 1;
            }
        }

        let latency = LatencyStats::from_millis(
            samples
                .iter()
                .filter(|s| s.status.is_some())
                .map(|s| s.latency.as_millis() as u64)
                .collect(),
        );

        let secs = elapsed.as_secs_f64();
        Self {
            total,
            succeeded,
            failed,
            error_rate: if total == 0 {
                0.0
            } else {
                failed as f64 / total as f64
            },
            throughput_rps: if secs > 0.0 { total as f64 / secs } else { 0.0 },
            latency,
            status_counts,
            error_counts,
        }
    }

    /// Responses whose status falls in `range`
    pub fn status_in(&self, range: std::ops::RangeInclusive<u16>) -> usize {
        self.status_counts
            .iter()
            .filter(|(code, _)| range.contains(code))
            .map(|(_, n)| n)
            .sum()
    }

    pub fn errors_of(&self, kind: &str) -> usize {
        self.error_counts.get(kind).copied().unwrap_or(0)
    }

    /// Threshold breaches and notable failure classes, as signals
    pub fn evaluate(&self, thresholds: &LoadThresholds) -> Vec<FailureSignal> {
        let mut signals = Vec::new();
        if self.total == 0 {
            return signals;
        }

        if self.error_rate > thresholds.max_error_rate {
            signals.push(FailureSignal::HighErrorRate {
                rate: self.error_rate,
                threshold: thresholds.max_error_rate,
            });
        }
        if self.latency.p95 > thresholds.p95_ms {
            signals.push(FailureSignal::LatencyBreach {
                p95_ms: self.latency.p95,
                threshold_ms: thresholds.p95_ms,
            });
        }

        let limited = self.status_in(429..=429);
        if limited > 0 {
            signals.push(FailureSignal::RateLimited { count: limited });
        }
        let server = self.status_in(500..=599);
        if server > 0 {
            signals.push(FailureSignal::ServerErrors { count: server });
        }
        let timeouts = self.errors_of("timeout");
        if timeouts > 0 {
            signals.push(FailureSignal::RequestTimeouts { count: timeouts });
        }
        let connect = self.errors_of("connect");
        if connect > 0 {
            signals.push(FailureSignal::ConnectionErrors { count: connect });
        }

        signals
    }
}
