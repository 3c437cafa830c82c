//! Per-operation call counters and coarse latency histograms. Lock-free so
//! hot read paths never contend with the per-student write locks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::types::Operation;

const LATENCY_BUCKETS_US: [u64; 5] = [50, 250, 1_000, 5_000, u64::MAX];
const BUCKET_MIDPOINTS_US: [f64; 5] = [25.0, 150.0, 600.0, 3_000.0, 8_000.0];

const ALL_OPERATIONS: [Operation; 6] = [
    Operation::DecayedStrength,
    Operation::PredictCorrectness,
    Operation::RecordAttempt,
    Operation::RecommendSkills,
    Operation::SelectQuestion,
    Operation::AnalyzePerformance,
];

#[derive(Default)]
pub struct OperationMetrics {
    pub call_count: AtomicU64,
    pub error_count: AtomicU64,
    pub total_latency_us: AtomicU64,
    pub last_called_at_ms: AtomicI64,
    latency_buckets: [AtomicU64; 5],
}

impl OperationMetrics {
    fn observe(&self, latency_us: u64, is_error: bool, now_ms: i64) {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us.fetch_add(latency_us, Ordering::Relaxed);
        if is_error {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        self.last_called_at_ms.store(now_ms, Ordering::Relaxed);
        for (idx, &threshold) in LATENCY_BUCKETS_US.iter().enumerate() {
            if latency_us <= threshold {
                self.latency_buckets[idx].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
    }

    /// (p50, p95, p99) estimated from bucket midpoints.
    pub fn latency_percentiles(&self) -> (f64, f64, f64) {
        let counts: Vec<u64> = self
            .latency_buckets
            .iter()
            .map(|bucket| bucket.load(Ordering::Relaxed))
            .collect();
        let total: u64 = counts.iter().sum();
        if total == 0 {
            return (0.0, 0.0, 0.0);
        }

        let percentile = |pct: f64| -> f64 {
            let target = (pct / 100.0 * total as f64).ceil() as u64;
            let mut cumulative = 0u64;
            for (idx, &count) in counts.iter().enumerate() {
                cumulative += count;
                if cumulative >= target {
                    return BUCKET_MIDPOINTS_US[idx];
                }
            }
            BUCKET_MIDPOINTS_US[BUCKET_MIDPOINTS_US.len() - 1]
        };

        (percentile(50.0), percentile(95.0), percentile(99.0))
    }
}

pub struct MetricsRegistry {
    metrics: HashMap<Operation, OperationMetrics>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let mut metrics = HashMap::new();
        for op in ALL_OPERATIONS {
            metrics.insert(op, OperationMetrics::default());
        }
        Self { metrics }
    }

    pub fn record_call(&self, op: Operation, latency_us: u64, is_error: bool) {
        if let Some(metric) = self.metrics.get(&op) {
            metric.observe(latency_us, is_error, chrono::Utc::now().timestamp_millis());
        }
    }

    pub fn operation(&self, op: Operation) -> Option<&OperationMetrics> {
        self.metrics.get(&op)
    }

    pub fn snapshot(&self) -> HashMap<String, MetricsSnapshot> {
        self.metrics
            .iter()
            .map(|(op, metric)| {
                let (p50, p95, p99) = metric.latency_percentiles();
                (
                    op.as_str().to_string(),
                    MetricsSnapshot {
                        call_count: metric.call_count.load(Ordering::Relaxed),
                        error_count: metric.error_count.load(Ordering::Relaxed),
                        total_latency_us: metric.total_latency_us.load(Ordering::Relaxed),
                        p50_us: p50,
                        p95_us: p95,
                        p99_us: p99,
                    },
                )
            })
            .collect()
    }

    pub fn reset(&self) {
        for metric in self.metrics.values() {
            metric.call_count.store(0, Ordering::Relaxed);
            metric.error_count.store(0, Ordering::Relaxed);
            metric.total_latency_us.store(0, Ordering::Relaxed);
            metric.last_called_at_ms.store(0, Ordering::Relaxed);
            for bucket in &metric.latency_buckets {
                bucket.store(0, Ordering::Relaxed);
            }
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub call_count: u64,
    pub error_count: u64,
    pub total_latency_us: u64,
    pub p50_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_and_errors() {
        let registry = MetricsRegistry::new();
        registry.record_call(Operation::RecordAttempt, 120, false);
        registry.record_call(Operation::RecordAttempt, 80, true);

        let metric = registry.operation(Operation::RecordAttempt).unwrap();
        assert_eq!(metric.call_count.load(Ordering::Relaxed), 2);
        assert_eq!(metric.error_count.load(Ordering::Relaxed), 1);
        assert_eq!(metric.total_latency_us.load(Ordering::Relaxed), 200);
    }

    #[test]
    fn percentiles_follow_bucket_midpoints() {
        let registry = MetricsRegistry::new();
        for _ in 0..99 {
            registry.record_call(Operation::RecommendSkills, 30, false);
        }
        registry.record_call(Operation::RecommendSkills, 20_000, false);

        let metric = registry.operation(Operation::RecommendSkills).unwrap();
        let (p50, _, p99) = metric.latency_percentiles();
        assert_eq!(p50, 25.0);
        assert_eq!(p99, 25.0);
    }

    #[test]
    fn reset_clears_everything() {
        let registry = MetricsRegistry::new();
        registry.record_call(Operation::SelectQuestion, 500, false);
        registry.reset();
        let snapshot = registry.snapshot();
        assert_eq!(snapshot["select_question"].call_count, 0);
    }
}
