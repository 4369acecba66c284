//! In-process metrics for scoring latency and verdict distribution.

use crate::types::result::{Decision, RiskLevel, ScoringResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::info;

const MAX_SAMPLES: usize = 10_000;
const MAX_COMPONENT_SAMPLES: usize = 1_000;

/// Metrics collector shared by concurrent scoring calls
pub struct ScoringMetrics {
    /// Total requests scored
    pub requests_scored: AtomicU64,
    /// Requests rejected by validation
    pub requests_rejected: AtomicU64,
    /// Network lookups replaced by the safe default
    pub lookup_fallbacks: AtomicU64,
    /// Fail-safe verdicts after an internal failure
    pub fail_safe_results: AtomicU64,
    decisions: RwLock<HashMap<Decision, u64>>,
    risk_levels: RwLock<HashMap<RiskLevel, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Per-component times (in microseconds)
    component_times: RwLock<HashMap<&'static str, Vec<u64>>>,
    /// Risk score distribution buckets (0-10, 10-20, ... 90-100)
    score_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScoringMetrics {
    pub fn new() -> Self {
        Self {
            requests_scored: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            lookup_fallbacks: AtomicU64::new(0),
            fail_safe_results: AtomicU64::new(0),
            decisions: RwLock::new(HashMap::new()),
            risk_levels: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            component_times: RwLock::new(HashMap::new()),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a completed scoring call
    pub fn record_result(&self, processing_time: Duration, result: &ScoringResult) {
        self.requests_scored.fetch_add(1, Ordering::Relaxed);

        {
            let mut times = write(&self.processing_times);
            times.push(processing_time.as_micros() as u64);
            if times.len() > MAX_SAMPLES {
                times.drain(0..MAX_SAMPLES / 2);
            }
        }

        *write(&self.decisions).entry(result.decision).or_insert(0) += 1;
        *write(&self.risk_levels).entry(result.risk_level).or_insert(0) += 1;

        let bucket = ((result.risk_score / 10.0).max(0.0) as usize).min(9);
        write(&self.score_buckets)[bucket] += 1;
    }

    pub fn record_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lookup_fallback(&self) {
        self.lookup_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fail_safe(&self) {
        self.fail_safe_results.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the time spent in one engine component
    pub fn record_component_time(&self, component: &'static str, duration: Duration) {
        let mut times = write(&self.component_times);
        let samples = times.entry(component).or_default();
        samples.push(duration.as_micros() as u64);
        if samples.len() > MAX_COMPONENT_SAMPLES {
            samples.drain(0..MAX_COMPONENT_SAMPLES / 2);
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let mut sorted = read(&self.processing_times).clone();
        if sorted.is_empty() {
            return ProcessingStats::default();
        }
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[percentile_index(count, 0.95)],
            p99_us: sorted[percentile_index(count, 0.99)],
            max_us: sorted[count - 1],
        }
    }

    /// Get per-component timing stats
    pub fn get_component_stats(&self) -> HashMap<&'static str, ComponentStats> {
        read(&self.component_times)
            .iter()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(component, samples)| {
                let mut sorted = samples.clone();
                sorted.sort_unstable();
                let count = sorted.len();
                (
                    *component,
                    ComponentStats {
                        calls: count as u64,
                        mean_us: sorted.iter().sum::<u64>() / count as u64,
                        p50_us: sorted[count / 2],
                        p99_us: sorted[percentile_index(count, 0.99)],
                    },
                )
            })
            .collect()
    }

    /// Get current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_score_distribution(&self) -> [u64; 10] {
        *read(&self.score_buckets)
    }

    pub fn get_decisions(&self) -> HashMap<Decision, u64> {
        read(&self.decisions).clone()
    }

    pub fn get_risk_levels(&self) -> HashMap<RiskLevel, u64> {
        read(&self.risk_levels).clone()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let scored = self.requests_scored.load(Ordering::Relaxed);
        let processing = self.get_processing_stats();
        let decisions = self.get_decisions();
        let score_dist = self.get_score_distribution();

        info!("==================== RISK SCORING METRICS ====================");
        info!(
            "Scored: {:>8}  Rejected: {:>6}  Throughput: {:>7.1} req/s",
            scored,
            self.requests_rejected.load(Ordering::Relaxed),
            self.get_throughput()
        );
        info!(
            "Lookup fallbacks: {:>6}  Fail-safe verdicts: {:>6}",
            self.lookup_fallbacks.load(Ordering::Relaxed),
            self.fail_safe_results.load(Ordering::Relaxed)
        );
        info!(
            "Processing (us): mean={} p50={} p95={} p99={} max={}",
            processing.mean_us,
            processing.p50_us,
            processing.p95_us,
            processing.p99_us,
            processing.max_us
        );

        for decision in [Decision::Approve, Decision::Review, Decision::Block] {
            let count = decisions.get(&decision).copied().unwrap_or(0);
            let pct = if scored > 0 {
                count as f64 / scored as f64 * 100.0
            } else {
                0.0
            };
            info!("  {:8}: {:>8} ({:>5.1}%)", decision.as_str(), count, pct);
        }

        let total: u64 = score_dist.iter().sum();
        for (i, &count) in score_dist.iter().enumerate() {
            let pct = if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            let bar = "#".repeat(((pct / 2.0) as usize).min(20));
            info!("  {:>3}-{:<3}: {:>6} ({:>5.1}%) {}", i * 10, (i + 1) * 10, count, pct, bar);
        }

        for (component, stats) in self.get_component_stats() {
            info!(
                "  {}: mean={}us p50={}us p99={}us (calls={})",
                component, stats.mean_us, stats.p50_us, stats.p99_us, stats.calls
            );
        }
    }
}

impl Default for ScoringMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn percentile_index(count: usize, quantile: f64) -> usize {
    ((count as f64 * quantile) as usize).min(count - 1)
}

/// Processing time statistics
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Component timing statistics
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentStats {
    pub calls: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
}

/// Periodic metrics summary printer
pub struct MetricsReporter {
    metrics: Arc<ScoringMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ScoringMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
