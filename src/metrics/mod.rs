//! Lock-free counters for search traffic and engine HTTP calls.
//!
//! Clones share the same counters, so one `Metrics` can be handed to the
//! service and to every engine client it builds.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    searches_total: AtomicU64,
    search_failures_total: AtomicU64,
    search_timeouts_total: AtomicU64,
    search_duration_total_ms: AtomicU64,
    engine_requests_total: AtomicU64,
    engine_errors_total: AtomicU64,
    engine_duration_total_ms: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed search, successful or not.
    pub fn record_search(&self, duration: Duration) {
        self.inner.searches_total.fetch_add(1, Ordering::Relaxed);
        self.inner
            .search_duration_total_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    /// Record a search that degraded to an empty result.
    pub fn record_search_failure(&self) {
        self.inner.search_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_search_timeout(&self) {
        self.inner.search_timeouts_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an engine HTTP request with duration.
    pub fn record_engine_request(&self, duration: Duration) {
        self.inner.engine_requests_total.fetch_add(1, Ordering::Relaxed);
        self.inner
            .engine_duration_total_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_engine_error(&self) {
        self.inner.engine_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn searches_total(&self) -> u64 {
        self.inner.searches_total.load(Ordering::Relaxed)
    }

    pub fn search_failures_total(&self) -> u64 {
        self.inner.search_failures_total.load(Ordering::Relaxed)
    }

    pub fn search_timeouts_total(&self) -> u64 {
        self.inner.search_timeouts_total.load(Ordering::Relaxed)
    }

    pub fn engine_requests_total(&self) -> u64 {
        self.inner.engine_requests_total.load(Ordering::Relaxed)
    }

    pub fn engine_errors_total(&self) -> u64 {
        self.inner.engine_errors_total.load(Ordering::Relaxed)
    }

    /// Average search duration in milliseconds.
    pub fn search_duration_avg_ms(&self) -> f64 {
        average(
            self.inner.search_duration_total_ms.load(Ordering::Relaxed),
            self.searches_total(),
        )
    }

    /// Average engine request duration in milliseconds.
    pub fn engine_duration_avg_ms(&self) -> f64 {
        average(
            self.inner.engine_duration_total_ms.load(Ordering::Relaxed),
            self.engine_requests_total(),
        )
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        let c = &self.inner;
        for counter in [
            &c.searches_total,
            &c.search_failures_total,
            &c.search_timeouts_total,
            &c.search_duration_total_ms,
            &c.engine_requests_total,
            &c.engine_errors_total,
            &c.engine_duration_total_ms,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Get a summary of all metrics.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            searches_total: self.searches_total(),
            search_failures_total: self.search_failures_total(),
            search_timeouts_total: self.search_timeouts_total(),
            search_duration_avg_ms: self.search_duration_avg_ms(),
            engine_requests_total: self.engine_requests_total(),
            engine_errors_total: self.engine_errors_total(),
            engine_duration_avg_ms: self.engine_duration_avg_ms(),
        }
    }
}

fn average(total_ms: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total_ms as f64 / count as f64
    }
}

/// A snapshot of metrics values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub searches_total: u64,
    pub search_failures_total: u64,
    pub search_timeouts_total: u64,
    pub search_duration_avg_ms: f64,
    pub engine_requests_total: u64,
    pub engine_errors_total: u64,
    pub engine_duration_avg_ms: f64,
}

/// Times one engine request.
pub struct EngineTimer {
    start: Instant,
    metrics: Metrics,
}

impl EngineTimer {
    pub fn new(metrics: Metrics) -> Self {
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    pub fn complete(self) {
        self.metrics.record_engine_request(self.start.elapsed());
    }

    pub fn complete_with_error(self) {
        self.metrics.record_engine_request(self.start.elapsed());
        self.metrics.record_engine_error();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert_eq!(metrics.searches_total(), 0);
        assert_eq!(metrics.engine_requests_total(), 0);
        assert_eq!(metrics.search_duration_avg_ms(), 0.0);
    }

    #[test]
    fn test_record_search() {
        let metrics = Metrics::new();
        metrics.record_search(Duration::from_millis(100));
        metrics.record_search(Duration::from_millis(200));
        metrics.record_search_failure();
        metrics.record_search_timeout();

        assert_eq!(metrics.searches_total(), 2);
        assert_eq!(metrics.search_failures_total(), 1);
        assert_eq!(metrics.search_timeouts_total(), 1);
        assert_eq!(metrics.search_duration_avg_ms(), 150.0);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = Metrics::new();
        let clone = metrics.clone();
        clone.record_engine_error();
        assert_eq!(metrics.engine_errors_total(), 1);
    }

    #[test]
    fn test_engine_timer() {
        let metrics = Metrics::new();
        let timer = EngineTimer::new(metrics.clone());
        thread::sleep(Duration::from_millis(5));
        timer.complete_with_error();

        assert_eq!(metrics.engine_requests_total(), 1);
        assert_eq!(metrics.engine_errors_total(), 1);
        assert!(metrics.engine_duration_avg_ms() >= 5.0);
    }

    #[test]
    fn test_reset() {
        let metrics = Metrics::new();
        metrics.record_search(Duration::from_millis(10));
        metrics.record_engine_request(Duration::from_millis(10));
        metrics.reset();
        assert_eq!(metrics.summary().searches_total, 0);
        assert_eq!(metrics.summary().engine_requests_total, 0);
    }
}
