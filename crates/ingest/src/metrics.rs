//! Ingest path metrics.
//!
//! Counters and latency histograms for the scan-to-write path. All
//! operations are atomic; components record through `Arc<IngestMetrics>`
//! and reporters read via `snapshot()`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Histogram bucket boundaries, supplied by the embedding process.
#[derive(Debug, Clone)]
pub struct LatencyBuckets {
    /// Upper bounds for `write.latency` (completion minus receipt).
    pub write_latency: Vec<Duration>,

    /// Upper bounds for `ingest.latency` (completion minus the metric's own
    /// timestamp). Wider than write latency: it measures metric age, which
    /// can legitimately span hours for backfills.
    pub ingest_latency: Vec<Duration>,
}

impl Default for LatencyBuckets {
    fn default() -> Self {
        Self {
            write_latency: default_write_latency_buckets(),
            ingest_latency: default_ingest_latency_buckets(),
        }
    }
}

/// Default write-latency ladder: 1ms to 60s.
pub fn default_write_latency_buckets() -> Vec<Duration> {
    [1, 2, 5, 10, 20, 50, 100, 200, 500, 1_000, 2_000, 5_000, 10_000, 30_000, 60_000]
        .into_iter()
        .map(Duration::from_millis)
        .collect()
}

/// Default ingest-latency ladder: 100ms to 12h.
pub fn default_ingest_latency_buckets() -> Vec<Duration> {
    [
        0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0, 1_800.0, 3_600.0, 14_400.0,
        43_200.0,
    ]
    .into_iter()
    .map(Duration::from_secs_f64)
    .collect()
}

/// Fixed-bucket atomic histogram.
///
/// Values at or above the last boundary land in the overflow bucket, so
/// there are `boundaries.len() + 1` buckets in total.
#[derive(Debug)]
pub struct DurationHistogram {
    boundaries: Vec<Duration>,
    buckets: Vec<AtomicU64>,
}

impl DurationHistogram {
    pub fn new(mut boundaries: Vec<Duration>) -> Self {
        boundaries.sort_unstable();
        boundaries.dedup();
        let buckets = (0..=boundaries.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            boundaries,
            buckets,
        }
    }

    /// Record one observation.
    #[inline]
    pub fn record(&self, value: Duration) {
        let index = self.boundaries.partition_point(|bound| *bound <= value);
        self.buckets[index].fetch_add(1, Ordering::Relaxed);
    }

    /// Total observations recorded.
    pub fn count(&self) -> u64 {
        self.buckets
            .iter()
            .map(|bucket| bucket.load(Ordering::Relaxed))
            .sum()
    }

    /// Current per-bucket counts. The final entry is the overflow bucket.
    pub fn snapshot(&self) -> Vec<u64> {
        self.buckets
            .iter()
            .map(|bucket| bucket.load(Ordering::Relaxed))
            .collect()
    }

    /// Bucket upper bounds. The overflow bucket is unbounded.
    pub fn boundaries(&self) -> &[Duration] {
        &self.boundaries
    }
}

/// Counters and histograms for the carbon ingest path.
#[derive(Debug)]
pub struct IngestMetrics {
    /// Metrics fully written under at least one rule.
    pub success: AtomicU64,

    /// Metrics dropped because a downstream write failed.
    pub errors: AtomicU64,

    /// Unparseable lines and names.
    pub malformed: AtomicU64,

    /// Completion minus receipt.
    pub write_latency: DurationHistogram,

    /// Completion minus the metric's own timestamp.
    pub ingest_latency: DurationHistogram,
}

impl IngestMetrics {
    pub fn new(buckets: LatencyBuckets) -> Self {
        Self {
            success: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            write_latency: DurationHistogram::new(buckets.write_latency),
            ingest_latency: DurationHistogram::new(buckets.ingest_latency),
        }
    }

    #[inline]
    pub fn record_success(&self) {
        self.success.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_malformed(&self, count: u64) {
        if count > 0 {
            self.malformed.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Point-in-time snapshot of the counters.
    pub fn snapshot(&self) -> IngestSnapshot {
        IngestSnapshot {
            success: self.success.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            writes_recorded: self.write_latency.count(),
        }
    }
}

impl Default for IngestMetrics {
    fn default() -> Self {
        Self::new(LatencyBuckets::default())
    }
}

/// Point-in-time snapshot of ingest counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestSnapshot {
    pub success: u64,
    pub errors: u64,
    pub malformed: u64,
    pub writes_recorded: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_bucket_assignment() {
        let hist = DurationHistogram::new(vec![
            Duration::from_millis(10),
            Duration::from_millis(100),
        ]);

        hist.record(Duration::from_millis(5)); // bucket 0
        hist.record(Duration::from_millis(10)); // bucket 1 (bounds are exclusive)
        hist.record(Duration::from_millis(50)); // bucket 1
        hist.record(Duration::from_millis(100)); // overflow
        hist.record(Duration::from_secs(10)); // overflow

        assert_eq!(hist.snapshot(), vec![1, 2, 2]);
        assert_eq!(hist.count(), 5);
    }

    #[test]
    fn test_histogram_sorts_boundaries() {
        let hist = DurationHistogram::new(vec![
            Duration::from_secs(10),
            Duration::from_secs(1),
            Duration::from_secs(1),
        ]);
        assert_eq!(
            hist.boundaries(),
            &[Duration::from_secs(1), Duration::from_secs(10)]
        );
        assert_eq!(hist.snapshot().len(), 3);
    }

    #[test]
    fn test_counters_and_snapshot() {
        let metrics = IngestMetrics::default();
        metrics.record_success();
        metrics.record_success();
        metrics.record_error();
        metrics.record_malformed(3);
        metrics.record_malformed(0);

        let snap = metrics.snapshot();
        assert_eq!(snap.success, 2);
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.malformed, 3);
        assert_eq!(snap.writes_recorded, 0);
    }

    #[test]
    fn test_default_ladders_are_sorted() {
        for ladder in [default_write_latency_buckets(), default_ingest_latency_buckets()] {
            let mut sorted = ladder.clone();
            sorted.sort();
            assert_eq!(ladder, sorted);
        }
    }
}
