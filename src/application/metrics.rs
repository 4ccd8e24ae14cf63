//! Observability metrics for the registry.
//!
//! Lifetime totals that are independent of the sliding windows: they keep
//! growing after buckets are evicted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking registry activity.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Total number of events registered since construction
    events_registered: AtomicU64,
    /// Number of cleanup passes that scanned a non-empty store
    cleanup_runs: AtomicU64,
    /// Total number of buckets removed by cleanup
    buckets_evicted: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                events_registered: AtomicU64::new(0),
                cleanup_runs: AtomicU64::new(0),
                buckets_evicted: AtomicU64::new(0),
            }),
        }
    }

    /// Record a registered event.
    pub(crate) fn record_registered(&self) {
        self.inner.events_registered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cleanup pass that removed `evicted` buckets.
    pub(crate) fn record_cleanup(&self, evicted: usize) {
        self.inner.cleanup_runs.fetch_add(1, Ordering::Relaxed);
        self.inner
            .buckets_evicted
            .fetch_add(evicted as u64, Ordering::Relaxed);
    }

    /// Get the total number of events registered.
    pub fn events_registered(&self) -> u64 {
        self.inner.events_registered.load(Ordering::Relaxed)
    }

    /// Get the number of cleanup passes over a non-empty store.
    pub fn cleanup_runs(&self) -> u64 {
        self.inner.cleanup_runs.load(Ordering::Relaxed)
    }

    /// Get the total number of evicted buckets.
    pub fn buckets_evicted(&self) -> u64 {
        self.inner.buckets_evicted.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_registered: self.events_registered(),
            cleanup_runs: self.cleanup_runs(),
            buckets_evicted: self.buckets_evicted(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Total number of events registered since construction
    pub events_registered: u64,
    /// Number of cleanup passes that scanned a non-empty store
    pub cleanup_runs: u64,
    /// Total number of buckets removed by cleanup
    pub buckets_evicted: u64,
}
