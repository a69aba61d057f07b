//! Cache statistics and metrics tracking
//!
//! Counters are recorded with relaxed atomics so the parallel refresh path
//! and readers on other threads never contend on a lock just to count.

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of locally owned entries
    pub size: usize,

    /// Lookups answered by an existing entry
    pub hits: u64,

    /// Lookups that found nothing (including ones that went on to create)
    pub misses: u64,

    /// Entries created by a factory
    pub creations: u64,

    /// Factory invocations that failed and left no entry behind
    pub failed_creations: u64,

    /// Successful per-entry refreshes
    pub refreshes: u64,

    /// Per-entry refreshes that failed and kept the last-good snapshot
    pub refresh_failures: u64,

    /// Number of clear operations
    pub clears: u64,
}

impl CacheStats {
    /// Calculate hit rate (hits / total accesses)
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_accesses();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Total number of lookups (hits + misses)
    #[must_use]
    pub const fn total_accesses(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Thread-safe metrics collector for cache operations
#[derive(Debug, Default)]
pub(crate) struct MetricsCollector {
    hits: AtomicU64,
    misses: AtomicU64,
    creations: AtomicU64,
    failed_creations: AtomicU64,
    refreshes: AtomicU64,
    refresh_failures: AtomicU64,
    clears: AtomicU64,
}

impl MetricsCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_creation(&self) {
        self.creations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed_creation(&self) {
        self.failed_creations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_refresh(&self, ok: bool) {
        if ok {
            self.refreshes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.refresh_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_clear(&self) {
        self.clears.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current statistics snapshot
    pub(crate) fn snapshot(&self, size: usize) -> CacheStats {
        CacheStats {
            size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            creations: self.creations.load(Ordering::Relaxed),
            failed_creations: self.failed_creations.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for cache::stats.
    use std::sync::Arc;
    use std::thread;

    use super::*;

    /// Validates `CacheStats::hit_rate` for the mixed access scenario.
    ///
    /// Assertions:
    /// - Ensures `(stats.hit_rate() - 0.8).abs() < 1e-10` evaluates to true.
    /// - Confirms `stats.total_accesses()` equals `100`.
    #[test]
    fn test_hit_rate_calculation() {
        let stats = CacheStats { hits: 80, misses: 20, ..Default::default() };

        assert!((stats.hit_rate() - 0.8).abs() < 1e-10);
        assert_eq!(stats.total_accesses(), 100);
    }

    #[test]
    fn test_hit_rate_no_accesses() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.total_accesses(), 0);
    }

    /// Validates `MetricsCollector::snapshot` after one of each operation.
    ///
    /// Assertions:
    /// - Every counter equals `1`.
    /// - Confirms `stats.size` equals `5`.
    #[test]
    fn test_metrics_collector_record_operations() {
        let collector = MetricsCollector::new();

        collector.record_hit();
        collector.record_miss();
        collector.record_creation();
        collector.record_failed_creation();
        collector.record_refresh(true);
        collector.record_refresh(false);
        collector.record_clear();

        let stats = collector.snapshot(5);

        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.creations, 1);
        assert_eq!(stats.failed_creations, 1);
        assert_eq!(stats.refreshes, 1);
        assert_eq!(stats.refresh_failures, 1);
        assert_eq!(stats.clears, 1);
        assert_eq!(stats.size, 5);
    }

    #[test]
    fn test_metrics_collector_thread_safety() {
        let collector = Arc::new(MetricsCollector::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let collector_clone = Arc::clone(&collector);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    collector_clone.record_refresh(true);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(collector.snapshot(0).refreshes, 1000);
    }
}
