//! Counter store: the per-second buckets shared by registration, queries and
//! cleanup.

use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, Storage};
use crate::domain::timestamp::SecondTimestamp;
use std::sync::Arc;

/// Concurrent mapping from second timestamp to the number of events observed
/// during that second.
///
/// Increments go through [`Storage::with_entry_mut`], which holds only the
/// entry's shard, so concurrent registrations never lose updates and never
/// serialize on a store-wide lock.
///
/// This type is generic over the storage implementation. In production, use
/// `Arc<ShardedStorage<SecondTimestamp, u64>>`.
#[derive(Debug, Clone)]
pub struct CounterStore<S>
where
    S: Storage<SecondTimestamp, u64> + Clone,
{
    storage: S,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl<S> CounterStore<S>
where
    S: Storage<SecondTimestamp, u64> + Clone,
{
    /// Create a counter store over `storage`, reading time from `clock`.
    pub fn new(storage: S, clock: Arc<dyn Clock>, metrics: Metrics) -> Self {
        Self {
            storage,
            clock,
            metrics,
        }
    }

    /// The current second according to the store's clock.
    pub fn now(&self) -> SecondTimestamp {
        SecondTimestamp::from_system_time(self.clock.now())
    }

    /// Record one event in the current second's bucket.
    ///
    /// Returns the bucket the event was attributed to.
    pub fn register_event(&self) -> SecondTimestamp {
        let key = self.now();
        self.increment(key);
        key
    }

    /// Add one event to the bucket at `key`, creating it if absent.
    pub fn increment(&self, key: SecondTimestamp) {
        self.storage
            .with_entry_mut(key, || 0, |count| *count = count.saturating_add(1));
        self.metrics.record_registered();
    }

    /// Sum of all bucket counts with keys in `[start, end]`.
    ///
    /// Returns 0 when the interval is empty or no bucket qualifies. Each bucket
    /// is read once under its shard lock, so a concurrent increment is either
    /// fully visible or not at all.
    pub fn sum(&self, start: SecondTimestamp, end: SecondTimestamp) -> u64 {
        let mut total = 0u64;
        self.visit_range(start, end, |_, count| total = total.saturating_add(count));
        total
    }

    /// Sums for several windows that all end at `end`, computed in one pass.
    ///
    /// Window `i` covers `[end - spans[i], end]`. Every bucket in the widest
    /// window is read once and added to each window that covers it, so a wider
    /// window never reports less than a narrower one, even while cleanup is
    /// removing buckets concurrently.
    pub fn nested_sums<const N: usize>(
        &self,
        end: SecondTimestamp,
        spans: [u64; N],
    ) -> [u64; N] {
        let mut totals = [0u64; N];
        let starts = spans.map(|span| end.saturating_sub_secs(span));
        let Some(widest) = starts.iter().min().copied() else {
            return totals;
        };

        self.visit_range(widest, end, |key, count| {
            for (total, start) in totals.iter_mut().zip(starts.iter()) {
                if key >= *start {
                    *total = total.saturating_add(count);
                }
            }
        });
        totals
    }

    // Visits each live bucket in `[start, end]` exactly once.
    fn visit_range<F>(&self, start: SecondTimestamp, end: SecondTimestamp, visit: F)
    where
        F: FnMut(SecondTimestamp, u64),
    {
        if start > end || self.storage.is_empty() {
            return;
        }

        let span = (end.as_secs() as i128 - start.as_secs() as i128) + 1;
        if span <= self.storage.len() as i128 {
            self.visit_by_lookup(start, end, visit)
        } else {
            self.visit_by_scan(start, end, visit)
        }
    }

    // Short windows over a large store: look up each second in the window.
    fn visit_by_lookup<F>(&self, start: SecondTimestamp, end: SecondTimestamp, mut visit: F)
    where
        F: FnMut(SecondTimestamp, u64),
    {
        for secs in start.as_secs()..=end.as_secs() {
            let key = SecondTimestamp::from_secs(secs);
            if let Some(count) = self.storage.with_entry(&key, |count| *count) {
                visit(key, count);
            }
        }
    }

    fn visit_by_scan<F>(&self, start: SecondTimestamp, end: SecondTimestamp, mut visit: F)
    where
        F: FnMut(SecondTimestamp, u64),
    {
        self.storage.for_each(|key, count| {
            if *key >= start && *key <= end {
                visit(*key, *count);
            }
        });
    }

    /// Remove every bucket whose key is strictly below `floor`.
    ///
    /// Returns the number of removed buckets. Only the cleanup scheduler
    /// should call this.
    pub(crate) fn remove_below(&self, floor: SecondTimestamp) -> usize {
        let mut removed = 0usize;
        self.storage.retain(|key, _| {
            let keep = *key >= floor;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Number of live buckets.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether the store holds no buckets.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Shared metrics updated by this store.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::MockClock;
    use crate::infrastructure::storage::ShardedStorage;
    use std::thread;
    use std::time::Duration;

    fn store_at(secs: u64) -> (CounterStore<Arc<ShardedStorage<SecondTimestamp, u64>>>, MockClock) {
        let clock = MockClock::at_secs(secs);
        let store = CounterStore::new(
            Arc::new(ShardedStorage::new()),
            Arc::new(clock.clone()),
            Metrics::new(),
        );
        (store, clock)
    }

    fn ts(secs: i64) -> SecondTimestamp {
        SecondTimestamp::from_secs(secs)
    }

    #[test]
    fn test_events_in_same_second_share_bucket() {
        let (store, clock) = store_at(1_000);

        store.register_event();
        clock.advance(Duration::from_millis(400));
        store.register_event();
        clock.advance(Duration::from_millis(700));
        let later = store.register_event();

        assert_eq!(store.len(), 2);
        assert_eq!(later, ts(1_001));
        assert_eq!(store.sum(ts(1_000), ts(1_000)), 2);
        assert_eq!(store.sum(ts(1_001), ts(1_001)), 1);
        assert_eq!(store.metrics().events_registered(), 3);
    }

    #[test]
    fn test_sum_is_inclusive_on_both_ends() {
        let (store, _clock) = store_at(0);
        for secs in [10, 11, 12, 13] {
            store.increment(ts(secs));
        }

        assert_eq!(store.sum(ts(10), ts(13)), 4);
        assert_eq!(store.sum(ts(11), ts(12)), 2);
        assert_eq!(store.sum(ts(13), ts(13)), 1);
        assert_eq!(store.sum(ts(14), ts(100)), 0);
    }

    #[test]
    fn test_sum_empty_and_inverted_ranges() {
        let (store, _clock) = store_at(0);
        assert_eq!(store.sum(ts(0), ts(100)), 0);

        store.increment(ts(5));
        assert_eq!(store.sum(ts(6), ts(4)), 0);
    }

    #[test]
    fn test_lookup_and_scan_agree() {
        let (store, _clock) = store_at(0);
        for secs in 0..200 {
            for _ in 0..(secs % 3 + 1) {
                store.increment(ts(secs));
            }
        }

        // 10-second span is below the 200 live buckets, so it looks up each key.
        let looked_up = store.sum(ts(50), ts(59));
        let mut scanned_short = 0u64;
        store.visit_by_scan(ts(50), ts(59), |_, count| scanned_short += count);
        assert_eq!(looked_up, scanned_short);

        // Wider than the store: scans.
        let scanned = store.sum(ts(-1_000), ts(1_000));
        let expected: u64 = (0..200u64).map(|secs| secs % 3 + 1).sum();
        assert_eq!(scanned, expected);
    }

    #[test]
    fn test_nested_sums_match_individual_sums() {
        let (store, _clock) = store_at(0);
        for secs in [0, 40, 55, 58, 59, 60] {
            store.increment(ts(secs));
        }

        let [short, medium, wide] = store.nested_sums(ts(60), [2, 10, 100]);

        assert_eq!(short, store.sum(ts(58), ts(60)));
        assert_eq!(medium, store.sum(ts(50), ts(60)));
        assert_eq!(wide, store.sum(ts(-40), ts(60)));
        assert_eq!((short, medium, wide), (3, 4, 6));
    }

    #[test]
    fn test_remove_below_is_strict() {
        let (store, _clock) = store_at(0);
        for secs in 0..10 {
            store.increment(ts(secs));
        }

        let removed = store.remove_below(ts(4));

        assert_eq!(removed, 4);
        assert_eq!(store.len(), 6);
        assert_eq!(store.sum(ts(4), ts(4)), 1);
        assert_eq!(store.sum(ts(0), ts(3)), 0);
    }

    #[test]
    fn test_concurrent_registration_no_lost_updates() {
        let (store, _clock) = store_at(42);
        let mut handles = vec![];

        for _ in 0..8 {
            let store_clone = store.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..10_000 {
                    store_clone.register_event();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 1);
        assert_eq!(store.sum(ts(42), ts(42)), 80_000);
    }
}
