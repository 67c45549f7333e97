use chrono::{DateTime, Utc};

/// Authoritative snapshot cache with a monotonicity watermark and an
/// invalidation latch.
///
/// Refetch completions can arrive out of order; a snapshot older than the
/// last accepted one is rejected so a slow response cannot roll truth
/// backwards. Push events set the invalidation latch; the engine consumes
/// it to emit exactly one refresh request per invalidation.
#[derive(Clone, Debug)]
pub struct SnapshotCache<T> {
    items: Vec<T>,
    fetched_at: Option<DateTime<Utc>>,
    invalidated: bool,
}

impl<T> SnapshotCache<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            fetched_at: None,
            invalidated: false,
        }
    }

    /// Accept a refetched snapshot unless it is older than the watermark.
    ///
    /// Returns `false` (cache unchanged) for a non-monotonic snapshot.
    pub fn apply(&mut self, items: Vec<T>, fetched_at: DateTime<Utc>) -> bool {
        if self.fetched_at.is_some_and(|watermark| fetched_at < watermark) {
            return false;
        }
        self.items = items;
        self.fetched_at = Some(fetched_at);
        self.invalidated = false;
        true
    }

    /// Mark the cache stale; a refresh should be requested.
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    /// Clear and return the invalidation latch.
    pub fn consume_invalidation(&mut self) -> bool {
        std::mem::take(&mut self.invalidated)
    }

    /// `true` if never fetched, invalidated, or older than `window_secs`.
    pub fn is_stale(&self, now: DateTime<Utc>, window_secs: i64) -> bool {
        self.invalidated
            || match self.fetched_at {
                None => true,
                Some(at) => (now - at).num_seconds() > window_secs,
            }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }
}

impl<T> Default for SnapshotCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn rejects_non_monotonic_snapshot() {
        let mut cache = SnapshotCache::new();
        assert!(cache.apply(vec![1, 2], t(100)));

        // A slow response from an earlier fetch must not roll state back.
        assert!(!cache.apply(vec![9], t(99)));
        assert_eq!(cache.items(), &[1, 2]);

        // Same-timestamp refetch is accepted (watermark is non-decreasing).
        assert!(cache.apply(vec![3], t(100)));
        assert_eq!(cache.items(), &[3]);
    }

    #[test]
    fn invalidation_latch_is_consumed_once() {
        let mut cache: SnapshotCache<i32> = SnapshotCache::new();
        cache.invalidate();
        assert!(cache.consume_invalidation());
        assert!(!cache.consume_invalidation());
    }

    #[test]
    fn staleness_window() {
        let mut cache: SnapshotCache<i32> = SnapshotCache::new();
        assert!(cache.is_stale(t(0), 5));

        cache.apply(vec![], t(100));
        assert!(!cache.is_stale(t(105), 5));
        assert!(cache.is_stale(t(106), 5));

        cache.invalidate();
        assert!(cache.is_stale(t(101), 5));
    }

    #[test]
    fn accepting_a_snapshot_clears_the_latch() {
        let mut cache: SnapshotCache<i32> = SnapshotCache::new();
        cache.invalidate();
        cache.apply(vec![1], t(100));
        assert!(!cache.consume_invalidation());
    }
}
