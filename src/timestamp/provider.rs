//! Per-discontinuity adjuster registry
//!
//! Chunks of an HLS playlist that share a discontinuity sequence share a
//! clock, so they must share one adjuster even when they are fetched
//! concurrently. The registry is an LRU map keyed by sequence number. It is
//! unbounded unless a capacity is configured, in which case the least
//! recently requested sequence is evicted first.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::config::TimestampConfig;
use crate::timestamp::TimestampAdjuster;

/// An adjuster shared between all chunks of one discontinuity sequence.
pub type SharedTimestampAdjuster = Arc<Mutex<TimestampAdjuster>>;

/// Vends one [`TimestampAdjuster`] per discontinuity sequence.
pub struct TimestampAdjusterProvider {
    adjusters: Mutex<LruCache<u32, SharedTimestampAdjuster>>,
}

impl TimestampAdjusterProvider {
    /// Create an unbounded provider. Adjusters live until [`reset`](Self::reset)
    /// or [`retain_only`](Self::retain_only).
    pub fn new() -> Self {
        Self {
            adjusters: Mutex::new(LruCache::unbounded()),
        }
    }

    /// Create a provider that keeps at most `capacity` sequences.
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            adjusters: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Create a provider from configuration. A zero cap is treated as unbounded;
    /// configuration validation rejects it before it gets here.
    pub fn from_config(config: &TimestampConfig) -> Self {
        match config.max_adjusters.and_then(NonZeroUsize::new) {
            Some(capacity) => Self::with_capacity(capacity),
            None => Self::new(),
        }
    }

    /// Return the adjuster for `discontinuity_sequence`, creating one anchored
    /// at `start_time_us` if none exists. `start_time_us` is ignored when the
    /// sequence already has an adjuster.
    pub fn get_adjuster(
        &self,
        discontinuity_sequence: u32,
        start_time_us: i64,
    ) -> SharedTimestampAdjuster {
        let mut adjusters = self.adjusters.lock();

        if let Some(adjuster) = adjusters.get(&discontinuity_sequence) {
            return adjuster.clone();
        }

        let adjuster = Arc::new(Mutex::new(TimestampAdjuster::new(start_time_us)));
        tracing::debug!(
            discontinuity_sequence,
            start_time_us,
            "created timestamp adjuster"
        );
        if let Some((evicted, _)) = adjusters.push(discontinuity_sequence, adjuster.clone()) {
            tracing::debug!(evicted, "evicted timestamp adjuster");
        }
        adjuster
    }

    /// Drop every adjuster whose sequence is not in `active_sequences`.
    ///
    /// Intended to be called by the segment fetcher when a playlist refresh
    /// moves the live window past old discontinuities.
    pub fn retain_only<I>(&self, active_sequences: I)
    where
        I: IntoIterator<Item = u32>,
    {
        let active: Vec<u32> = active_sequences.into_iter().collect();
        let mut adjusters = self.adjusters.lock();

        let stale: Vec<u32> = adjusters
            .iter()
            .map(|(sequence, _)| *sequence)
            .filter(|sequence| !active.contains(sequence))
            .collect();

        for sequence in &stale {
            adjusters.pop(sequence);
        }
        if !stale.is_empty() {
            tracing::debug!(pruned = stale.len(), "pruned timestamp adjusters");
        }
    }

    /// Discard all adjusters.
    pub fn reset(&self) {
        self.adjusters.lock().clear();
    }

    /// Number of tracked discontinuity sequences
    pub fn len(&self) -> usize {
        self.adjusters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjusters.lock().is_empty()
    }
}

impl Default for TimestampAdjusterProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;

    #[test]
    fn test_same_sequence_returns_same_adjuster() {
        let provider = TimestampAdjusterProvider::new();

        let a1 = provider.get_adjuster(7, 1000);
        let again = provider.get_adjuster(7, 9999);
        assert!(Arc::ptr_eq(&a1, &again));
        assert_eq!(again.lock().first_presentation_time_us(), 1000);

        let a2 = provider.get_adjuster(8, 2000);
        assert!(!Arc::ptr_eq(&a1, &a2));

        provider.reset();
        assert!(provider.is_empty());

        let a3 = provider.get_adjuster(7, 3000);
        assert!(!Arc::ptr_eq(&a1, &a3));
        assert_eq!(a3.lock().first_presentation_time_us(), 3000);
    }

    #[test]
    fn test_shared_clock_across_chunks() {
        let provider = TimestampAdjusterProvider::new();

        let first_chunk = provider.get_adjuster(3, 0);
        assert_eq!(first_chunk.lock().adjust_sample_timestamp(5_000_000), 0);

        let second_chunk = provider.get_adjuster(3, 10_000_000);
        assert_eq!(second_chunk.lock().adjust_sample_timestamp(9_000_000), 4_000_000);
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let provider = TimestampAdjusterProvider::with_capacity(NonZeroUsize::new(2).unwrap());

        let a1 = provider.get_adjuster(1, 0);
        provider.get_adjuster(2, 0);
        provider.get_adjuster(1, 0);
        provider.get_adjuster(3, 0);

        assert_eq!(provider.len(), 2);
        assert!(Arc::ptr_eq(&a1, &provider.get_adjuster(1, 0)));
        assert_eq!(provider.len(), 2);
    }

    #[test]
    fn test_retain_only() {
        let provider = TimestampAdjusterProvider::new();
        for sequence in 0..5 {
            provider.get_adjuster(sequence, 0);
        }
        let kept = provider.get_adjuster(3, 0);

        provider.retain_only([3, 4]);

        assert_eq!(provider.len(), 2);
        assert!(Arc::ptr_eq(&kept, &provider.get_adjuster(3, 0)));
    }

    #[test]
    fn test_from_config() {
        let bounded = TimestampAdjusterProvider::from_config(&TimestampConfig {
            max_adjusters: Some(1),
        });
        bounded.get_adjuster(1, 0);
        bounded.get_adjuster(2, 0);
        assert_eq!(bounded.len(), 1);

        let unbounded = TimestampAdjusterProvider::from_config(&TimestampConfig::default());
        for sequence in 0..100 {
            unbounded.get_adjuster(sequence, 0);
        }
        assert_eq!(unbounded.len(), 100);
    }

    #[test]
    fn test_concurrent_get_and_reset() {
        let provider = Arc::new(TimestampAdjusterProvider::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let provider = provider.clone();
                thread::spawn(move || {
                    for n in 0..200u32 {
                        let adjuster = provider.get_adjuster(n % 4, i64::from(n));
                        adjuster.lock().adjust_sample_timestamp(i64::from(n));
                        if i == 0 && n % 50 == 0 {
                            provider.reset();
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(provider.len() <= 4);
    }

    proptest! {
        #[test]
        fn prop_one_adjuster_per_sequence(requests in proptest::collection::vec((0u32..16, 0i64..1_000_000), 1..64)) {
            let provider = TimestampAdjusterProvider::new();
            let mut first_seen: std::collections::HashMap<u32, SharedTimestampAdjuster> =
                std::collections::HashMap::new();

            for (sequence, start) in requests {
                let adjuster = provider.get_adjuster(sequence, start);
                let expected = first_seen.entry(sequence).or_insert_with(|| adjuster.clone());
                prop_assert!(Arc::ptr_eq(expected, &adjuster));
            }
            prop_assert_eq!(provider.len(), first_seen.len());
        }
    }
}
