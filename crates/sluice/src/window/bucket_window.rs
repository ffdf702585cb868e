// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, Instant};

use super::{AggregateStats, Bucket};

/// Fixed ring of time buckets covering the sliding window.
///
/// Only one bucket is active at a time. Eviction is lazy: when a call arrives after the
/// active bucket's time slice has passed, the ring advances one slot per elapsed slice and
/// every slot it reuses is subtracted from the aggregate before being cleared. A gap longer
/// than the whole window therefore clears every bucket.
#[derive(Debug)]
pub(crate) struct BucketWindow {
    buckets: Box<[Bucket]>,
    bucket_duration: Duration,
    last_index: usize,
    last_bucket_time: Option<Instant>,
}

impl BucketWindow {
    pub fn new(bucket_count: usize, bucket_duration: Duration) -> Self {
        debug_assert!(bucket_count > 0, "window needs at least one bucket");
        debug_assert!(!bucket_duration.is_zero(), "bucket duration must be non-zero");

        Self {
            buckets: vec![Bucket::default(); bucket_count].into_boxed_slice(),
            bucket_duration,
            last_index: 0,
            last_bucket_time: None,
        }
    }

    /// Returns the index of the bucket covering `now`, advancing the ring if needed.
    pub fn current_bucket(&mut self, now: Instant, stats: &mut AggregateStats) -> usize {
        let Some(opened_at) = self.last_bucket_time else {
            self.last_bucket_time = Some(now);
            return self.last_index;
        };

        let elapsed = now.saturating_duration_since(opened_at);
        if elapsed < self.bucket_duration {
            return self.last_index;
        }

        let steps = usize::try_from(elapsed.as_nanos() / self.bucket_duration.as_nanos())
            .unwrap_or(usize::MAX)
            .min(self.buckets.len());

        for _ in 0..steps {
            self.last_index = (self.last_index + 1) % self.buckets.len();
            stats.evict(std::mem::take(&mut self.buckets[self.last_index]));
        }

        self.last_bucket_time = Some(now);
        self.last_index
    }

    pub fn bucket_mut(&mut self, index: usize) -> &mut Bucket {
        &mut self.buckets[index]
    }

    pub fn reset(&mut self) {
        self.buckets.fill(Bucket::default());
        self.last_index = 0;
        self.last_bucket_time = None;
    }

    /// Sums the buckets. Linear in the window size; the aggregate is the fast path.
    pub fn sum(&self) -> Bucket {
        self.buckets.iter().fold(Bucket::default(), |acc, bucket| Bucket {
            requests: acc.requests + bucket.requests,
            failures: acc.failures + bucket.failures,
        })
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    const HALF_SECOND: Duration = Duration::from_millis(500);

    fn record(window: &mut BucketWindow, stats: &mut AggregateStats, now: Instant, failed: bool) -> usize {
        let index = window.current_bucket(now, stats);
        window.bucket_mut(index).record_request();
        stats.record_request();
        if failed {
            window.bucket_mut(index).record_failure();
            stats.record_failure();
        }
        index
    }

    fn assert_consistent(window: &BucketWindow, stats: &AggregateStats) {
        let sum = window.sum();
        assert_eq!(sum.requests, stats.total_requests());
        assert_eq!(sum.failures, stats.total_failures());
    }

    #[test]
    fn first_use_activates_without_eviction() {
        let mut window = BucketWindow::new(4, Duration::from_secs(1));
        let mut stats = AggregateStats::default();

        let index = window.current_bucket(Instant::now(), &mut stats);

        assert_eq!(index, 0);
        assert_eq!(stats, AggregateStats::default());
        assert_eq!(window.len(), 4);
    }

    #[test]
    fn same_slice_reuses_bucket() {
        let mut window = BucketWindow::new(2, HALF_SECOND);
        let mut stats = AggregateStats::default();
        let start = Instant::now();

        let first = record(&mut window, &mut stats, start, false);
        let second = record(&mut window, &mut stats, start + Duration::from_millis(499), true);

        assert_eq!(first, second);
        assert_eq!(window.bucket_mut(first), &Bucket { requests: 2, failures: 1 });
        assert_consistent(&window, &stats);
    }

    #[test]
    fn advances_one_slot_per_slice() {
        let mut window = BucketWindow::new(4, Duration::from_secs(1));
        let mut stats = AggregateStats::default();
        let start = Instant::now();

        assert_eq!(record(&mut window, &mut stats, start, false), 0);
        assert_eq!(record(&mut window, &mut stats, start + Duration::from_secs(1), false), 1);
        assert_eq!(record(&mut window, &mut stats, start + Duration::from_secs(3), false), 3);
        assert_eq!(stats.total_requests(), 3);
        assert_consistent(&window, &stats);
    }

    #[test]
    fn wrap_evicts_oldest_bucket() {
        let mut window = BucketWindow::new(2, HALF_SECOND);
        let mut stats = AggregateStats::default();
        let start = Instant::now();

        record(&mut window, &mut stats, start, true);
        record(&mut window, &mut stats, start + HALF_SECOND, false);
        assert_eq!(stats.total_requests(), 2);

        // the third slice reuses slot 0 and drops the failure recorded at the start
        let index = record(&mut window, &mut stats, start + 2 * HALF_SECOND, false);

        assert_eq!(index, 0);
        assert_eq!(stats.total_requests(), 2);
        assert_eq!(stats.total_failures(), 0);
        assert_eq!(stats.failure_rate(), Some(0.0));
        assert_consistent(&window, &stats);
    }

    #[test]
    fn gap_longer_than_window_clears_everything() {
        let mut window = BucketWindow::new(2, HALF_SECOND);
        let mut stats = AggregateStats::default();
        let start = Instant::now();

        record(&mut window, &mut stats, start, true);
        record(&mut window, &mut stats, start + Duration::from_millis(700), true);

        record(&mut window, &mut stats, start + Duration::from_secs(60), false);

        assert_eq!(stats.total_requests(), 1);
        assert_eq!(stats.total_failures(), 0);
        assert_consistent(&window, &stats);
    }

    #[test]
    fn single_bucket_window_rolls_over() {
        let mut window = BucketWindow::new(1, Duration::from_secs(1));
        let mut stats = AggregateStats::default();
        let start = Instant::now();

        record(&mut window, &mut stats, start, true);
        record(&mut window, &mut stats, start + Duration::from_secs(1), false);

        assert_eq!(stats.total_requests(), 1);
        assert_eq!(stats.total_failures(), 0);
        assert_consistent(&window, &stats);
    }

    #[test]
    fn reset_clears_buckets() {
        let mut window = BucketWindow::new(3, Duration::from_secs(1));
        let mut stats = AggregateStats::default();
        let start = Instant::now();
        record(&mut window, &mut stats, start, true);
        record(&mut window, &mut stats, start + Duration::from_secs(2), true);

        window.reset();

        assert_eq!(window.sum(), Bucket::default());
        assert_eq!(window.current_bucket(start + Duration::from_secs(5), &mut stats), 0);
    }
}
