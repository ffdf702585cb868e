// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::Bucket;

/// Running totals over every bucket in the window.
///
/// The totals are kept in step with the buckets incrementally: each recorded request or
/// failure is added here as well as to its bucket, and each evicted bucket is subtracted.
/// The failure rate is recomputed on every change, so reading it is free.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct AggregateStats {
    total_requests: u64,
    total_failures: u64,
    current_rate: Option<f64>,
}

impl AggregateStats {
    pub fn record_request(&mut self) {
        self.total_requests += 1;
        self.recompute();
    }

    pub fn record_failure(&mut self) {
        self.total_failures += 1;
        self.recompute();
    }

    /// Removes the counts of a bucket that left the window.
    pub fn evict(&mut self, bucket: Bucket) {
        self.total_requests = self.total_requests.saturating_sub(bucket.requests);
        self.total_failures = self.total_failures.saturating_sub(bucket.failures);
        self.recompute();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    pub fn total_failures(&self) -> u64 {
        self.total_failures
    }

    /// Failure rate over the window, `None` while the window holds no requests.
    pub fn failure_rate(&self) -> Option<f64> {
        self.current_rate
    }

    /// Failure rate used for decisions; an empty window counts as fully healthy.
    pub fn effective_rate(&self) -> f64 {
        self.current_rate.unwrap_or(0.0)
    }

    #[expect(clippy::cast_precision_loss, reason = "request counts stay far below 2^52")]
    fn recompute(&mut self) {
        self.current_rate = (self.total_requests > 0).then(|| self.total_failures as f64 / self.total_requests as f64);
    }
}
