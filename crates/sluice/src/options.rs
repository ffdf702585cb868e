// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use crate::constants::{
    DEFAULT_BUCKETS_PER_SECOND, DEFAULT_FAILURE_THRESHOLD, DEFAULT_HALF_OPEN_MAX_REQUESTS, DEFAULT_HALF_OPEN_STAGES,
    DEFAULT_MIN_THROUGHPUT, DEFAULT_OPEN_DURATION, DEFAULT_STAGE_INTERVAL, DEFAULT_WINDOW_SECONDS, MAX_BUCKETS_PER_SECOND,
};
use crate::error::ConfigError;

/// Configuration of a [`Breaker`](crate::Breaker).
///
/// All fields have defaults, so a configuration only needs to name what it changes:
///
/// ```rust
/// use std::time::Duration;
///
/// use sluice::BreakerOptions;
///
/// let options = BreakerOptions::default()
///     .with_failure_threshold(0.25)
///     .with_open_duration(Duration::from_secs(30));
///
/// assert!(options.validate().is_ok());
/// ```
///
/// With the `serde` feature the options can be deserialized from any format serde supports.
/// Missing fields take their default values.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(any(feature = "serde", test), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(feature = "serde", test), serde(default))]
#[non_exhaustive]
pub struct BreakerOptions {
    /// Length of the sliding window, in whole seconds. Default: 10.
    pub window_seconds: u32,

    /// Number of buckets each second of the window is split into. Default: 1.
    pub buckets_per_second: u32,

    /// Failure rate in `(0, 1)` at which the circuit trips. Default: 0.5.
    pub failure_threshold: f64,

    /// Minimum number of requests in the window before the circuit may trip. Default: 1.
    pub min_throughput: u64,

    /// How long the circuit stays open before probing starts. Default: 5 seconds.
    pub open_duration: Duration,

    /// Traffic fractions admitted while half-open, strictly ascending, each in `(0, 1]`.
    /// Default: `[0.1, 0.3, 0.5, 0.75, 1.0]`.
    pub half_open_stages: Vec<f64>,

    /// How long a half-open stage is observed before it is evaluated. Default: 1 second.
    pub stage_interval: Duration,

    /// Scale of the half-open admission quota. Multiplied by the stage percentage, it bounds
    /// how many probes a stage admits back to back when its credit is full. Default: 1.0.
    pub half_open_max_requests: f64,
}

impl Default for BreakerOptions {
    fn default() -> Self {
        Self {
            window_seconds: DEFAULT_WINDOW_SECONDS,
            buckets_per_second: DEFAULT_BUCKETS_PER_SECOND,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            min_throughput: DEFAULT_MIN_THROUGHPUT,
            open_duration: DEFAULT_OPEN_DURATION,
            half_open_stages: DEFAULT_HALF_OPEN_STAGES.to_vec(),
            stage_interval: DEFAULT_STAGE_INTERVAL,
            half_open_max_requests: DEFAULT_HALF_OPEN_MAX_REQUESTS,
        }
    }
}

impl BreakerOptions {
    /// Sets the window length in seconds.
    #[must_use]
    pub fn with_window_seconds(mut self, window_seconds: u32) -> Self {
        self.window_seconds = window_seconds;
        self
    }

    /// Sets the number of buckets per second of window.
    #[must_use]
    pub fn with_buckets_per_second(mut self, buckets_per_second: u32) -> Self {
        self.buckets_per_second = buckets_per_second;
        self
    }

    /// Sets the failure rate at which the circuit trips.
    #[must_use]
    pub fn with_failure_threshold(mut self, failure_threshold: f64) -> Self {
        self.failure_threshold = failure_threshold;
        self
    }

    /// Sets the minimum number of requests in the window before the circuit may trip.
    #[must_use]
    pub fn with_min_throughput(mut self, min_throughput: u64) -> Self {
        self.min_throughput = min_throughput;
        self
    }

    /// Sets how long the circuit stays open.
    #[must_use]
    pub fn with_open_duration(mut self, open_duration: Duration) -> Self {
        self.open_duration = open_duration;
        self
    }

    /// Sets the half-open stages.
    #[must_use]
    pub fn with_half_open_stages(mut self, stages: impl Into<Vec<f64>>) -> Self {
        self.half_open_stages = stages.into();
        self
    }

    /// Sets how long each half-open stage is observed.
    #[must_use]
    pub fn with_stage_interval(mut self, stage_interval: Duration) -> Self {
        self.stage_interval = stage_interval;
        self
    }

    /// Sets the scale of the half-open admission quota.
    #[must_use]
    pub fn with_half_open_max_requests(mut self, max_requests: f64) -> Self {
        self.half_open_max_requests = max_requests;
        self
    }

    /// Checks the options for consistency.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.failure_threshold > 0.0 && self.failure_threshold < 1.0) {
            return Err(ConfigError::FailureThreshold(self.failure_threshold));
        }

        if self.window_seconds == 0 {
            return Err(ConfigError::ZeroWindow);
        }

        if !(1..=MAX_BUCKETS_PER_SECOND).contains(&self.buckets_per_second) {
            return Err(ConfigError::BucketsPerSecond(self.buckets_per_second));
        }

        self.bucket_count()?;

        if self.open_duration.is_zero() {
            return Err(ConfigError::ZeroOpenDuration);
        }

        if self.stage_interval.is_zero() {
            return Err(ConfigError::ZeroStageInterval);
        }

        validate_stages(&self.half_open_stages)?;

        if !self.half_open_max_requests.is_finite() || self.half_open_max_requests < 1.0 {
            return Err(ConfigError::MaxRequests(self.half_open_max_requests));
        }

        Ok(())
    }

    /// Number of buckets in the window.
    pub(crate) fn bucket_count(&self) -> Result<usize, ConfigError> {
        self.window_seconds
            .checked_mul(self.buckets_per_second)
            .and_then(|count| usize::try_from(count).ok())
            .ok_or(ConfigError::WindowTooLarge {
                window_seconds: self.window_seconds,
                buckets_per_second: self.buckets_per_second,
            })
    }

    /// Time span covered by a single bucket.
    pub(crate) fn bucket_duration(&self) -> Duration {
        Duration::from_secs(1) / self.buckets_per_second.max(1)
    }
}

fn validate_stages(stages: &[f64]) -> Result<(), ConfigError> {
    if stages.is_empty() {
        return Err(ConfigError::EmptyStages);
    }

    if let Some(stage) = stages.iter().find(|stage| !(**stage > 0.0 && **stage <= 1.0)) {
        return Err(ConfigError::StageOutOfRange(*stage));
    }

    if stages.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(ConfigError::StagesNotAscending);
    }

    Ok(())
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let options = BreakerOptions::default();

        options.validate().unwrap();
        assert_eq!(options.bucket_count().unwrap(), 10);
        assert_eq!(options.bucket_duration(), Duration::from_secs(1));
        assert_eq!(options.half_open_stages, vec![0.1, 0.3, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn bucket_duration_splits_second() {
        let options = BreakerOptions::default().with_buckets_per_second(4);
        assert_eq!(options.bucket_duration(), Duration::from_millis(250));
    }

    #[test]
    fn failure_threshold_bounds() {
        for threshold in [0.0, 1.0, -0.1, 1.1, f64::NAN] {
            let result = BreakerOptions::default().with_failure_threshold(threshold).validate();
            assert!(matches!(result, Err(ConfigError::FailureThreshold(_))), "{threshold}");
        }

        BreakerOptions::default().with_failure_threshold(0.01).validate().unwrap();
        BreakerOptions::default().with_failure_threshold(0.99).validate().unwrap();
    }

    #[test]
    fn zero_window_rejected() {
        let result = BreakerOptions::default().with_window_seconds(0).validate();
        assert_eq!(result, Err(ConfigError::ZeroWindow));
    }

    #[test]
    fn buckets_per_second_bounds() {
        assert_eq!(
            BreakerOptions::default().with_buckets_per_second(0).validate(),
            Err(ConfigError::BucketsPerSecond(0))
        );
        assert_eq!(
            BreakerOptions::default().with_buckets_per_second(1001).validate(),
            Err(ConfigError::BucketsPerSecond(1001))
        );
        BreakerOptions::default().with_buckets_per_second(1000).validate().unwrap();
    }

    #[test]
    fn window_too_large_rejected() {
        let result = BreakerOptions::default()
            .with_window_seconds(u32::MAX)
            .with_buckets_per_second(2)
            .validate();

        assert_eq!(
            result,
            Err(ConfigError::WindowTooLarge {
                window_seconds: u32::MAX,
                buckets_per_second: 2
            })
        );
    }

    #[test]
    fn zero_durations_rejected() {
        assert_eq!(
            BreakerOptions::default().with_open_duration(Duration::ZERO).validate(),
            Err(ConfigError::ZeroOpenDuration)
        );
        assert_eq!(
            BreakerOptions::default().with_stage_interval(Duration::ZERO).validate(),
            Err(ConfigError::ZeroStageInterval)
        );
    }

    #[test]
    fn stages_validated() {
        assert_eq!(
            BreakerOptions::default().with_half_open_stages(Vec::new()).validate(),
            Err(ConfigError::EmptyStages)
        );
        assert_eq!(
            BreakerOptions::default().with_half_open_stages([0.0, 0.5]).validate(),
            Err(ConfigError::StageOutOfRange(0.0))
        );
        assert_eq!(
            BreakerOptions::default().with_half_open_stages([0.5, 1.5]).validate(),
            Err(ConfigError::StageOutOfRange(1.5))
        );
        assert_eq!(
            BreakerOptions::default().with_half_open_stages([0.5, 0.5]).validate(),
            Err(ConfigError::StagesNotAscending)
        );
        assert_eq!(
            BreakerOptions::default().with_half_open_stages([0.75, 0.25]).validate(),
            Err(ConfigError::StagesNotAscending)
        );

        BreakerOptions::default().with_half_open_stages([0.5]).validate().unwrap();
    }

    #[test]
    fn max_requests_validated() {
        for max in [0.5, f64::INFINITY, f64::NAN] {
            let result = BreakerOptions::default().with_half_open_max_requests(max).validate();
            assert!(matches!(result, Err(ConfigError::MaxRequests(_))), "{max}");
        }

        BreakerOptions::default().with_half_open_max_requests(8.0).validate().unwrap();
    }

    #[test]
    fn deserialize_partial_uses_defaults() {
        let json = r#"{ "failure_threshold": 0.25, "half_open_stages": [0.5, 1.0] }"#;
        let options: BreakerOptions = serde_json::from_str(json).unwrap();

        assert_eq!(
            options,
            BreakerOptions::default()
                .with_failure_threshold(0.25)
                .with_half_open_stages([0.5, 1.0])
        );
    }

    #[test]
    fn serialize_durations() {
        let options = BreakerOptions::default().with_open_duration(Duration::from_millis(1500));
        let json = serde_json::to_value(&options).unwrap();

        assert_eq!(json["open_duration"]["secs"], 1);
        assert_eq!(json["open_duration"]["nanos"], 500_000_000);
        assert_eq!(json["window_seconds"], 10);
    }
}
