// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// Default length of the sliding window, in seconds.
pub(crate) const DEFAULT_WINDOW_SECONDS: u32 = 10;

/// Default number of buckets each second of the window is split into.
pub(crate) const DEFAULT_BUCKETS_PER_SECOND: u32 = 1;

/// Upper bound for buckets per second. Finer buckets than a millisecond do not
/// improve the failure rate estimate and only cost memory.
pub(crate) const MAX_BUCKETS_PER_SECOND: u32 = 1000;

/// Default failure rate at which the circuit trips.
pub(crate) const DEFAULT_FAILURE_THRESHOLD: f64 = 0.5;

/// Default minimum number of requests in the window before the failure rate is trusted.
///
/// With a value of one the failure rate alone decides.
pub(crate) const DEFAULT_MIN_THROUGHPUT: u64 = 1;

/// Default duration the circuit stays open before the half-open ramp starts.
pub(crate) const DEFAULT_OPEN_DURATION: Duration = Duration::from_secs(5);

/// Default traffic fractions admitted by the half-open ramp, in order.
pub(crate) const DEFAULT_HALF_OPEN_STAGES: [f64; 5] = [0.1, 0.3, 0.5, 0.75, 1.0];

/// Default time a half-open stage is observed before it is evaluated.
pub(crate) const DEFAULT_STAGE_INTERVAL: Duration = Duration::from_secs(1);

/// Default scale of the half-open admission quota.
pub(crate) const DEFAULT_HALF_OPEN_MAX_REQUESTS: f64 = 1.0;

/// Width of the band around the admission quota inside which a probe is let through.
pub(crate) const QUOTA_TOLERANCE: f64 = 0.01;

/// Failure rate above which the half-open ramp steps back to the previous stage.
pub(crate) const REGRESSION_FAILURE_RATE: f64 = 0.9;

/// Stage percentage above which the ramp is considered complete and the circuit closes.
pub(crate) const CLOSE_PERCENTAGE: f64 = 0.9;
