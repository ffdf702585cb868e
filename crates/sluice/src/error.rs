// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Display};

use thiserror::Error;

/// Why the breaker refused to dispatch a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DropReason {
    /// The circuit is open and the open duration has not elapsed yet.
    Open,

    /// The circuit is closed but the failure rate in the window has reached the threshold.
    ///
    /// [`Breaker`](crate::Breaker) re-evaluates its state after every recorded outcome, so a
    /// failing window trips it to open straight away and its calls are dropped with
    /// [`DropReason::Open`] instead. Only a state machine that records outcomes without
    /// evaluating them would drop a call for this reason.
    FailureRateExceeded,

    /// The circuit is half-open and the current stage has no probe quota left for this call.
    HalfOpenQuota,
}

impl DropReason {
    /// Returns the `snake_case` name of the reason, as used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::FailureRateExceeded => "failure_rate_exceeded",
            Self::HalfOpenQuota => "half_open_quota",
        }
    }
}

impl Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "circuit is open",
            Self::FailureRateExceeded => "failure rate exceeds the threshold",
            Self::HalfOpenQuota => "half-open probe quota exhausted",
        })
    }
}

/// Error returned by [`Breaker::execute`](crate::Breaker::execute) and its variants.
///
/// The operation's own errors are passed through untouched in [`ExecuteError::Operation`].
#[derive(Debug, Error)]
pub enum ExecuteError<E> {
    /// The breaker refused the call; the operation was not invoked and nothing was recorded.
    #[error("request dropped early by breaker: {0}")]
    RequestDropped(DropReason),

    /// The operation ran and returned this error.
    #[error(transparent)]
    Operation(E),
}

impl<E> ExecuteError<E> {
    /// Returns `true` if the breaker refused the call.
    #[must_use]
    pub const fn is_dropped(&self) -> bool {
        matches!(self, Self::RequestDropped(_))
    }

    /// Returns the reason the call was refused, if it was.
    #[must_use]
    pub const fn drop_reason(&self) -> Option<DropReason> {
        match self {
            Self::RequestDropped(reason) => Some(*reason),
            Self::Operation(_) => None,
        }
    }

    /// Returns the operation's error, or `None` if the call was refused.
    #[must_use]
    pub fn into_operation(self) -> Option<E> {
        match self {
            Self::RequestDropped(_) => None,
            Self::Operation(error) => Some(error),
        }
    }
}

/// Invalid breaker configuration, reported when the breaker is built.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The failure threshold must lie strictly between 0 and 1.
    #[error("failure threshold must be between 0 and 1 (exclusive), got {0}")]
    FailureThreshold(f64),

    /// The window must span at least one second.
    #[error("window must span at least one second")]
    ZeroWindow,

    /// Buckets per second must be between 1 and 1000.
    #[error("buckets per second must be between 1 and 1000, got {0}")]
    BucketsPerSecond(u32),

    /// The window holds more buckets than can be addressed.
    #[error("window of {window_seconds}s with {buckets_per_second} buckets per second is too large")]
    WindowTooLarge {
        /// Configured window length.
        window_seconds: u32,
        /// Configured buckets per second.
        buckets_per_second: u32,
    },

    /// The open duration must be non-zero.
    #[error("open duration must be greater than zero")]
    ZeroOpenDuration,

    /// The half-open stage interval must be non-zero.
    #[error("half-open stage interval must be greater than zero")]
    ZeroStageInterval,

    /// At least one half-open stage is required.
    #[error("at least one half-open stage is required")]
    EmptyStages,

    /// Each half-open stage must lie in `(0, 1]`.
    #[error("half-open stage must be in (0, 1], got {0}")]
    StageOutOfRange(f64),

    /// Half-open stages must be strictly ascending.
    #[error("half-open stages must be strictly ascending")]
    StagesNotAscending,

    /// The half-open request scale must be finite and at least one.
    #[error("half-open max requests must be finite and at least 1, got {0}")]
    MaxRequests(f64),
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(ExecuteError<std::io::Error>: std::error::Error, Send, Sync);
    assert_impl_all!(ConfigError: std::error::Error, Send, Sync, Clone);

    #[test]
    fn request_dropped_display() {
        let error = ExecuteError::<std::io::Error>::RequestDropped(DropReason::Open);
        assert_eq!(error.to_string(), "request dropped early by breaker: circuit is open");
    }

    #[test]
    fn operation_is_transparent() {
        let error = ExecuteError::Operation(std::io::Error::other("connection reset"));
        assert_eq!(error.to_string(), "connection reset");
        assert!(!error.is_dropped());
        assert_eq!(error.drop_reason(), None);
        assert_eq!(error.into_operation().unwrap().to_string(), "connection reset");
    }

    #[test]
    fn drop_reason_ok() {
        let error = ExecuteError::<()>::RequestDropped(DropReason::HalfOpenQuota);
        assert!(error.is_dropped());
        assert_eq!(error.drop_reason(), Some(DropReason::HalfOpenQuota));
        assert!(error.into_operation().is_none());
    }

    #[test]
    fn drop_reason_as_str() {
        assert_eq!(DropReason::Open.as_str(), "open");
        assert_eq!(DropReason::FailureRateExceeded.as_str(), "failure_rate_exceeded");
        assert_eq!(DropReason::HalfOpenQuota.as_str(), "half_open_quota");
    }

    #[test]
    fn config_error_display() {
        assert_eq!(
            ConfigError::FailureThreshold(1.5).to_string(),
            "failure threshold must be between 0 and 1 (exclusive), got 1.5"
        );
        assert_eq!(
            ConfigError::WindowTooLarge {
                window_seconds: 10,
                buckets_per_second: 2
            }
            .to_string(),
            "window of 10s with 2 buckets per second is too large"
        );
    }
}
