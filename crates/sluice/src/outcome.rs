// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// How a completed call is counted by the breaker.
///
/// [`Breaker::execute`](crate::Breaker::execute) counts every `Err` as a failure. Use
/// [`Breaker::execute_with`](crate::Breaker::execute_with) to classify results yourself,
/// for example to ignore errors caused by invalid input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The call succeeded, or failed in a way that says nothing about the dependency's health.
    Success,

    /// The call failed and counts towards the failure rate.
    Failure,
}

impl Outcome {
    /// Classifies a result by its variant: `Ok` is a success and `Err` a failure.
    #[must_use]
    pub const fn from_result<T, E>(result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(_) => Self::Failure,
        }
    }

    /// Returns `true` for [`Outcome::Failure`].
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failure)
    }

    #[cfg(any(feature = "metrics", feature = "logs", test))]
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl From<bool> for Outcome {
    /// Converts an "is failure" flag into an outcome.
    fn from(failed: bool) -> Self {
        if failed { Self::Failure } else { Self::Success }
    }
}
