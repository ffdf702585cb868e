// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Instant;

use crate::CircuitState;

/// Point-in-time view of a breaker, returned by [`Breaker::snapshot`](crate::Breaker::snapshot).
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerSnapshot {
    pub(crate) state: CircuitState,
    pub(crate) last_state_change: Instant,
    pub(crate) total_requests: u64,
    pub(crate) total_failures: u64,
    pub(crate) failure_rate: Option<f64>,
    pub(crate) window_requests: u64,
    pub(crate) window_failures: u64,
    pub(crate) current_percentage: f64,
    pub(crate) stage: Option<usize>,
}

impl BreakerSnapshot {
    /// The circuit state.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// When the breaker last changed state, or was created.
    #[must_use]
    pub fn last_state_change(&self) -> Instant {
        self.last_state_change
    }

    /// Requests in the window, from the running totals.
    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    /// Failures in the window, from the running totals.
    #[must_use]
    pub fn total_failures(&self) -> u64 {
        self.total_failures
    }

    /// Failure rate in the window, `None` when the window is empty.
    #[must_use]
    pub fn failure_rate(&self) -> Option<f64> {
        self.failure_rate
    }

    /// Requests summed bucket by bucket.
    ///
    /// Always equal to [`total_requests`](Self::total_requests); exposed so the two can be
    /// cross-checked.
    #[must_use]
    pub fn window_requests(&self) -> u64 {
        self.window_requests
    }

    /// Failures summed bucket by bucket.
    #[must_use]
    pub fn window_failures(&self) -> u64 {
        self.window_failures
    }

    /// Fraction of traffic the half-open ramp currently admits.
    ///
    /// Meaningful while half-open. Zero until the breaker first leaves the closed state.
    #[must_use]
    pub fn current_percentage(&self) -> f64 {
        self.current_percentage
    }

    /// Index of the current half-open stage.
    #[must_use]
    pub fn stage(&self) -> Option<usize> {
        self.stage
    }
}
