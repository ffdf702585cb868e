// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, Instant};

use super::{Admission, ExecutionMode, Transition};
use crate::ramp::{HalfOpenRamp, StageStep};
use crate::window::{AggregateStats, BucketWindow};
use crate::{BreakerOptions, BreakerSnapshot, CircuitState, ConfigError, DropReason, Outcome};

/// Circuit breaker state machine over a sliding window and a half-open ramp.
///
/// The core is not synchronized; the owning breaker guards it with a lock. Time is passed in
/// by the caller and every time-based decision is a function of how long ago the relevant
/// event happened.
#[derive(Debug)]
pub(crate) struct EngineCore {
    state: CircuitState,
    last_state_change: Instant,
    opened_at: Option<Instant>,
    failure_threshold: f64,
    min_throughput: u64,
    open_duration: Duration,
    window: BucketWindow,
    stats: AggregateStats,
    ramp: HalfOpenRamp,
}

impl EngineCore {
    pub fn new(options: &BreakerOptions, now: Instant) -> Result<Self, ConfigError> {
        options.validate()?;

        Ok(Self {
            state: CircuitState::Closed,
            last_state_change: now,
            opened_at: None,
            failure_threshold: options.failure_threshold,
            min_throughput: options.min_throughput,
            open_duration: options.open_duration,
            window: BucketWindow::new(options.bucket_count()?, options.bucket_duration()),
            stats: AggregateStats::default(),
            ramp: HalfOpenRamp::new(
                options.half_open_stages.clone(),
                options.stage_interval,
                options.half_open_max_requests,
            ),
        })
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Decides whether a call arriving at `now` may run.
    ///
    /// Admission may move the breaker from open to half-open, or along the half-open ramp,
    /// before deciding; such a change is returned alongside the decision.
    pub fn admit(&mut self, now: Instant) -> (Admission, Option<Transition>) {
        match self.state {
            CircuitState::Closed => {
                let admission = if self.is_failing() {
                    Admission::Rejected(DropReason::FailureRateExceeded)
                } else {
                    Admission::Accepted {
                        mode: ExecutionMode::Normal,
                    }
                };
                (admission, None)
            }
            CircuitState::Open => {
                if !self.open_elapsed(now) {
                    return (Admission::Rejected(DropReason::Open), None);
                }

                self.set_state(CircuitState::HalfOpen, now);
                (self.admit_probe(), Some(Transition::HalfOpened))
            }
            CircuitState::HalfOpen => {
                let transition = self.evaluate_stage(now);
                let admission = match self.state {
                    CircuitState::Closed => Admission::Accepted {
                        mode: ExecutionMode::Normal,
                    },
                    CircuitState::Open => Admission::Rejected(DropReason::Open),
                    CircuitState::HalfOpen => self.admit_probe(),
                };
                (admission, transition)
            }
        }
    }

    /// Whether a call arriving at `now` would be admitted, without changing anything.
    ///
    /// While half-open this looks at the current stage only; a stage evaluation that is due
    /// runs on the next real call.
    pub fn would_admit(&self, now: Instant) -> bool {
        match self.state {
            CircuitState::Closed => !self.is_failing(),
            CircuitState::Open => self.open_elapsed(now),
            CircuitState::HalfOpen => self.ramp.would_admit(),
        }
    }

    /// Counts an admitted request in the bucket covering `now` and returns that bucket.
    pub fn begin(&mut self, now: Instant) -> usize {
        let index = self.window.current_bucket(now, &mut self.stats);
        self.window.bucket_mut(index).record_request();
        self.stats.record_request();
        index
    }

    /// Records the outcome of a request started with [`begin`](Self::begin).
    pub fn complete(&mut self, index: usize, outcome: Outcome) {
        if outcome.is_failure() {
            self.window.bucket_mut(index).record_failure();
            self.stats.record_failure();
        }
    }

    /// Re-evaluates the state after a call completed.
    ///
    /// Running it again without new calls in between changes nothing.
    pub fn evaluate(&mut self, now: Instant) -> Option<Transition> {
        match self.state {
            CircuitState::Closed => {
                if !self.is_failing() {
                    return None;
                }

                let transition = Transition::Opened {
                    failure_rate: self.stats.effective_rate(),
                    throughput: self.stats.total_requests(),
                };
                self.opened_at = Some(now);
                self.set_state(CircuitState::Open, now);
                Some(transition)
            }
            CircuitState::Open => self.open_elapsed(now).then(|| {
                self.set_state(CircuitState::HalfOpen, now);
                Transition::HalfOpened
            }),
            CircuitState::HalfOpen => self.evaluate_stage(now),
        }
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let sum = self.window.sum();

        BreakerSnapshot {
            state: self.state,
            last_state_change: self.last_state_change,
            total_requests: self.stats.total_requests(),
            total_failures: self.stats.total_failures(),
            failure_rate: self.stats.failure_rate(),
            window_requests: sum.requests,
            window_failures: sum.failures,
            current_percentage: self.ramp.current_percentage(),
            stage: self.ramp.stage(),
        }
    }

    fn admit_probe(&mut self) -> Admission {
        if self.ramp.admit() {
            Admission::Accepted {
                mode: ExecutionMode::Probe,
            }
        } else {
            Admission::Rejected(DropReason::HalfOpenQuota)
        }
    }

    fn evaluate_stage(&mut self, now: Instant) -> Option<Transition> {
        match self.ramp.evaluate(now, self.stats.failure_rate(), self.failure_threshold) {
            StageStep::Hold => None,
            StageStep::Advanced { from, to } | StageStep::Regressed { from, to } => {
                // each stage is judged by its own probes
                self.window.reset();
                self.stats.reset();
                Some(Transition::StageChanged { from, to })
            }
            StageStep::Completed => {
                let open_duration = now.saturating_duration_since(self.opened_at.unwrap_or(self.last_state_change));
                self.opened_at = None;
                self.set_state(CircuitState::Closed, now);
                Some(Transition::Closed { open_duration })
            }
            StageStep::Exhausted => {
                self.set_state(CircuitState::Open, now);
                Some(Transition::Reopened)
            }
        }
    }

    fn is_failing(&self) -> bool {
        self.stats.total_requests() >= self.min_throughput && self.stats.effective_rate() >= self.failure_threshold
    }

    fn open_elapsed(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_state_change) > self.open_duration
    }

    fn set_state(&mut self, state: CircuitState, now: Instant) {
        self.state = state;
        self.last_state_change = now;
        self.window.reset();
        self.stats.reset();
        self.ramp.reset(now);
    }
}
