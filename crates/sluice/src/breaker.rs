// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;

use parking_lot::RwLock;
use tick::Clock;

use crate::engine::{Admission, EngineCore, EngineTelemetry, ExecutionMode};
use crate::{BreakerBuilder, BreakerOptions, BreakerSnapshot, CircuitState, ConfigError, ExecuteError, Outcome};

/// Adaptive circuit breaker guarding calls to one dependency.
///
/// Wrap each call to the dependency in [`execute`](Self::execute). The breaker counts the
/// outcome in its sliding window, trips when the failure rate reaches the threshold, and
/// recovers through a staged half-open ramp. See the [crate documentation](crate) for the
/// state machine.
///
/// # Locking
///
/// The breaker state sits behind a single lock. A tracked call holds the write lock from the
/// admission decision until its outcome has been recorded and evaluated, which includes the
/// time spent in the wrapped operation. Calls through the same breaker therefore never overlap;
/// long operations limit the breaker's throughput. [`allow`](Self::allow),
/// [`state`](Self::state) and [`snapshot`](Self::snapshot) only take the read lock.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use sluice::{Breaker, DropReason, ExecuteError};
/// use tick::ClockControl;
///
/// # fn main() -> Result<(), sluice::ConfigError> {
/// let clock_control = ClockControl::new();
/// let breaker = Breaker::builder("billing", &clock_control.to_clock())
///     .failure_threshold(0.5)
///     .min_throughput(2)
///     .open_duration(Duration::from_secs(10))
///     .build()?;
///
/// for _ in 0..2 {
///     let _ = breaker.execute(|| Err::<(), _>("unavailable"));
/// }
///
/// let result = breaker.execute(|| Ok::<_, &str>("served"));
/// assert!(matches!(
///     result,
///     Err(ExecuteError::RequestDropped(DropReason::Open))
/// ));
///
/// clock_control.advance(Duration::from_secs(11));
/// assert_eq!(breaker.execute(|| Ok::<_, &str>("served")).ok(), Some("served"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Breaker {
    core: RwLock<EngineCore>,
    telemetry: EngineTelemetry,
    clock: Clock,
}

impl Breaker {
    /// Starts building a breaker with the given name, used in logs and metrics.
    pub fn builder(name: impl Into<Cow<'static, str>>, clock: &Clock) -> BreakerBuilder {
        BreakerBuilder::new(name.into(), clock)
    }

    /// Creates a breaker from options, without logs or metrics.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the options are invalid.
    pub fn new(name: impl Into<Cow<'static, str>>, clock: &Clock, options: BreakerOptions) -> Result<Self, ConfigError> {
        Self::builder(name, clock).options(options).build()
    }

    pub(crate) fn from_parts(clock: Clock, options: &BreakerOptions, telemetry: EngineTelemetry) -> Result<Self, ConfigError> {
        let core = EngineCore::new(options, clock.instant())?;

        Ok(Self {
            core: RwLock::new(core),
            telemetry,
            clock,
        })
    }

    /// The breaker's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.telemetry.name
    }

    /// Runs `operation` if the breaker admits it, counting any `Err` as a failure.
    ///
    /// An operation that panics is counted as a failure before the panic continues.
    ///
    /// # Errors
    ///
    /// Returns [`ExecuteError::RequestDropped`] without running the operation when the breaker
    /// refuses the call, or [`ExecuteError::Operation`] with the operation's own error.
    pub fn execute<T, E>(&self, operation: impl FnOnce() -> Result<T, E>) -> Result<T, ExecuteError<E>> {
        self.execute_with(operation, Outcome::from_result)
    }

    /// Runs `operation` if the breaker admits it, letting `classify` decide how the result counts.
    ///
    /// The result itself is returned unchanged; classification only affects the statistics.
    ///
    /// ```rust
    /// use sluice::{Breaker, Outcome};
    /// # use tick::Clock;
    /// # fn main() -> Result<(), sluice::ConfigError> {
    /// # let breaker = Breaker::builder("search", &Clock::new_frozen()).build()?;
    ///
    /// // a "not found" answer means the dependency is healthy
    /// let result = breaker.execute_with(
    ///     || Err::<String, _>(std::io::Error::from(std::io::ErrorKind::NotFound)),
    ///     |result| match result {
    ///         Err(error) if error.kind() == std::io::ErrorKind::NotFound => Outcome::Success,
    ///         other => Outcome::from_result(other),
    ///     },
    /// );
    ///
    /// assert!(result.is_err());
    /// assert_eq!(breaker.snapshot().total_failures(), 0);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute).
    pub fn execute_with<T, E>(
        &self,
        operation: impl FnOnce() -> Result<T, E>,
        classify: impl FnOnce(&Result<T, E>) -> Outcome,
    ) -> Result<T, ExecuteError<E>> {
        let mut core = self.core.write();
        let now = self.clock.instant();

        let (admission, transition) = core.admit(now);
        if let Some(transition) = transition {
            self.telemetry.transition(transition);
        }

        let mode = match admission {
            Admission::Accepted { mode } => mode,
            Admission::Rejected(reason) => {
                self.telemetry.rejected(reason, core.state());
                return Err(ExecuteError::RequestDropped(reason));
            }
        };

        let bucket = core.begin(now);
        let call = InFlightCall {
            breaker: self,
            core: &mut *core,
            bucket: Some(bucket),
            mode,
        };
        let result = operation();
        call.finish(classify(&result));

        result.map_err(ExecuteError::Operation)
    }

    /// Whether a call made now would be admitted.
    ///
    /// This is a read-only peek: nothing is counted and no state changes. While half-open it
    /// reflects the current stage's quota only, since a stage evaluation that is due runs on
    /// the next tracked call.
    #[must_use]
    pub fn allow(&self) -> bool {
        self.core.read().would_admit(self.clock.instant())
    }

    /// Re-evaluates the state against the current time and returns the resulting state.
    ///
    /// Tracked calls evaluate on their own; this is useful to move an idle breaker forward,
    /// for example before reporting its state. Evaluating twice in a row has no further effect.
    pub fn evaluate(&self) -> CircuitState {
        let mut core = self.core.write();

        if let Some(transition) = core.evaluate(self.clock.instant()) {
            self.telemetry.transition(transition);
        }

        core.state()
    }

    /// The current circuit state, without re-evaluating it.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.core.read().state()
    }

    /// A consistent view of the breaker's state and statistics.
    #[must_use]
    pub fn snapshot(&self) -> BreakerSnapshot {
        self.core.read().snapshot()
    }
}

/// A call that was admitted and counted but whose outcome is not recorded yet.
///
/// If the operation unwinds before [`finish`](Self::finish) runs, the call is settled as a
/// failure when the guard drops.
struct InFlightCall<'a> {
    breaker: &'a Breaker,
    core: &'a mut EngineCore,
    bucket: Option<usize>,
    mode: ExecutionMode,
}

impl InFlightCall<'_> {
    fn finish(mut self, outcome: Outcome) {
        self.settle(outcome);
    }

    fn settle(&mut self, outcome: Outcome) {
        let Some(bucket) = self.bucket.take() else {
            return;
        };

        self.core.complete(bucket, outcome);

        if self.mode == ExecutionMode::Probe {
            self.breaker.telemetry.probe(outcome);
        }

        if let Some(transition) = self.core.evaluate(self.breaker.clock.instant()) {
            self.breaker.telemetry.transition(transition);
        }
    }
}

impl Drop for InFlightCall<'_> {
    fn drop(&mut self) {
        self.settle(Outcome::Failure);
    }
}
