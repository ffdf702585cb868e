// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::time::Duration;

use tick::Clock;

use crate::engine::EngineTelemetry;
use crate::{Breaker, BreakerOptions, ConfigError};

/// Builder for a [`Breaker`], created by [`Breaker::builder`].
///
/// Options are validated when [`build`](Self::build) is called.
#[derive(Debug)]
#[must_use]
pub struct BreakerBuilder {
    clock: Clock,
    options: BreakerOptions,
    telemetry: EngineTelemetry,
}

impl BreakerBuilder {
    pub(crate) fn new(name: Cow<'static, str>, clock: &Clock) -> Self {
        Self {
            clock: clock.clone(),
            options: BreakerOptions::default(),
            telemetry: EngineTelemetry::new(name),
        }
    }

    /// Replaces all options at once, for example with options loaded from a configuration file.
    pub fn options(mut self, options: BreakerOptions) -> Self {
        self.options = options;
        self
    }

    /// Length of the sliding window in whole seconds.
    ///
    /// **Default**: 10
    pub fn window_seconds(mut self, window_seconds: u32) -> Self {
        self.options.window_seconds = window_seconds;
        self
    }

    /// Number of buckets each second of the window is split into.
    ///
    /// More buckets make old outcomes expire more smoothly. The window holds
    /// `window_seconds * buckets_per_second` buckets.
    ///
    /// **Default**: 1
    pub fn buckets_per_second(mut self, buckets_per_second: u32) -> Self {
        self.options.buckets_per_second = buckets_per_second;
        self
    }

    /// Failure rate in `(0, 1)` at which the circuit trips.
    ///
    /// **Default**: 0.5
    pub fn failure_threshold(mut self, failure_threshold: f64) -> Self {
        self.options.failure_threshold = failure_threshold;
        self
    }

    /// Minimum number of requests in the window before the failure rate can trip the circuit.
    ///
    /// **Default**: 1
    pub fn min_throughput(mut self, min_throughput: u64) -> Self {
        self.options.min_throughput = min_throughput;
        self
    }

    /// How long the circuit stays open before the half-open ramp starts.
    ///
    /// **Default**: 5 seconds
    pub fn open_duration(mut self, open_duration: Duration) -> Self {
        self.options.open_duration = open_duration;
        self
    }

    /// Traffic fractions admitted while half-open, in order.
    ///
    /// **Default**: `[0.1, 0.3, 0.5, 0.75, 1.0]`
    pub fn half_open_stages(mut self, stages: impl Into<Vec<f64>>) -> Self {
        self.options.half_open_stages = stages.into();
        self
    }

    /// How long each half-open stage is observed before it is judged.
    ///
    /// **Default**: 1 second
    pub fn stage_interval(mut self, stage_interval: Duration) -> Self {
        self.options.stage_interval = stage_interval;
        self
    }

    /// Scale of the half-open admission quota.
    ///
    /// A stage's quota is `max_requests` times its percentage, and at least one. At the start of
    /// each stage up to `floor(quota)` calls are admitted back to back; after that the stage
    /// percentage paces admission. With the default of one, a stage at percentage `p` admits
    /// one call in every `ceil(1 / p)` arrivals.
    ///
    /// **Default**: 1.0
    pub fn half_open_max_requests(mut self, max_requests: f64) -> Self {
        self.options.half_open_max_requests = max_requests;
        self
    }

    /// Enables structured logging of rejections, probes and transitions.
    #[cfg(any(feature = "logs", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "logs")))]
    pub fn enable_logs(mut self) -> Self {
        self.telemetry.logs_enabled = true;
        self
    }

    /// Enables metrics reporting with the given OpenTelemetry meter provider.
    #[cfg(any(feature = "metrics", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
    pub fn enable_metrics(mut self, provider: &dyn opentelemetry::metrics::MeterProvider) -> Self {
        let meter = crate::telemetry::create_meter(provider);
        self.telemetry.event_reporter = Some(crate::telemetry::create_resilience_event_counter(&meter));
        self
    }

    /// Validates the options and creates the breaker.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first invalid option.
    pub fn build(self) -> Result<Breaker, ConfigError> {
        Breaker::from_parts(self.clock, &self.options, self.telemetry)
    }
}
