// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;

#[cfg(any(feature = "metrics", test))]
use opentelemetry::KeyValue;

use super::Transition;
#[cfg(any(feature = "metrics", test))]
use crate::telemetry::*;
use crate::{CircuitState, DropReason, Outcome};

/// Reports rejections, probes and transitions of a breaker as logs and metrics.
///
/// Each channel is off unless enabled on the builder; with the corresponding cargo feature
/// disabled the reporting compiles away.
#[derive(Debug, Clone)]
pub(crate) struct EngineTelemetry {
    pub(crate) name: Cow<'static, str>,
    #[cfg(any(feature = "logs", test))]
    pub(crate) logs_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    pub(crate) event_reporter: Option<opentelemetry::metrics::Counter<u64>>,
}

impl EngineTelemetry {
    pub fn new(name: Cow<'static, str>) -> Self {
        Self {
            name,
            #[cfg(any(feature = "logs", test))]
            logs_enabled: false,
            #[cfg(any(feature = "metrics", test))]
            event_reporter: None,
        }
    }

    #[cfg_attr(
        not(any(feature = "metrics", feature = "logs", test)),
        expect(unused_variables, reason = "unused when neither logs nor metrics are compiled in")
    )]
    pub fn rejected(&self, reason: DropReason, state: CircuitState) {
        #[cfg(any(feature = "metrics", test))]
        self.report_metrics(&[
            KeyValue::new(STRATEGY_NAME, self.name.clone()),
            KeyValue::new(EVENT_NAME, CIRCUIT_REJECTED_EVENT_NAME),
            KeyValue::new(CIRCUIT_STATE, state.as_str()),
            KeyValue::new(CIRCUIT_DROP_REASON, reason.as_str()),
        ]);

        #[cfg(any(feature = "logs", test))]
        if self.logs_enabled {
            tracing::event!(
                name: "sluice.circuit_breaker.rejected",
                tracing::Level::WARN,
                breaker.name = %self.name,
                circuit_breaker.state = state.as_str(),
                circuit_breaker.drop_reason = reason.as_str(),
            );
        }
    }

    #[cfg_attr(
        not(any(feature = "metrics", feature = "logs", test)),
        expect(unused_variables, reason = "unused when neither logs nor metrics are compiled in")
    )]
    pub fn probe(&self, outcome: Outcome) {
        #[cfg(any(feature = "metrics", test))]
        self.report_metrics(&[
            KeyValue::new(STRATEGY_NAME, self.name.clone()),
            KeyValue::new(EVENT_NAME, CIRCUIT_PROBE_EVENT_NAME),
            KeyValue::new(CIRCUIT_STATE, CircuitState::HalfOpen.as_str()),
            KeyValue::new(CIRCUIT_PROBE_RESULT, outcome.as_str()),
        ]);

        #[cfg(any(feature = "logs", test))]
        if self.logs_enabled {
            tracing::event!(
                name: "sluice.circuit_breaker.probe",
                tracing::Level::DEBUG,
                breaker.name = %self.name,
                circuit_breaker.state = CircuitState::HalfOpen.as_str(),
                circuit_breaker.probe.result = outcome.as_str(),
            );
        }
    }

    #[cfg_attr(
        not(any(feature = "metrics", feature = "logs", test)),
        expect(unused_variables, reason = "unused when neither logs nor metrics are compiled in")
    )]
    pub fn transition(&self, transition: Transition) {
        #[cfg(any(feature = "metrics", test))]
        self.report_metrics(&[
            KeyValue::new(STRATEGY_NAME, self.name.clone()),
            KeyValue::new(EVENT_NAME, event_name(transition)),
            KeyValue::new(CIRCUIT_STATE, transition.state().as_str()),
        ]);

        #[cfg(any(feature = "logs", test))]
        if self.logs_enabled {
            self.log_transition(transition);
        }
    }

    #[cfg(any(feature = "logs", test))]
    fn log_transition(&self, transition: Transition) {
        let state = transition.state().as_str();

        match transition {
            Transition::Opened {
                failure_rate,
                throughput,
            } => tracing::event!(
                name: "sluice.circuit_breaker.opened",
                tracing::Level::WARN,
                breaker.name = %self.name,
                circuit_breaker.state = state,
                circuit_breaker.health.failure_rate = failure_rate,
                circuit_breaker.health.throughput = throughput,
            ),
            Transition::HalfOpened => tracing::event!(
                name: "sluice.circuit_breaker.half_opened",
                tracing::Level::INFO,
                breaker.name = %self.name,
                circuit_breaker.state = state,
            ),
            Transition::StageChanged { from, to } => tracing::event!(
                name: "sluice.circuit_breaker.stage_changed",
                tracing::Level::INFO,
                breaker.name = %self.name,
                circuit_breaker.state = state,
                circuit_breaker.stage.from = from,
                circuit_breaker.stage.to = to,
            ),
            Transition::Reopened => tracing::event!(
                name: "sluice.circuit_breaker.reopened",
                tracing::Level::WARN,
                breaker.name = %self.name,
                circuit_breaker.state = state,
            ),
            Transition::Closed { open_duration } => tracing::event!(
                name: "sluice.circuit_breaker.closed",
                tracing::Level::INFO,
                breaker.name = %self.name,
                circuit_breaker.state = state,
                circuit_breaker.open.duration = open_duration.as_secs_f64(),
            ),
        }
    }

    #[cfg(any(feature = "metrics", test))]
    fn report_metrics(&self, attributes: &[KeyValue]) {
        if let Some(reporter) = &self.event_reporter {
            reporter.add(1, attributes);
        }
    }
}

#[cfg(any(feature = "metrics", test))]
fn event_name(transition: Transition) -> &'static str {
    match transition {
        Transition::Opened { .. } => CIRCUIT_OPENED_EVENT_NAME,
        Transition::HalfOpened => CIRCUIT_HALF_OPENED_EVENT_NAME,
        Transition::StageChanged { .. } => CIRCUIT_STAGE_CHANGED_EVENT_NAME,
        Transition::Reopened => CIRCUIT_REOPENED_EVENT_NAME,
        Transition::Closed { .. } => CIRCUIT_CLOSED_EVENT_NAME,
    }
}
