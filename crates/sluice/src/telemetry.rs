// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use opentelemetry::InstrumentationScope;
use opentelemetry::metrics::{Counter, Meter, MeterProvider};

const METER_NAME: &str = "sluice";
const VERSION: &str = "v0.1.0";
const SCHEMA_URL: &str = "https://opentelemetry.io/schemas/1.47.0";

/// Key used to annotate the name of the breaker reporting the event.
pub(crate) const STRATEGY_NAME: &str = "resilience.strategy.name";

/// Key used to annotate the specific resilience event being emitted.
pub(crate) const EVENT_NAME: &str = "resilience.event.name";

/// Key used to annotate the circuit state after the event.
pub(crate) const CIRCUIT_STATE: &str = "resilience.circuit_breaker.state";

/// Key used to annotate the outcome of a half-open probe.
pub(crate) const CIRCUIT_PROBE_RESULT: &str = "resilience.circuit_breaker.probe.result";

/// Key used to annotate why a call was dropped.
pub(crate) const CIRCUIT_DROP_REASON: &str = "resilience.circuit_breaker.drop_reason";

pub(crate) const CIRCUIT_OPENED_EVENT_NAME: &str = "circuit_opened";
pub(crate) const CIRCUIT_HALF_OPENED_EVENT_NAME: &str = "circuit_half_opened";
pub(crate) const CIRCUIT_STAGE_CHANGED_EVENT_NAME: &str = "circuit_stage_changed";
pub(crate) const CIRCUIT_REOPENED_EVENT_NAME: &str = "circuit_reopened";
pub(crate) const CIRCUIT_CLOSED_EVENT_NAME: &str = "circuit_closed";
pub(crate) const CIRCUIT_REJECTED_EVENT_NAME: &str = "circuit_rejected";
pub(crate) const CIRCUIT_PROBE_EVENT_NAME: &str = "circuit_probe";

pub(crate) fn create_meter(meter_provider: &dyn MeterProvider) -> Meter {
    meter_provider.meter_with_scope(
        InstrumentationScope::builder(METER_NAME)
            .with_version(VERSION)
            .with_schema_url(SCHEMA_URL)
            .build(),
    )
}

pub(crate) fn create_resilience_event_counter(meter: &Meter) -> Counter<u64> {
    meter
        .u64_counter("resilience.event")
        .with_description("Emitted upon the occurrence of a resilience event.")
        .with_unit("u64")
        .build()
}
