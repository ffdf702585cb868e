// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The breaker's state machine and the telemetry reported around it.

mod engine_core;
mod engine_telemetry;

use std::time::Duration;

pub(crate) use engine_core::EngineCore;
pub(crate) use engine_telemetry::EngineTelemetry;

#[cfg(any(feature = "metrics", feature = "logs", test))]
use crate::CircuitState;
use crate::DropReason;

/// How an admitted call is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExecutionMode {
    /// Regular call through a closed circuit.
    Normal,

    /// Call admitted by the half-open ramp to test the dependency.
    Probe,
}

/// Admission decision for an arriving call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Accepted { mode: ExecutionMode },
    Rejected(DropReason),
}

/// A state change, or a stage change within the half-open state.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    not(any(feature = "logs", test)),
    expect(dead_code, reason = "details are only reported through logs")
)]
pub(crate) enum Transition {
    /// Closed to open; carries the window health that tripped the circuit.
    Opened { failure_rate: f64, throughput: u64 },

    /// Open to half-open.
    HalfOpened,

    /// The half-open ramp moved between stages.
    StageChanged { from: f64, to: f64 },

    /// Half-open back to open after the first stage failed.
    Reopened,

    /// Half-open to closed; carries the time since the circuit first opened.
    Closed { open_duration: Duration },
}

impl Transition {
    /// State the breaker is in after the transition.
    #[cfg(any(feature = "metrics", feature = "logs", test))]
    pub fn state(self) -> CircuitState {
        match self {
            Self::Opened { .. } | Self::Reopened => CircuitState::Open,
            Self::HalfOpened | Self::StageChanged { .. } => CircuitState::HalfOpen,
            Self::Closed { .. } => CircuitState::Closed,
        }
    }
}
