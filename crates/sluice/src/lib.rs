// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(
    not(all(feature = "logs", feature = "metrics", feature = "http")),
    expect(
        rustdoc::broken_intra_doc_links,
        reason = "links to feature-gated items only resolve with every feature enabled"
    )
)]

//! Adaptive circuit breaker for fallible operations.
//!
//! A [`Breaker`] watches the outcomes of the operations it wraps over a sliding time window.
//! When the failure rate inside the window reaches the configured threshold, the circuit
//! opens and further calls are dropped early, without reaching the protected dependency.
//! After the open duration elapses the breaker does not snap back to full traffic. Instead
//! it enters a half-open ramp that re-admits a growing fraction of calls in stages
//! (10%, 30%, 50%, 75% and finally 100% by default), moving forward while the dependency
//! stays healthy and backing off when it does not.
//!
//! # Sliding window
//!
//! Outcomes are counted into a ring of time buckets, `window_seconds * buckets_per_second`
//! of them. As time passes the oldest buckets are evicted and their counts subtracted from
//! the running totals, so the failure rate is always available in constant time.
//!
//! # States
//!
//! - [`CircuitState::Closed`]: calls flow through while the failure rate stays below the
//!   threshold.
//! - [`CircuitState::Open`]: calls are rejected with [`ExecuteError::RequestDropped`] until
//!   the open duration elapses.
//! - [`CircuitState::HalfOpen`]: a fraction of calls is admitted as probes. Once a stage has
//!   been observed for longer than the stage interval, the breaker advances to the next stage
//!   if the probes were healthy, or regresses when more than 90% of them failed. Completing
//!   the ramp closes the circuit; failing the first stage reopens it.
//!
//! There are no background timers. All time-based transitions are evaluated when the breaker
//! is called, against the injected [`Clock`](tick::Clock).
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use sluice::{Breaker, ExecuteError};
//! use tick::Clock;
//!
//! # fn main() -> Result<(), sluice::ConfigError> {
//! # let clock = Clock::new_frozen();
//! let breaker = Breaker::builder("inventory", &clock)
//!     .window_seconds(10)
//!     .buckets_per_second(2)
//!     .failure_threshold(0.5)
//!     .open_duration(Duration::from_secs(5))
//!     .build()?;
//!
//! let result: Result<u32, ExecuteError<std::io::Error>> = breaker.execute(|| Ok(42));
//! assert_eq!(result.ok(), Some(42));
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! A breaker is `Send + Sync` and is meant to be shared, for example through an
//! [`Arc`](std::sync::Arc). Each tracked call holds the breaker's write lock for its whole
//! duration, including the wrapped operation, so calls through one breaker are serialized.
//! Use one breaker per dependency and keep the wrapped operations short.
//!
//! # Features
//!
//! - `logs`: emits `tracing` events on rejections, probes and state transitions, once enabled
//!   with [`BreakerBuilder::enable_logs`].
//! - `metrics`: reports a `resilience.event` counter through OpenTelemetry, once enabled
//!   with [`BreakerBuilder::enable_metrics`].
//! - `serde`: makes [`BreakerOptions`] serializable.
//! - `http`: adds [`Breaker::send`] and the [`http::Requester`] trait for request-shaped calls.

mod breaker;
mod builder;
mod constants;
mod engine;
mod error;
mod options;
mod outcome;
mod ramp;
mod snapshot;
mod state;
#[cfg(any(feature = "metrics", test))]
mod telemetry;
mod window;

#[cfg(any(feature = "http", test))]
#[cfg_attr(docsrs, doc(cfg(feature = "http")))]
pub mod http;

pub use breaker::Breaker;
pub use builder::BreakerBuilder;
pub use error::{ConfigError, DropReason, ExecuteError};
pub use options::BreakerOptions;
pub use outcome::Outcome;
pub use snapshot::BreakerSnapshot;
pub use state::CircuitState;

#[cfg(test)]
mod testing;
