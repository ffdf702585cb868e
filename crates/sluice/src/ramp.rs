// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::constants::{CLOSE_PERCENTAGE, QUOTA_TOLERANCE, REGRESSION_FAILURE_RATE};

/// Result of evaluating the current half-open stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum StageStep {
    /// Not enough time or no probes yet; stay on the current stage.
    Hold,

    /// Probes were healthy; moved to a stage admitting more traffic.
    Advanced { from: f64, to: f64 },

    /// Probes mostly failed; moved back to a stage admitting less traffic.
    Regressed { from: f64, to: f64 },

    /// Probes were healthy and the ramp reached full traffic.
    Completed,

    /// Probes mostly failed on the first stage; there is nothing to fall back to.
    Exhausted,
}

/// Staged traffic ramp used while the circuit is half-open.
///
/// Each stage admits a fraction of the arriving calls. Admission is credit based. The credit
/// starts full at the quota and every admitted call spends one unit. A call arriving while the
/// credit sits on a whole unit, or on the quota itself, is let through. Otherwise it adds the
/// stage percentage to the credit, capped at the quota, and is let through only if that lands
/// the credit on such a level.
///
/// With a quota of one this admits one call in every `ceil(1 / percentage)` arrivals. A larger
/// quota lets up to `floor(quota)` calls through back to back whenever the credit is full,
/// which happens at the start of every stage.
#[derive(Debug, Clone)]
pub(crate) struct HalfOpenRamp {
    stages: Arc<[f64]>,
    stage_interval: Duration,
    max_requests: f64,
    stage: Option<usize>,
    checkpoint: Option<Instant>,
    credit: f64,
}

impl HalfOpenRamp {
    pub fn new(stages: impl Into<Arc<[f64]>>, stage_interval: Duration, max_requests: f64) -> Self {
        let stages = stages.into();
        debug_assert!(!stages.is_empty(), "ramp needs at least one stage");

        Self {
            stages,
            stage_interval,
            max_requests,
            stage: None,
            checkpoint: None,
            credit: 0.0,
        }
    }

    /// Puts the ramp on its first stage with full credit.
    pub fn reset(&mut self, now: Instant) {
        self.enter_stage(0, now);
    }

    /// Fraction of traffic admitted by the current stage, zero before the first reset.
    pub fn current_percentage(&self) -> f64 {
        self.stage.map_or(0.0, |index| self.stages[index])
    }

    pub fn stage(&self) -> Option<usize> {
        self.stage
    }

    pub fn allowed_request_quota(&self) -> f64 {
        (self.max_requests * self.current_percentage()).max(1.0)
    }

    /// Counts an arriving call and decides whether it is admitted as a probe.
    pub fn admit(&mut self) -> bool {
        if self.stage.is_none() {
            return false;
        }

        if !self.at_level(self.credit) {
            self.credit = self.replenished_credit();
            if !self.at_level(self.credit) {
                return false;
            }
        }

        self.credit -= 1.0;
        true
    }

    /// Whether [`admit`](Self::admit) would let a call through, without counting it.
    pub fn would_admit(&self) -> bool {
        self.stage.is_some() && (self.at_level(self.credit) || self.at_level(self.replenished_credit()))
    }

    pub fn next_step(&self) -> Option<usize> {
        let next = self.stage? + 1;
        (next < self.stages.len()).then_some(next)
    }

    pub fn previous_step(&self) -> Option<usize> {
        self.stage?.checked_sub(1)
    }

    /// Judges the current stage by the failure rate of its probes.
    ///
    /// Nothing happens until more than the stage interval has passed since the stage started
    /// or was last judged, and until at least one probe completed.
    pub fn evaluate(&mut self, now: Instant, failure_rate: Option<f64>, failure_threshold: f64) -> StageStep {
        let Some(checkpoint) = self.checkpoint else {
            return StageStep::Hold;
        };

        if now.saturating_duration_since(checkpoint) <= self.stage_interval {
            return StageStep::Hold;
        }

        let Some(rate) = failure_rate else {
            return StageStep::Hold;
        };

        let from = self.current_percentage();

        if rate > REGRESSION_FAILURE_RATE {
            return match self.previous_step() {
                Some(previous) => {
                    self.enter_stage(previous, now);
                    StageStep::Regressed {
                        from,
                        to: self.current_percentage(),
                    }
                }
                None => StageStep::Exhausted,
            };
        }

        if rate < failure_threshold {
            return match self.next_step() {
                Some(next) => {
                    self.enter_stage(next, now);
                    let to = self.current_percentage();
                    if to > CLOSE_PERCENTAGE {
                        StageStep::Completed
                    } else {
                        StageStep::Advanced { from, to }
                    }
                }
                None => StageStep::Completed,
            };
        }

        self.checkpoint = Some(now);
        StageStep::Hold
    }

    fn enter_stage(&mut self, index: usize, now: Instant) {
        self.stage = Some(index);
        self.checkpoint = Some(now);
        self.credit = self.allowed_request_quota();
    }

    fn replenished_credit(&self) -> f64 {
        (self.credit + self.current_percentage()).min(self.allowed_request_quota())
    }

    /// Whether the credit sits on the quota, or on a whole unit between one and the quota.
    fn at_level(&self, credit: f64) -> bool {
        let quota = self.allowed_request_quota();
        if (quota - credit).abs() < QUOTA_TOLERANCE {
            return true;
        }

        let level = credit.round();
        (1.0..=quota).contains(&level) && (level - credit).abs() < QUOTA_TOLERANCE
    }
}
