//! Soft velocity and torque limiting.
//!
//! A tick whose spool speed or requested torque exceeds the configured
//! maximum, or whose torque is not finite, writes zero torque for that tick
//! only. The next in-range tick drives the motor again.

use capstan_common::consts::{LIMIT_LOG_EVERY, LIMIT_LOG_FIRST};
use capstan_common::device::limits::LimitViolation;
use tracing::warn;

/// Input for one limit evaluation.
#[derive(Debug, Clone, Copy)]
pub struct LimitInput {
    /// Sensed spool speed [deg/s].
    pub spool_velocity: f64,
    /// Torque requested by the control law [Nm].
    pub torque: f64,
    /// Spool speed limit [deg/s].
    pub velocity_max: f64,
    /// Torque limit [Nm].
    pub torque_max: f64,
}

/// Result of one limit evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitOutcome {
    /// Limits violated this tick.
    pub flags: LimitViolation,
    /// Torque to command [Nm].
    pub torque: f64,
}

/// Per-device violation counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyLimiter {
    velocity_violations: u64,
    torque_violations: u64,
}

#[inline]
fn should_log(count: u64) -> bool {
    count <= LIMIT_LOG_FIRST || count % LIMIT_LOG_EVERY == 0
}

impl SafetyLimiter {
    /// Cumulative over-speed ticks.
    pub fn velocity_violations(&self) -> u64 {
        self.velocity_violations
    }

    /// Cumulative over-torque or non-finite ticks.
    pub fn torque_violations(&self) -> u64 {
        self.torque_violations
    }

    /// Evaluate the limits for one tick, counting and logging violations.
    pub fn check(&mut self, device: &str, input: &LimitInput) -> LimitOutcome {
        let mut flags = LimitViolation::empty();

        if input.spool_velocity.abs() > input.velocity_max {
            flags |= LimitViolation::VELOCITY;
            self.velocity_violations += 1;
            if should_log(self.velocity_violations) {
                warn!(
                    device,
                    velocity = input.spool_velocity,
                    limit = input.velocity_max,
                    count = self.velocity_violations,
                    "Spool velocity limit exceeded, command zeroed"
                );
            }
        }

        if !input.torque.is_finite() {
            flags |= LimitViolation::NON_FINITE;
        } else if input.torque.abs() > input.torque_max {
            flags |= LimitViolation::TORQUE;
        }
        if flags.intersects(LimitViolation::TORQUE | LimitViolation::NON_FINITE) {
            self.torque_violations += 1;
            if should_log(self.torque_violations) {
                warn!(
                    device,
                    torque = input.torque,
                    limit = input.torque_max,
                    count = self.torque_violations,
                    "Torque limit exceeded, command zeroed"
                );
            }
        }

        LimitOutcome {
            flags,
            torque: if flags.blocks_output() { 0.0 } else { input.torque },
        }
    }
}
