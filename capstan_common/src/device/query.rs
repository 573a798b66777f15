//! Per-device state snapshot.

use serde::Serialize;

use crate::device::limits::LimitViolation;
use crate::device::params::{ControlMode, FilterMode};

/// Snapshot of one Capstan Module's sensed and commanded state.
///
/// Produced once per tick by the controller and on demand by
/// `query(true)`. Every field of one snapshot is taken under the same
/// device lock, so a `Query` is always internally consistent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Query {
    // ─── Timing ─────────────────────────────────────
    /// Hub time of the update that produced this snapshot [s].
    pub time: f64,
    /// Number of updates the device has run.
    pub ticks: u64,

    // ─── State ──────────────────────────────────────
    /// Amplifier enable output.
    pub enabled: bool,
    /// Amplifier fault input.
    pub fault: bool,
    /// Active control law.
    pub control_mode: ControlMode,
    /// Active force conditioning.
    pub filter_mode: FilterMode,

    // ─── Kinematics ─────────────────────────────────
    /// Encoder position relative to the last `zero_position` [counts].
    pub encoder_counts: i64,
    /// Motor angle [deg].
    pub motor_position: f64,
    /// Motor speed [deg/s].
    pub motor_velocity: f64,
    /// Spool angle [deg].
    pub spool_position: f64,
    /// Spool speed [deg/s].
    pub spool_velocity: f64,

    // ─── Force ──────────────────────────────────────
    /// Calibrated force before conditioning [N].
    pub force: f64,
    /// Conditioned force used as feedback [N].
    pub force_filtered: f64,
    /// Backward difference of calibrated force [N/s].
    pub dforce: f64,
    /// Conditioned force derivative [N/s].
    pub dforce_filtered: f64,

    // ─── Control value pipeline ─────────────────────
    /// Control value as last set.
    pub ctrl_value: f64,
    /// Control value after optional smoothing and clamping.
    pub ctrl_value_filtered: f64,
    /// Physical reference derived from the control value.
    pub reference: f64,

    // ─── Actuation ──────────────────────────────────
    /// Torque requested by the control law [Nm].
    pub law_torque: f64,
    /// Torque after safety limiting [Nm].
    pub torque: f64,
    /// Voltage written to the command output [V].
    pub command_volts: f64,
    /// Force integrator state [Nm].
    pub force_integral: f64,

    // ─── Safety ─────────────────────────────────────
    /// Limits violated during this tick.
    pub limits: LimitViolation,
    /// Cumulative ticks zeroed for over-speed.
    pub velocity_violations: u64,
    /// Cumulative ticks zeroed for over-torque or a non-finite law output.
    pub torque_violations: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_is_idle() {
        let q = Query::default();
        assert!(!q.enabled);
        assert_eq!(q.control_mode, ControlMode::Torque);
        assert!(q.limits.is_empty());
        assert_eq!(q.ticks, 0);
    }
}
