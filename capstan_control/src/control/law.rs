//! Control laws for the built-in control modes.
//!
//! Each law maps a physical reference and the sensed state to a motor
//! torque [Nm]. Limiting happens afterwards in the safety stage.
//!
//! | Mode | Law |
//! |------|-----|
//! | Torque | `τ = ref` |
//! | Position | `τ = Kp·(ref − θ) − Kd·ω` |
//! | Force | `τ = Kp·e + ∫Ki·e·dt − Kd·dF + ff·ref` |
//! | ForceHybrid | `τ = Kp·e + ∫Ki·e·dt − Kd·ω + ff·ref` |

use capstan_common::device::params::Params;

use super::pid::{PidGains, PidState, pid_compute};

/// Sensed state a law feeds back on.
#[derive(Debug, Clone, Copy, Default)]
pub struct Feedback {
    /// Spool angle [deg].
    pub spool_position: f64,
    /// Spool speed [deg/s].
    pub spool_velocity: f64,
    /// Conditioned force [N].
    pub force: f64,
    /// Conditioned force derivative [N/s].
    pub dforce: f64,
}

/// Open-loop torque: the reference is the torque.
#[inline]
pub fn torque_law(reference: f64) -> f64 {
    reference
}

/// Spool position PD.
#[inline]
pub fn position_law(
    state: &mut PidState,
    params: &Params,
    reference: f64,
    fb: &Feedback,
    dt: f64,
) -> f64 {
    let gains = PidGains {
        kp: params.position_kp,
        ki: 0.0,
        kd: params.position_kd,
    };
    pid_compute(state, &gains, reference - fb.spool_position, fb.spool_velocity, dt)
}

/// Force PID with feed-forward, damping on the force derivative.
#[inline]
pub fn force_law(state: &mut PidState, params: &Params, reference: f64, fb: &Feedback, dt: f64) -> f64 {
    force_pid(state, params, reference, fb.force, fb.dforce, dt)
}

/// Force PID with feed-forward, damping on spool velocity.
#[inline]
pub fn force_hybrid_law(
    state: &mut PidState,
    params: &Params,
    reference: f64,
    fb: &Feedback,
    dt: f64,
) -> f64 {
    force_pid(state, params, reference, fb.force, fb.spool_velocity, dt)
}

fn force_pid(
    state: &mut PidState,
    params: &Params,
    reference: f64,
    force: f64,
    rate: f64,
    dt: f64,
) -> f64 {
    let gains = PidGains {
        kp: params.force_kp,
        ki: params.force_ki,
        kd: params.force_kd,
    };
    pid_compute(state, &gains, reference - force, rate, dt) + params.force_ff * reference
}
