//! PID with backward Euler integration and derivative on measurement.
//!
//! The derivative term acts on a measured rate supplied by the caller
//! (spool velocity or filtered dF/dt), never on the error, so reference
//! steps do not kick the output. Zero Ki disables the integral; zero Kd
//! disables the derivative.

/// Internal state of the PID controller.
///
/// Only the integral accumulator survives between ticks. It is kept across
/// control mode changes and cleared only by [`PidState::reset`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PidState {
    /// Integral accumulator [output units].
    integral: f64,
}

impl PidState {
    /// Reset all internal state to zero.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Current integral contribution.
    #[inline]
    pub fn integral(&self) -> f64 {
        self.integral
    }
}

/// PID gains.
#[derive(Debug, Clone, Copy)]
pub struct PidGains {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain (0 = disabled).
    pub ki: f64,
    /// Derivative gain (0 = disabled).
    pub kd: f64,
}

/// Compute one PID cycle using backward Euler integration.
///
/// # Arguments
/// - `state`: Mutable PID internal state.
/// - `gains`: PID gains.
/// - `error`: Reference minus measurement.
/// - `rate`: Time derivative of the measurement.
/// - `dt`: Cycle period [s].
///
/// # Returns
/// `kp·error + ∫ki·error·dt − kd·rate` (unsaturated; limiting happens in
/// the safety stage).
#[inline]
pub fn pid_compute(state: &mut PidState, gains: &PidGains, error: f64, rate: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }

    // ── P term ──────────────────────────────────────────────
    let p_term = gains.kp * error;

    // ── I term (backward Euler) ─────────────────────────────
    let i_term = if gains.ki != 0.0 {
        state.integral += gains.ki * error * dt;
        state.integral
    } else {
        state.integral = 0.0;
        0.0
    };

    // ── D term (on measurement) ─────────────────────────────
    let d_term = if gains.kd != 0.0 { -gains.kd * rate } else { 0.0 };

    p_term + i_term + d_term
}

// ─── Tests ──────────────────────────────────────────────────────────
