//! Capstan Module parameters, control modes and reference scaling.
//!
//! `Params` is a plain value: the controller snapshots it by copy, so a
//! setter running on another thread can never tear an in-flight query.
//! Every setter validates its input and leaves `Params` untouched on error.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::consts::MEDIAN_WINDOW_MAX;

/// Active control law of a device. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Open-loop torque, control value in [-1, 1].
    #[default]
    Torque,
    /// PD on spool position, control value in [0, 1].
    Position,
    /// PID on filtered force with feed-forward, control value in [0, 1].
    Force,
    /// Force PID whose derivative term uses spool velocity.
    ForceHybrid,
    /// Externally installed controller.
    Custom,
}

/// Conditioning applied to the force signal and its derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Calibrated signal used as-is.
    None,
    /// 2nd-order Butterworth low-pass.
    #[default]
    Lowpass,
    /// Moving median.
    Median,
    /// Butterworth low-pass followed by moving median.
    Cascade,
}

/// Calibration constants, safety limits, control ranges, gains and filter
/// selectors of one Capstan Module.
///
/// Units: motor/spool angles in degrees, torque in Nm (motor side),
/// force in N, frequencies in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Params {
    // ─── Calibration ────────────────────────────────
    /// Motor torque constant [Nm/A].
    pub kt: f64,
    /// Amplifier command gain [A/V].
    pub command_gain: f64,
    /// Command output saturation [V].
    pub command_max: f64,
    /// Motor degrees per spool degree.
    pub gear_ratio: f64,
    /// Encoder counts per motor degree.
    pub counts_per_deg: f64,

    // ─── Safety limits ──────────────────────────────
    /// Maximum spool speed [deg/s].
    pub velocity_max: f64,
    /// Maximum motor torque [Nm].
    pub torque_max: f64,

    // ─── Control ranges ─────────────────────────────
    /// Spool position at control value 0 [deg].
    pub position_min: f64,
    /// Spool position at control value 1 [deg].
    pub position_max: f64,
    /// Force at control value 0 [N].
    pub force_min: f64,
    /// Force at control value 1 [N].
    pub force_max: f64,

    // ─── Gains ──────────────────────────────────────
    /// Position proportional gain [Nm/deg].
    pub position_kp: f64,
    /// Position derivative gain [Nm·s/deg].
    pub position_kd: f64,
    /// Force proportional gain [Nm/N].
    pub force_kp: f64,
    /// Force integral gain [Nm/(N·s)].
    pub force_ki: f64,
    /// Force derivative gain.
    pub force_kd: f64,
    /// Force feed-forward [Nm/N].
    pub force_ff: f64,

    // ─── Filters ────────────────────────────────────
    /// Force conditioning selector.
    pub filter_mode: FilterMode,
    /// Force low-pass cutoff [Hz].
    pub force_cutoff: f64,
    /// dF/dt low-pass cutoff [Hz].
    pub dforce_cutoff: f64,
    /// Median window length [samples], odd.
    pub median_window: usize,
    /// Smooth the control value before use.
    pub ctrl_value_filter: bool,
    /// Control value smoothing cutoff [Hz].
    pub ctrl_value_cutoff: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            kt: 0.0214,
            command_gain: 1.0,
            command_max: 10.0,
            gear_ratio: 10.0,
            counts_per_deg: 2048.0 * 4.0 / 360.0,
            velocity_max: 720.0,
            torque_max: 0.2,
            position_min: 0.0,
            position_max: 100.0,
            force_min: 0.0,
            force_max: 10.0,
            position_kp: 0.005,
            position_kd: 0.0001,
            force_kp: 0.01,
            force_ki: 0.0,
            force_kd: 0.0,
            force_ff: 0.0,
            filter_mode: FilterMode::Lowpass,
            force_cutoff: 50.0,
            dforce_cutoff: 20.0,
            median_window: 5,
            ctrl_value_filter: false,
            ctrl_value_cutoff: 10.0,
        }
    }
}

fn invalid(msg: String) -> ConfigError {
    ConfigError::ValidationError(msg)
}

fn check_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be finite and > 0 (got {value})")))
    }
}

fn check_gain(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be finite and >= 0 (got {value})")))
    }
}

fn check_range(name: &str, min: f64, max: f64) -> Result<(), ConfigError> {
    if min.is_finite() && max.is_finite() && min < max {
        Ok(())
    } else {
        Err(invalid(format!("{name} range requires finite min < max (got [{min}, {max}])")))
    }
}

fn check_median_window(window: usize) -> Result<(), ConfigError> {
    if window % 2 == 1 && window <= MEDIAN_WINDOW_MAX {
        Ok(())
    } else {
        Err(invalid(format!(
            "median_window must be odd and <= {MEDIAN_WINDOW_MAX} (got {window})"
        )))
    }
}

impl Params {
    /// Validate every field.
    ///
    /// # Errors
    /// `ConfigError::ValidationError` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("kt", self.kt)?;
        check_positive("command_gain", self.command_gain)?;
        check_positive("command_max", self.command_max)?;
        check_positive("gear_ratio", self.gear_ratio)?;
        check_positive("counts_per_deg", self.counts_per_deg)?;
        check_positive("velocity_max", self.velocity_max)?;
        check_positive("torque_max", self.torque_max)?;
        check_range("position", self.position_min, self.position_max)?;
        check_range("force", self.force_min, self.force_max)?;
        check_gain("position_kp", self.position_kp)?;
        check_gain("position_kd", self.position_kd)?;
        check_gain("force_kp", self.force_kp)?;
        check_gain("force_ki", self.force_ki)?;
        check_gain("force_kd", self.force_kd)?;
        check_gain("force_ff", self.force_ff)?;
        check_positive("force_cutoff", self.force_cutoff)?;
        check_positive("dforce_cutoff", self.dforce_cutoff)?;
        check_median_window(self.median_window)?;
        check_positive("ctrl_value_cutoff", self.ctrl_value_cutoff)?;
        Ok(())
    }

    /// Set the spool position range [deg].
    pub fn set_position_range(&mut self, min: f64, max: f64) -> Result<(), ConfigError> {
        check_range("position", min, max)?;
        self.position_min = min;
        self.position_max = max;
        Ok(())
    }

    /// Set the force range [N].
    pub fn set_force_range(&mut self, min: f64, max: f64) -> Result<(), ConfigError> {
        check_range("force", min, max)?;
        self.force_min = min;
        self.force_max = max;
        Ok(())
    }

    /// Set the spool speed limit [deg/s].
    pub fn set_velocity_max(&mut self, velocity_max: f64) -> Result<(), ConfigError> {
        check_positive("velocity_max", velocity_max)?;
        self.velocity_max = velocity_max;
        Ok(())
    }

    /// Set the motor torque limit [Nm].
    pub fn set_torque_max(&mut self, torque_max: f64) -> Result<(), ConfigError> {
        check_positive("torque_max", torque_max)?;
        self.torque_max = torque_max;
        Ok(())
    }

    /// Set position PD gains.
    pub fn set_position_gains(&mut self, kp: f64, kd: f64) -> Result<(), ConfigError> {
        check_gain("position_kp", kp)?;
        check_gain("position_kd", kd)?;
        self.position_kp = kp;
        self.position_kd = kd;
        Ok(())
    }

    /// Set force PID gains.
    pub fn set_force_gains(&mut self, kp: f64, ki: f64, kd: f64) -> Result<(), ConfigError> {
        check_gain("force_kp", kp)?;
        check_gain("force_ki", ki)?;
        check_gain("force_kd", kd)?;
        self.force_kp = kp;
        self.force_ki = ki;
        self.force_kd = kd;
        Ok(())
    }

    /// Set the force feed-forward coefficient.
    pub fn set_feedforward(&mut self, ff: f64) -> Result<(), ConfigError> {
        check_gain("force_ff", ff)?;
        self.force_ff = ff;
        Ok(())
    }

    /// Set force and dF/dt cutoffs [Hz] and the median window.
    pub fn set_force_filter(
        &mut self,
        force_cutoff: f64,
        dforce_cutoff: f64,
        median_window: usize,
    ) -> Result<(), ConfigError> {
        check_positive("force_cutoff", force_cutoff)?;
        check_positive("dforce_cutoff", dforce_cutoff)?;
        check_median_window(median_window)?;
        self.force_cutoff = force_cutoff;
        self.dforce_cutoff = dforce_cutoff;
        self.median_window = median_window;
        Ok(())
    }

    /// Enable or disable control value smoothing at `cutoff` [Hz].
    pub fn set_ctrl_value_filter(&mut self, enabled: bool, cutoff: f64) -> Result<(), ConfigError> {
        check_positive("ctrl_value_cutoff", cutoff)?;
        self.ctrl_value_filter = enabled;
        self.ctrl_value_cutoff = cutoff;
        Ok(())
    }

    /// Map a physical reference to the control-value domain of `mode`.
    ///
    /// | Mode | Reference unit | Control value |
    /// |------|----------------|---------------|
    /// | Torque | Nm | `ref / torque_max` |
    /// | Position | spool deg | `(ref - min) / (max - min)` |
    /// | Force, ForceHybrid | N | `(ref - min) / (max - min)` |
    /// | Custom | any | identity |
    pub fn ref_to_ctrl_value(&self, reference: f64, mode: ControlMode) -> f64 {
        match mode {
            ControlMode::Torque => reference / self.torque_max,
            ControlMode::Position => {
                (reference - self.position_min) / (self.position_max - self.position_min)
            }
            ControlMode::Force | ControlMode::ForceHybrid => {
                (reference - self.force_min) / (self.force_max - self.force_min)
            }
            ControlMode::Custom => reference,
        }
    }

    /// Inverse of [`Params::ref_to_ctrl_value`].
    pub fn ctrl_value_to_ref(&self, ctrl_value: f64, mode: ControlMode) -> f64 {
        match mode {
            ControlMode::Torque => ctrl_value * self.torque_max,
            ControlMode::Position => {
                self.position_min + ctrl_value * (self.position_max - self.position_min)
            }
            ControlMode::Force | ControlMode::ForceHybrid => {
                self.force_min + ctrl_value * (self.force_max - self.force_min)
            }
            ControlMode::Custom => ctrl_value,
        }
    }
}

/// Valid control-value interval for `mode`.
///
/// Custom controllers interpret the value themselves and are not clamped.
pub const fn ctrl_value_bounds(mode: ControlMode) -> (f64, f64) {
    match mode {
        ControlMode::Torque => (-1.0, 1.0),
        ControlMode::Position | ControlMode::Force | ControlMode::ForceHybrid => (0.0, 1.0),
        ControlMode::Custom => (f64::NEG_INFINITY, f64::INFINITY),
    }
}
