//! Thread-safe Capstan Module handle.
//!
//! Every method takes the device's own lock for the duration of the call
//! and never hands the guard out, so a caller thread can hold the lock for
//! one accessor's worth of work at most. Configuration changes take effect
//! on the next tick. The same lock guards [`DeviceCore`], which only the
//! hub's tick and custom controllers reach; calling back into
//! `CapstanModule` from inside a custom controller would deadlock, so
//! controllers use the `DeviceCore` methods.

pub mod binding;
pub mod custom;
pub mod inner;

use std::path::Path;
use std::sync::Arc;

use capstan_common::config::{ConfigError, ConfigLoader, ConfigSaver};
use capstan_common::daq::driver::{DaqError, DaqIo};
use capstan_common::daq::types::ChannelCounts;
use capstan_common::device::params::{ControlMode, FilterMode, Params};
use capstan_common::device::query::Query;
use parking_lot::Mutex;
use tracing::{error, info};

pub use binding::{ForceSource, IoBinding};
pub use custom::CustomController;
pub use inner::DeviceCore;

/// One Capstan Module: a motor-driven spool regulated in torque, position
/// or force against encoder and force feedback.
#[derive(Debug)]
pub struct CapstanModule {
    name: String,
    core: Mutex<DeviceCore>,
}

impl CapstanModule {
    /// Create a disabled device in Torque mode.
    ///
    /// # Errors
    /// `ConfigError::ValidationError` if `params` is inconsistent.
    pub fn new(name: impl Into<String>, binding: IoBinding, params: Params) -> Result<Self, ConfigError> {
        params.validate()?;
        let name = name.into();
        info!(device = %name, "Capstan module created");
        Ok(Self {
            core: Mutex::new(DeviceCore::new(name.clone(), binding, params)),
            name,
        })
    }

    /// Device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run one tick at time `t` [s]. See [`DeviceCore::update`].
    pub fn update(&self, t: f64, io: &mut dyn DaqIo) -> Result<(), DaqError> {
        self.core.lock().update(t, io)
    }

    /// Disable and buffer safe outputs immediately.
    pub fn shutdown(&self, io: &mut dyn DaqIo) -> Result<(), DaqError> {
        self.core.lock().disable_outputs(io)
    }

    // ─── State ──────────────────────────────────────────────────────

    /// Drive the amplifier enable output.
    pub fn enable(&self) {
        self.core.lock().enable();
    }

    /// Release the motor.
    pub fn disable(&self) {
        self.core.lock().disable();
    }

    /// Amplifier enable state.
    pub fn is_enabled(&self) -> bool {
        self.core.lock().is_enabled()
    }

    /// Switch the control law without resetting filters or integrators.
    pub fn set_control_mode(&self, mode: ControlMode) {
        self.core.lock().set_control_mode(mode);
    }

    /// Active control law.
    pub fn control_mode(&self) -> ControlMode {
        self.core.lock().control_mode()
    }

    /// Set the normalized control value.
    pub fn set_control_value(&self, ctrl_value: f64) {
        self.core.lock().set_control_value(ctrl_value);
    }

    /// Make the current spool position the origin.
    pub fn zero_position(&self) {
        self.core.lock().zero_position();
    }

    /// Make the current force zero and restart force conditioning.
    pub fn zero_force(&self) {
        self.core.lock().zero_force();
    }

    /// Install or remove the Custom mode controller.
    pub fn set_custom_controller(&self, controller: Option<Arc<dyn CustomController>>) {
        self.core.lock().set_custom_controller(controller);
    }

    /// Sample rate the filters are designed for [Hz].
    pub fn set_sample_rate(&self, sample_rate: f64) {
        self.core.lock().set_sample_rate(sample_rate);
    }

    /// Sample rate the filters are designed for [Hz].
    pub fn sample_rate(&self) -> f64 {
        self.core.lock().sample_rate()
    }

    /// Check the binding against a DAQ's channel counts.
    pub fn validate_binding(&self, counts: &ChannelCounts) -> Result<(), DaqError> {
        self.core.lock().validate_binding(counts)
    }

    // ─── Parameters ─────────────────────────────────────────────────

    /// Copy of the current parameters.
    pub fn params(&self) -> Params {
        *self.core.lock().params()
    }

    /// Replace all parameters.
    pub fn set_params(&self, params: Params) -> Result<(), ConfigError> {
        params.validate()?;
        *self.core.lock().params_mut() = params;
        Ok(())
    }

    /// Set the spool position range [deg] mapped onto control values 0..1.
    pub fn set_position_range(&self, min: f64, max: f64) -> Result<(), ConfigError> {
        self.core.lock().params_mut().set_position_range(min, max)
    }

    /// Set the force range [N] mapped onto control values 0..1.
    pub fn set_force_range(&self, min: f64, max: f64) -> Result<(), ConfigError> {
        self.core.lock().params_mut().set_force_range(min, max)
    }

    /// Set the spool speed limit [deg/s].
    pub fn set_velocity_max(&self, velocity_max: f64) -> Result<(), ConfigError> {
        self.core.lock().params_mut().set_velocity_max(velocity_max)
    }

    /// Set the motor torque limit [Nm].
    pub fn set_torque_max(&self, torque_max: f64) -> Result<(), ConfigError> {
        self.core.lock().params_mut().set_torque_max(torque_max)
    }

    /// Set position PD gains.
    pub fn set_position_gains(&self, kp: f64, kd: f64) -> Result<(), ConfigError> {
        self.core.lock().params_mut().set_position_gains(kp, kd)
    }

    /// Set force PID gains.
    pub fn set_force_gains(&self, kp: f64, ki: f64, kd: f64) -> Result<(), ConfigError> {
        self.core.lock().params_mut().set_force_gains(kp, ki, kd)
    }

    /// Set the force feed-forward coefficient.
    pub fn set_feedforward(&self, ff: f64) -> Result<(), ConfigError> {
        self.core.lock().params_mut().set_feedforward(ff)
    }

    /// Set force and dF/dt cutoffs [Hz] and the median window.
    pub fn set_force_filter(
        &self,
        force_cutoff: f64,
        dforce_cutoff: f64,
        median_window: usize,
    ) -> Result<(), ConfigError> {
        self.core
            .lock()
            .params_mut()
            .set_force_filter(force_cutoff, dforce_cutoff, median_window)
    }

    /// Select the force conditioning stage.
    pub fn set_force_filter_mode(&self, mode: FilterMode) {
        self.core.lock().params_mut().filter_mode = mode;
    }

    /// Enable or disable control value smoothing.
    pub fn set_ctrl_value_filter(&self, enabled: bool, cutoff: f64) -> Result<(), ConfigError> {
        self.core.lock().params_mut().set_ctrl_value_filter(enabled, cutoff)
    }

    // ─── Persistence ────────────────────────────────────────────────

    /// Parameters as a TOML document.
    pub fn export_params_string(&self) -> Result<String, ConfigError> {
        self.params().to_toml_string().inspect_err(|e| {
            error!(device = %self.name, "Failed to serialize params: {e}");
        })
    }

    /// Write parameters to a TOML file.
    pub fn export_params(&self, path: &Path) -> Result<(), ConfigError> {
        self.params().save(path).inspect_err(|e| {
            error!(device = %self.name, path = %path.display(), "Failed to export params: {e}");
        })
    }

    /// Replace parameters from a TOML document. Unchanged on error.
    pub fn import_params_str(&self, content: &str) -> Result<(), ConfigError> {
        Params::from_toml_str(content)
            .and_then(|params| self.set_params(params))
            .inspect_err(|e| {
                error!(device = %self.name, "Failed to import params: {e}");
            })
    }

    /// Replace parameters from a TOML file. Unchanged on error.
    pub fn import_params(&self, path: &Path) -> Result<(), ConfigError> {
        Params::load(path)
            .and_then(|params| self.set_params(params))
            .inspect_err(|e| {
                error!(device = %self.name, path = %path.display(), "Failed to import params: {e}");
            })
    }

    // ─── Scaling ────────────────────────────────────────────────────

    /// Control value producing physical reference `reference` in the
    /// current mode.
    pub fn scale_ref_to_ctrl_value(&self, reference: f64) -> f64 {
        let core = self.core.lock();
        core.params().ref_to_ctrl_value(reference, core.control_mode())
    }

    /// Physical reference of control value `ctrl_value` in `mode`.
    pub fn scale_ctrl_value(&self, ctrl_value: f64, mode: ControlMode) -> f64 {
        self.core.lock().params().ctrl_value_to_ref(ctrl_value, mode)
    }

    // ─── Snapshots ──────────────────────────────────────────────────

    /// Device snapshot: fresh from live state when `immediate`, else the
    /// one recorded by the last tick.
    pub fn query(&self, immediate: bool) -> Query {
        let core = self.core.lock();
        if immediate {
            core.snapshot()
        } else {
            core.last_query()
        }
    }

    /// Recorded snapshots, oldest first.
    pub fn history(&self) -> Vec<Query> {
        self.core.lock().history().copied().collect()
    }
}
