//! Lock-guarded state and per-tick update of one Capstan Module.
//!
//! A `DeviceCore` is only reachable through the owning
//! [`CapstanModule`](super::CapstanModule)'s mutex, so every method here
//! runs with the device lock held. This is where the hub's tick and
//! custom controllers operate.

use std::sync::Arc;

use capstan_common::consts::{DEFAULT_SAMPLE_RATE, HISTORY_LEN};
use capstan_common::daq::driver::{DaqError, DaqIo};
use capstan_common::daq::types::ChannelCounts;
use capstan_common::device::limits::LimitViolation;
use capstan_common::device::params::{ControlMode, Params, ctrl_value_bounds};
use capstan_common::device::query::Query;
use heapless::HistoryBuffer;
use tracing::{debug, info, warn};

use super::binding::{ForceSource, IoBinding};
use super::custom::CustomController;
use crate::control::filters::{ForceFilterChain, LowPassState, lowpass_apply};
use crate::control::law::{self, Feedback};
use crate::control::pid::PidState;
use crate::safety::limits::{LimitInput, SafetyLimiter};

/// Mutable state of one Capstan Module.
pub struct DeviceCore {
    name: String,
    binding: IoBinding,
    params: Params,
    mode: ControlMode,
    custom: Option<Arc<dyn CustomController>>,
    sample_rate: f64,
    enabled: bool,
    fault: bool,

    // ── Timing ──
    time: f64,
    last_time: Option<f64>,
    dt: f64,
    ticks: u64,

    // ── Kinematics ──
    raw_counts: i64,
    encoder_offset: i64,
    counts_per_sec: f64,

    // ── Force ──
    raw_force: f64,
    force_zero: f64,
    force: f64,
    force_filtered: f64,
    prev_force: Option<f64>,
    dforce: f64,
    dforce_filtered: f64,
    force_filter: ForceFilterChain,
    dforce_filter: ForceFilterChain,

    // ── Control ──
    ctrl_value: f64,
    ctrl_value_filtered: f64,
    ctrl_filter: LowPassState,
    reference: f64,
    position_pid: PidState,
    force_pid: PidState,
    law_torque: f64,
    torque: f64,
    command_volts: f64,

    // ── Safety & diagnostics ──
    limiter: SafetyLimiter,
    limits: LimitViolation,
    last_query: Query,
    history: Box<HistoryBuffer<Query, HISTORY_LEN>>,
}

impl DeviceCore {
    pub(super) fn new(name: String, binding: IoBinding, params: Params) -> Self {
        Self {
            force_filter: ForceFilterChain::new(
                params.force_cutoff,
                params.median_window,
                DEFAULT_SAMPLE_RATE,
            ),
            dforce_filter: ForceFilterChain::new(
                params.dforce_cutoff,
                params.median_window,
                DEFAULT_SAMPLE_RATE,
            ),
            name,
            binding,
            params,
            mode: ControlMode::default(),
            custom: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            enabled: false,
            fault: false,
            time: 0.0,
            last_time: None,
            dt: 1.0 / DEFAULT_SAMPLE_RATE,
            ticks: 0,
            raw_counts: 0,
            encoder_offset: 0,
            counts_per_sec: 0.0,
            raw_force: 0.0,
            force_zero: 0.0,
            force: 0.0,
            force_filtered: 0.0,
            prev_force: None,
            dforce: 0.0,
            dforce_filtered: 0.0,
            ctrl_value: 0.0,
            ctrl_value_filtered: 0.0,
            ctrl_filter: LowPassState::default(),
            reference: 0.0,
            position_pid: PidState::default(),
            force_pid: PidState::default(),
            law_torque: 0.0,
            torque: 0.0,
            command_volts: 0.0,
            limiter: SafetyLimiter::default(),
            limits: LimitViolation::empty(),
            last_query: Query::default(),
            history: Box::new(HistoryBuffer::new()),
        }
    }

    // ─── Tick ───────────────────────────────────────────────────────

    /// Advance the controller by one tick at hub time `t` [s].
    ///
    /// Reads the bound inputs, conditions force, runs the active control
    /// law, applies the safety limits, buffers the outputs and records a
    /// snapshot. Filters advance exactly once per call.
    ///
    /// # Errors
    /// Returns the first channel access error; the tick is not recorded.
    pub fn update(&mut self, t: f64, io: &mut dyn DaqIo) -> Result<(), DaqError> {
        self.dt = match self.last_time {
            Some(prev) if t > prev => t - prev,
            _ => 1.0 / self.sample_rate,
        };
        self.last_time = Some(t);
        self.time = t;

        self.sense(io)?;
        self.condition();
        self.run_law(t);
        self.limit();
        self.actuate(io)?;

        self.ticks += 1;
        self.last_query = self.snapshot();
        self.history.write(self.last_query);
        Ok(())
    }

    fn sense(&mut self, io: &mut dyn DaqIo) -> Result<(), DaqError> {
        let fault = io.digital_input(self.binding.fault)?;
        if fault && !self.fault {
            warn!(device = %self.name, "Amplifier fault asserted");
        } else if !fault && self.fault {
            info!(device = %self.name, "Amplifier fault cleared");
        }
        self.fault = fault;

        self.raw_counts = io.encoder_counts(self.binding.encoder)?;
        self.counts_per_sec = io.encoder_velocity(self.binding.encoder)?;

        self.raw_force = self.binding.force.read(&*io)?;
        self.force = self.raw_force - self.force_zero;
        Ok(())
    }

    fn condition(&mut self) {
        let p = self.params;
        self.force_filter
            .configure(p.force_cutoff, p.median_window, self.sample_rate);
        self.dforce_filter
            .configure(p.dforce_cutoff, p.median_window, self.sample_rate);

        self.force_filtered = self.force_filter.apply(self.force, p.filter_mode);
        self.dforce = match self.prev_force {
            Some(prev) => (self.force - prev) / self.dt,
            None => 0.0,
        };
        self.prev_force = Some(self.force);
        self.dforce_filtered = self.dforce_filter.apply(self.dforce, p.filter_mode);

        let smoothed = if p.ctrl_value_filter {
            lowpass_apply(
                &mut self.ctrl_filter,
                p.ctrl_value_cutoff,
                self.ctrl_value,
                self.dt,
            )
        } else {
            self.ctrl_filter.prime(self.ctrl_value);
            self.ctrl_value
        };
        let (lo, hi) = ctrl_value_bounds(self.mode);
        self.ctrl_value_filtered = smoothed.clamp(lo, hi);
    }

    fn run_law(&mut self, t: f64) {
        self.law_torque = 0.0;
        self.reference = self
            .params
            .ctrl_value_to_ref(self.ctrl_value_filtered, self.mode);
        let reference = self.reference;

        match self.mode {
            ControlMode::Torque => {
                self.control_torque(reference);
            }
            ControlMode::Position => {
                self.control_spool_position(reference);
            }
            ControlMode::Force => {
                self.control_force(reference);
            }
            ControlMode::ForceHybrid => {
                self.control_force_hybrid(reference);
            }
            ControlMode::Custom => {
                if let Some(controller) = self.custom.clone() {
                    controller.update(self.ctrl_value_filtered, t, self);
                }
            }
        }
    }

    fn limit(&mut self) {
        if self.enabled {
            let input = LimitInput {
                spool_velocity: self.spool_velocity(),
                torque: self.law_torque,
                velocity_max: self.params.velocity_max,
                torque_max: self.params.torque_max,
            };
            let outcome = self.limiter.check(&self.name, &input);
            self.limits = outcome.flags;
            self.torque = outcome.torque;
            let volts = self.torque / (self.params.kt * self.params.command_gain);
            self.command_volts = volts.clamp(-self.params.command_max, self.params.command_max);
        } else {
            self.limits = LimitViolation::empty();
            self.torque = 0.0;
            self.command_volts = 0.0;
        }
    }

    fn actuate(&mut self, io: &mut dyn DaqIo) -> Result<(), DaqError> {
        io.set_digital_output(self.binding.enable, self.enabled)?;
        io.set_analog_output(self.binding.command, self.command_volts)
    }

    /// Disable the device and immediately buffer safe outputs
    /// (enable off, 0 V), without running a control law.
    pub fn disable_outputs(&mut self, io: &mut dyn DaqIo) -> Result<(), DaqError> {
        self.disable();
        self.torque = 0.0;
        self.command_volts = 0.0;
        self.actuate(io)
    }

    // ─── Inner control API ──────────────────────────────────────────

    fn feedback(&self) -> Feedback {
        Feedback {
            spool_position: self.spool_position(),
            spool_velocity: self.spool_velocity(),
            force: self.force_filtered,
            dforce: self.dforce_filtered,
        }
    }

    /// Command motor torque [Nm] for this tick.
    pub fn control_torque(&mut self, torque: f64) -> f64 {
        self.reference = torque;
        self.law_torque = law::torque_law(torque);
        self.law_torque
    }

    /// Regulate spool position to `reference` [deg] for this tick.
    pub fn control_spool_position(&mut self, reference: f64) -> f64 {
        let fb = self.feedback();
        self.reference = reference;
        self.law_torque =
            law::position_law(&mut self.position_pid, &self.params, reference, &fb, self.dt);
        self.law_torque
    }

    /// Regulate force to `reference` [N] for this tick, damping on dF/dt.
    pub fn control_force(&mut self, reference: f64) -> f64 {
        let fb = self.feedback();
        self.reference = reference;
        self.law_torque = law::force_law(&mut self.force_pid, &self.params, reference, &fb, self.dt);
        self.law_torque
    }

    /// Regulate force to `reference` [N] for this tick, damping on spool velocity.
    pub fn control_force_hybrid(&mut self, reference: f64) -> f64 {
        let fb = self.feedback();
        self.reference = reference;
        self.law_torque =
            law::force_hybrid_law(&mut self.force_pid, &self.params, reference, &fb, self.dt);
        self.law_torque
    }

    // ─── Commands ───────────────────────────────────────────────────

    /// Switch the control law. Filter and integrator state is kept.
    pub fn set_control_mode(&mut self, mode: ControlMode) {
        if mode != self.mode {
            info!(device = %self.name, from = ?self.mode, to = ?mode, "Control mode changed");
            self.mode = mode;
        }
    }

    /// Set the control value used from the next tick on.
    pub fn set_control_value(&mut self, ctrl_value: f64) {
        self.ctrl_value = ctrl_value;
    }

    /// Drive the amplifier enable output from the next tick on.
    pub fn enable(&mut self) {
        if !self.enabled {
            info!(device = %self.name, "Device enabled");
            self.enabled = true;
        }
    }

    /// Release the motor from the next tick on.
    pub fn disable(&mut self) {
        if self.enabled {
            info!(device = %self.name, "Device disabled");
            self.enabled = false;
        }
    }

    /// Make the current encoder reading the spool origin.
    pub fn zero_position(&mut self) {
        self.encoder_offset = self.raw_counts;
        debug!(device = %self.name, offset = self.encoder_offset, "Position zeroed");
    }

    /// Make the current force reading zero and restart force conditioning.
    ///
    /// Clears the force and dF/dt filters and the force integrator.
    pub fn zero_force(&mut self) {
        match &mut self.binding.force {
            ForceSource::Analog { .. } => self.force_zero = self.raw_force,
            ForceSource::Sensor { sensor, .. } => {
                sensor.zero();
                self.raw_force = 0.0;
                self.force_zero = 0.0;
            }
        }
        self.force = 0.0;
        self.force_filtered = 0.0;
        self.dforce = 0.0;
        self.dforce_filtered = 0.0;
        self.prev_force = None;
        self.force_filter.reset();
        self.dforce_filter.reset();
        self.force_pid.reset();
        debug!(device = %self.name, "Force zeroed");
    }

    pub(super) fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    pub(super) fn set_custom_controller(&mut self, controller: Option<Arc<dyn CustomController>>) {
        self.custom = controller;
    }

    pub(super) fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    // ─── Sensed state ───────────────────────────────────────────────

    /// Device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Active control law.
    pub fn control_mode(&self) -> ControlMode {
        self.mode
    }

    /// Control value after smoothing and clamping, as used this tick.
    pub fn control_value(&self) -> f64 {
        self.ctrl_value_filtered
    }

    /// Hub time of the last tick [s].
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Period of the last tick [s].
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Sample rate the filters are designed for [Hz].
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Amplifier enable state.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Amplifier fault input.
    pub fn fault(&self) -> bool {
        self.fault
    }

    /// Encoder counts relative to the last position zero.
    pub fn encoder_counts(&self) -> i64 {
        self.raw_counts - self.encoder_offset
    }

    /// Motor angle [deg].
    pub fn motor_position(&self) -> f64 {
        self.encoder_counts() as f64 / self.params.counts_per_deg
    }

    /// Motor speed [deg/s].
    pub fn motor_velocity(&self) -> f64 {
        self.counts_per_sec / self.params.counts_per_deg
    }

    /// Spool angle [deg].
    pub fn spool_position(&self) -> f64 {
        self.motor_position() / self.params.gear_ratio
    }

    /// Spool speed [deg/s].
    pub fn spool_velocity(&self) -> f64 {
        self.motor_velocity() / self.params.gear_ratio
    }

    /// Calibrated force before conditioning [N].
    pub fn force(&self) -> f64 {
        self.force
    }

    /// Conditioned force [N].
    pub fn force_filtered(&self) -> f64 {
        self.force_filtered
    }

    /// Conditioned force derivative [N/s].
    pub fn dforce_filtered(&self) -> f64 {
        self.dforce_filtered
    }

    /// Force integrator state [Nm].
    pub fn force_integral(&self) -> f64 {
        self.force_pid.integral()
    }

    // ─── Snapshots ──────────────────────────────────────────────────

    /// Snapshot recorded by the last tick.
    pub fn last_query(&self) -> Query {
        self.last_query
    }

    /// Snapshot of the live state.
    pub fn snapshot(&self) -> Query {
        Query {
            time: self.time,
            ticks: self.ticks,
            enabled: self.enabled,
            fault: self.fault,
            control_mode: self.mode,
            filter_mode: self.params.filter_mode,
            encoder_counts: self.encoder_counts(),
            motor_position: self.motor_position(),
            motor_velocity: self.motor_velocity(),
            spool_position: self.spool_position(),
            spool_velocity: self.spool_velocity(),
            force: self.force,
            force_filtered: self.force_filtered,
            dforce: self.dforce,
            dforce_filtered: self.dforce_filtered,
            ctrl_value: self.ctrl_value,
            ctrl_value_filtered: self.ctrl_value_filtered,
            reference: self.reference,
            law_torque: self.law_torque,
            torque: self.torque,
            command_volts: self.command_volts,
            force_integral: self.force_pid.integral(),
            limits: self.limits,
            velocity_violations: self.limiter.velocity_violations(),
            torque_violations: self.limiter.torque_violations(),
        }
    }

    /// Recorded snapshots, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Query> {
        self.history.oldest_ordered()
    }

    /// Check the binding against a DAQ's channel counts.
    pub fn validate_binding(&self, counts: &ChannelCounts) -> Result<(), DaqError> {
        self.binding.validate(counts)
    }
}

impl std::fmt::Debug for DeviceCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCore")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("enabled", &self.enabled)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}
