//! Simulated DAQ.
//!
//! Channels are plain buffers. Writing a plant's command output arms one
//! fixed plant step; the step runs at the next input sample, either a bulk
//! read or, when the hub runs soft, a read of the plant's encoder or load
//! cell, and latches the plant's sensors into the input buffers. A device
//! therefore sees the response to its previous command once per tick, and
//! a command rewritten on shutdown or removal never moves the plant.
//!
//! Failure injection (open, enable, bulk read) and a [`SimProbe`] for
//! inspecting buffers from another thread make the driver usable as a test
//! double for the hub.

use std::sync::Arc;

use capstan_common::daq::driver::{Daq, DaqError, DaqIo};
use capstan_common::daq::types::{ChannelCounts, ChannelKind};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info};

use super::plant::{CapstanPlant, PlantConfig};

/// Driver configuration, parsed from the hub's `[driver_config]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Digital input count.
    pub digital_inputs: u32,
    /// Digital output count.
    pub digital_outputs: u32,
    /// Analog input count.
    pub analog_inputs: u32,
    /// Analog output count.
    pub analog_outputs: u32,
    /// Encoder count.
    pub encoders: u32,
    /// Plant integration step [s].
    pub dt: f64,
    /// Simulated capstans.
    pub plants: Vec<PlantConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            digital_inputs: 2,
            digital_outputs: 2,
            analog_inputs: 4,
            analog_outputs: 2,
            encoders: 2,
            dt: 0.001,
            plants: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Channel counts exposed by the simulated DAQ.
    pub fn channel_counts(&self) -> ChannelCounts {
        ChannelCounts {
            digital_inputs: self.digital_inputs,
            digital_outputs: self.digital_outputs,
            analog_inputs: self.analog_inputs,
            analog_outputs: self.analog_outputs,
            encoders: self.encoders,
        }
    }

    /// Check the step size and every plant's wiring.
    pub fn validate(&self) -> Result<(), DaqError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(DaqError::ConfigError(format!("dt must be > 0, got {}", self.dt)));
        }
        let counts = self.channel_counts();
        for (i, plant) in self.plants.iter().enumerate() {
            plant
                .validate()
                .map_err(|e| DaqError::ConfigError(format!("plant {i}: {e}")))?;
            let mut wiring = vec![
                (ChannelKind::DigitalOutput, plant.enable),
                (ChannelKind::AnalogOutput, plant.command),
                (ChannelKind::Encoder, plant.encoder),
            ];
            if let Some(channel) = plant.force_input {
                wiring.push((ChannelKind::AnalogInput, channel));
            }
            for (kind, channel) in wiring {
                if !counts.contains(kind, channel) {
                    return Err(DaqError::ConfigError(format!(
                        "plant {i}: {kind} channel {channel} out of range"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct SimState {
    dt: f64,
    di: Vec<bool>,
    dout: Vec<bool>,
    ai: Vec<f64>,
    ao: Vec<f64>,
    enc_counts: Vec<i64>,
    enc_velocity: Vec<f64>,
    plants: Vec<SimPlant>,
    open: bool,
    enabled: bool,
    fail_open: bool,
    fail_enable: bool,
    fail_read_after: Option<u64>,
    reads: u64,
    writes: u64,
}

impl SimState {
    fn new(config: &SimulationConfig) -> Self {
        Self {
            dt: config.dt,
            di: vec![false; config.digital_inputs as usize],
            dout: vec![false; config.digital_outputs as usize],
            ai: vec![0.0; config.analog_inputs as usize],
            ao: vec![0.0; config.analog_outputs as usize],
            enc_counts: vec![0; config.encoders as usize],
            enc_velocity: vec![0.0; config.encoders as usize],
            plants: config.plants.iter().copied().map(SimPlant::new).collect(),
            open: false,
            enabled: false,
            fail_open: false,
            fail_enable: false,
            fail_read_after: None,
            reads: 0,
            writes: 0,
        }
    }

    /// Arm a step of every plant driven by analog output `channel`.
    fn arm_plants(&mut self, channel: u32) {
        for plant in self.plants.iter_mut().filter(|p| p.model.config().command == channel) {
            plant.armed = true;
        }
    }

    /// Run the armed plant steps from the buffered outputs and latch sensors.
    fn sample_plants(&mut self) {
        let dt = self.dt;
        for plant in self.plants.iter_mut().filter(|p| p.armed) {
            let config = *plant.model.config();
            let enabled = self.dout[config.enable as usize];
            plant.model.step(self.ao[config.command as usize], enabled, dt);
            plant.armed = false;
            plant.steps += 1;
            self.enc_counts[config.encoder as usize] = plant.model.encoder_counts();
            self.enc_velocity[config.encoder as usize] = plant.model.encoder_velocity();
            if let Some(ai) = config.force_input {
                self.ai[ai as usize] = plant.model.force_volts();
            }
        }
    }
}

#[derive(Debug)]
struct SimPlant {
    model: CapstanPlant,
    armed: bool,
    steps: u64,
}

impl SimPlant {
    fn new(config: PlantConfig) -> Self {
        Self {
            model: CapstanPlant::new(config),
            armed: false,
            steps: 0,
        }
    }
}

/// Simulated DAQ with optional capstan plants.
#[derive(Debug)]
pub struct SimulatedDaq {
    counts: ChannelCounts,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedDaq {
    /// Create a simulated DAQ from its configuration.
    ///
    /// # Errors
    /// `DaqError::ConfigError` if the step size or a plant's wiring is invalid.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, DaqError> {
        config.validate()?;
        info!(
            plants = config.plants.len(),
            dt = config.dt,
            "Simulated DAQ created"
        );
        Ok(Self {
            counts: config.channel_counts(),
            state: Arc::new(Mutex::new(SimState::new(config))),
        })
    }

    /// Start a builder with the default channel layout.
    pub fn builder() -> SimulatedDaqBuilder {
        SimulatedDaqBuilder::default()
    }

    /// Handle for inspecting and stimulating the buffers from other threads.
    pub fn probe(&self) -> SimProbe {
        SimProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl DaqIo for SimulatedDaq {
    fn channel_counts(&self) -> ChannelCounts {
        self.counts
    }

    fn digital_input(&self, channel: u32) -> Result<bool, DaqError> {
        self.check_channel(ChannelKind::DigitalInput, channel)?;
        Ok(self.state.lock().di[channel as usize])
    }

    fn set_digital_output(&mut self, channel: u32, value: bool) -> Result<(), DaqError> {
        self.check_channel(ChannelKind::DigitalOutput, channel)?;
        self.state.lock().dout[channel as usize] = value;
        Ok(())
    }

    fn analog_input(&self, channel: u32) -> Result<f64, DaqError> {
        self.check_channel(ChannelKind::AnalogInput, channel)?;
        let mut state = self.state.lock();
        state.sample_plants();
        Ok(state.ai[channel as usize])
    }

    fn set_analog_output(&mut self, channel: u32, volts: f64) -> Result<(), DaqError> {
        self.check_channel(ChannelKind::AnalogOutput, channel)?;
        let mut state = self.state.lock();
        state.ao[channel as usize] = volts;
        state.arm_plants(channel);
        Ok(())
    }

    fn encoder_counts(&self, channel: u32) -> Result<i64, DaqError> {
        self.check_channel(ChannelKind::Encoder, channel)?;
        let mut state = self.state.lock();
        state.sample_plants();
        Ok(state.enc_counts[channel as usize])
    }

    fn encoder_velocity(&self, channel: u32) -> Result<f64, DaqError> {
        self.check_channel(ChannelKind::Encoder, channel)?;
        let mut state = self.state.lock();
        state.sample_plants();
        Ok(state.enc_velocity[channel as usize])
    }
}

impl Daq for SimulatedDaq {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn open(&mut self) -> Result<(), DaqError> {
        let mut state = self.state.lock();
        if state.fail_open {
            return Err(DaqError::OpenFailed("simulated open failure".to_string()));
        }
        state.open = true;
        state.reads = 0;
        state.writes = 0;
        debug!("Simulated DAQ opened");
        Ok(())
    }

    fn enable(&mut self) -> Result<(), DaqError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(DaqError::EnableFailed("device not open".to_string()));
        }
        if state.fail_enable {
            return Err(DaqError::EnableFailed("simulated enable failure".to_string()));
        }
        state.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<(), DaqError> {
        let mut state = self.state.lock();
        state.enabled = false;
        state.dout.fill(false);
        state.ao.fill(0.0);
        Ok(())
    }

    fn close(&mut self) -> Result<(), DaqError> {
        let mut state = self.state.lock();
        state.open = false;
        state.enabled = false;
        debug!(reads = state.reads, writes = state.writes, "Simulated DAQ closed");
        Ok(())
    }

    fn read_all(&mut self) -> Result<(), DaqError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(DaqError::ReadFailed("device not open".to_string()));
        }
        if state.fail_read_after.is_some_and(|n| state.reads >= n) {
            return Err(DaqError::ReadFailed(format!(
                "simulated read failure after {} reads",
                state.reads
            )));
        }
        state.sample_plants();
        state.reads += 1;
        Ok(())
    }

    fn write_all(&mut self) -> Result<(), DaqError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(DaqError::WriteFailed("device not open".to_string()));
        }
        state.writes += 1;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }
}

/// Shared view of a [`SimulatedDaq`]'s buffers.
#[derive(Debug, Clone)]
pub struct SimProbe {
    state: Arc<Mutex<SimState>>,
}

impl SimProbe {
    /// Buffered digital output (false if out of range).
    pub fn digital_output(&self, channel: u32) -> bool {
        self.state.lock().dout.get(channel as usize).copied().unwrap_or_default()
    }

    /// Buffered analog output [V] (0 if out of range).
    pub fn analog_output(&self, channel: u32) -> f64 {
        self.state.lock().ao.get(channel as usize).copied().unwrap_or_default()
    }

    /// Drive a digital input, e.g. an amplifier fault line.
    pub fn set_digital_input(&self, channel: u32, value: bool) {
        if let Some(di) = self.state.lock().di.get_mut(channel as usize) {
            *di = value;
        }
    }

    /// Drive an analog input [V].
    pub fn set_analog_input(&self, channel: u32, volts: f64) {
        if let Some(ai) = self.state.lock().ai.get_mut(channel as usize) {
            *ai = volts;
        }
    }

    /// Motor position of plant `index` [deg].
    pub fn plant_position(&self, index: usize) -> Option<f64> {
        self.state.lock().plants.get(index).map(|p| p.model.position())
    }

    /// Integration steps taken by plant `index`.
    pub fn plant_steps(&self, index: usize) -> Option<u64> {
        self.state.lock().plants.get(index).map(|p| p.steps)
    }

    /// Device opened and not yet closed.
    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Outputs enabled.
    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Successful bulk reads since the last open.
    pub fn reads(&self) -> u64 {
        self.state.lock().reads
    }

    /// Successful bulk writes since the last open.
    pub fn writes(&self) -> u64 {
        self.state.lock().writes
    }

    /// Arm (`Some(n)`: fail once `n` reads succeeded) or clear read failure.
    pub fn set_read_failure(&self, after: Option<u64>) {
        self.state.lock().fail_read_after = after;
    }
}

/// Builder for [`SimulatedDaq`].
#[derive(Debug, Default)]
pub struct SimulatedDaqBuilder {
    config: SimulationConfig,
    fail_open: bool,
    fail_enable: bool,
    fail_read_after: Option<u64>,
}

impl SimulatedDaqBuilder {
    /// Channel layout.
    pub fn channels(mut self, counts: ChannelCounts) -> Self {
        self.config.digital_inputs = counts.digital_inputs;
        self.config.digital_outputs = counts.digital_outputs;
        self.config.analog_inputs = counts.analog_inputs;
        self.config.analog_outputs = counts.analog_outputs;
        self.config.encoders = counts.encoders;
        self
    }

    /// Plant integration step [s].
    pub fn dt(mut self, dt: f64) -> Self {
        self.config.dt = dt;
        self
    }

    /// Add a simulated capstan.
    pub fn plant(mut self, plant: PlantConfig) -> Self {
        self.config.plants.push(plant);
        self
    }

    /// Make `open()` fail.
    pub fn fail_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Make `enable()` fail.
    pub fn fail_enable(mut self) -> Self {
        self.fail_enable = true;
        self
    }

    /// Make `read_all()` fail once `reads` reads succeeded.
    pub fn fail_read_after(mut self, reads: u64) -> Self {
        self.fail_read_after = Some(reads);
        self
    }

    /// Build the DAQ.
    ///
    /// # Errors
    /// `DaqError::ConfigError` if the configuration is invalid.
    pub fn build(self) -> Result<SimulatedDaq, DaqError> {
        let daq = SimulatedDaq::from_config(&self.config)?;
        {
            let mut state = daq.state.lock();
            state.fail_open = self.fail_open;
            state.fail_enable = self.fail_enable;
            state.fail_read_after = self.fail_read_after;
        }
        Ok(daq)
    }
}
