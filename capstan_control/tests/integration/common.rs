//! Shared fixtures: in-memory DAQ and a simulated spool.

use capstan_common::daq::driver::{DaqError, DaqIo};
use capstan_common::daq::types::{ChannelCounts, ChannelKind};
use capstan_common::device::params::Params;
use capstan_control::device::{CapstanModule, IoBinding};

pub const DT: f64 = 0.001;
pub const COUNTS_PER_DEG: f64 = 100.0;

/// Buffered channels with direct test access.
#[derive(Debug, Clone, Default)]
pub struct MockIo {
    pub di: [bool; 2],
    pub dout: [bool; 2],
    pub ai: [f64; 4],
    pub ao: [f64; 2],
    pub counts: [i64; 2],
    pub counts_per_sec: [f64; 2],
}

impl DaqIo for MockIo {
    fn channel_counts(&self) -> ChannelCounts {
        ChannelCounts {
            digital_inputs: 2,
            digital_outputs: 2,
            analog_inputs: 4,
            analog_outputs: 2,
            encoders: 2,
        }
    }

    fn digital_input(&self, channel: u32) -> Result<bool, DaqError> {
        self.check_channel(ChannelKind::DigitalInput, channel)?;
        Ok(self.di[channel as usize])
    }

    fn set_digital_output(&mut self, channel: u32, value: bool) -> Result<(), DaqError> {
        self.check_channel(ChannelKind::DigitalOutput, channel)?;
        self.dout[channel as usize] = value;
        Ok(())
    }

    fn analog_input(&self, channel: u32) -> Result<f64, DaqError> {
        self.check_channel(ChannelKind::AnalogInput, channel)?;
        Ok(self.ai[channel as usize])
    }

    fn set_analog_output(&mut self, channel: u32, volts: f64) -> Result<(), DaqError> {
        self.check_channel(ChannelKind::AnalogOutput, channel)?;
        self.ao[channel as usize] = volts;
        Ok(())
    }

    fn encoder_counts(&self, channel: u32) -> Result<i64, DaqError> {
        self.check_channel(ChannelKind::Encoder, channel)?;
        Ok(self.counts[channel as usize])
    }

    fn encoder_velocity(&self, channel: u32) -> Result<f64, DaqError> {
        self.check_channel(ChannelKind::Encoder, channel)?;
        Ok(self.counts_per_sec[channel as usize])
    }
}

/// Unit calibration: 1 V = 1 Nm at the motor, direct drive,
/// 100 counts per degree, generous limits.
pub fn unit_params() -> Params {
    Params {
        kt: 1.0,
        command_gain: 1.0,
        command_max: 100.0,
        gear_ratio: 1.0,
        counts_per_deg: COUNTS_PER_DEG,
        velocity_max: 10_000.0,
        torque_max: 50.0,
        ..Params::default()
    }
}

/// Device bound to channel 0 of every family.
pub fn module(params: Params) -> CapstanModule {
    CapstanModule::new("cm0", IoBinding::analog(0, 0, 0, 0, 0), params).unwrap()
}

/// Spool with inertia, viscous damping and an optional spring that
/// produces the measured force.
pub struct SimulatedSpool {
    /// Angle [deg].
    pub position: f64,
    /// Speed [deg/s].
    pub velocity: f64,
    /// Inertia [Nm per deg/s²].
    pub inertia: f64,
    /// Viscous damping [1/s].
    pub damping: f64,
    /// Spring rate [N/deg]; force is read from AI 0 at 1 N/V.
    pub stiffness: f64,
}

impl SimulatedSpool {
    pub fn new(inertia: f64, damping: f64, stiffness: f64) -> Self {
        Self {
            position: 0.0,
            velocity: 0.0,
            inertia,
            damping,
            stiffness,
        }
    }

    /// Latch the spool state into the inputs.
    pub fn sense(&self, io: &mut MockIo) {
        io.counts[0] = (self.position * COUNTS_PER_DEG).round() as i64;
        io.counts_per_sec[0] = self.velocity * COUNTS_PER_DEG;
        io.ai[0] = self.stiffness * self.position;
    }

    /// Integrate one period under the commanded torque (1 Nm/V).
    pub fn step(&mut self, io: &MockIo, dt: f64) {
        let torque = if io.dout[0] { io.ao[0] } else { 0.0 };
        let accel = torque / self.inertia - self.damping * self.velocity;
        self.velocity += accel * dt;
        self.position += self.velocity * dt;
    }
}

/// Run `ticks` closed-loop ticks starting at tick index `start`.
pub fn run_closed_loop(
    cm: &CapstanModule,
    spool: &mut SimulatedSpool,
    io: &mut MockIo,
    start: usize,
    ticks: usize,
) {
    for i in start..start + ticks {
        spool.sense(io);
        cm.update(i as f64 * DT, io).unwrap();
        spool.step(io, DT);
    }
}
