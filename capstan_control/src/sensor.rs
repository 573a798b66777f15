//! Six-axis force/torque sensor sampled through analog inputs.
//!
//! The sensor's six gauge voltages are multiplied by a 6×6 calibration
//! matrix to give `[Fx, Fy, Fz, Tx, Ty, Tz]`. The matrix comes from the
//! sensor vendor and is supplied once at construction.

use capstan_common::daq::driver::{DaqError, DaqIo};
use capstan_common::daq::types::{ChannelCounts, ChannelKind};
use capstan_common::sensor::{Axis, ForceSensor};

/// Calibrated six-axis force/torque sensor.
#[derive(Debug, Clone)]
pub struct CalibratedFtSensor {
    channels: [u32; 6],
    matrix: [[f64; 6]; 6],
    raw: [f64; 6],
    bias: [f64; 6],
}

impl CalibratedFtSensor {
    /// Create a sensor reading gauges from analog inputs `channels`.
    pub fn new(channels: [u32; 6], matrix: [[f64; 6]; 6]) -> Self {
        Self {
            channels,
            matrix,
            raw: [0.0; 6],
            bias: [0.0; 6],
        }
    }

    /// Sensor whose gauges map one-to-one onto the six components.
    pub fn identity(channels: [u32; 6]) -> Self {
        let mut matrix = [[0.0; 6]; 6];
        for (i, row) in matrix.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Self::new(channels, matrix)
    }

    /// Calibrated components relative to the last zero.
    pub fn components(&self) -> [f64; 6] {
        let mut out = [0.0; 6];
        for (i, value) in out.iter_mut().enumerate() {
            *value = self.raw[i] - self.bias[i];
        }
        out
    }
}

impl ForceSensor for CalibratedFtSensor {
    fn update(&mut self, io: &dyn DaqIo) -> Result<(), DaqError> {
        let mut volts = [0.0; 6];
        for (v, &channel) in volts.iter_mut().zip(self.channels.iter()) {
            *v = io.analog_input(channel)?;
        }
        for (row, out) in self.matrix.iter().zip(self.raw.iter_mut()) {
            *out = row.iter().zip(volts.iter()).map(|(m, v)| m * v).sum();
        }
        Ok(())
    }

    fn force(&self, axis: Axis) -> f64 {
        let i = axis.index();
        self.raw[i] - self.bias[i]
    }

    fn torque(&self, axis: Axis) -> f64 {
        let i = 3 + axis.index();
        self.raw[i] - self.bias[i]
    }

    fn zero(&mut self) {
        self.bias = self.raw;
    }

    fn check_channels(&self, counts: &ChannelCounts) -> Result<(), DaqError> {
        for &channel in &self.channels {
            if !counts.contains(ChannelKind::AnalogInput, channel) {
                return Err(DaqError::InvalidChannel {
                    kind: ChannelKind::AnalogInput,
                    channel,
                });
            }
        }
        Ok(())
    }
}
