//! DAQ channel binding of one Capstan Module.

use capstan_common::daq::driver::{DaqError, DaqIo};
use capstan_common::daq::types::{ChannelCounts, ChannelKind};
use capstan_common::sensor::{ForceSensor, FtComponent};

/// Where a device's force measurement comes from.
pub enum ForceSource {
    /// Load cell amplifier on one analog input: `F = gain·V + offset`.
    Analog {
        /// Analog input channel.
        channel: u32,
        /// Scale [N/V].
        gain: f64,
        /// Offset [N].
        offset: f64,
    },
    /// One component of a multi-axis force/torque sensor.
    Sensor {
        /// Sensor, owned by the device and sampled every tick.
        sensor: Box<dyn ForceSensor>,
        /// Component used as the device's force.
        component: FtComponent,
    },
}

impl std::fmt::Debug for ForceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Analog {
                channel,
                gain,
                offset,
            } => f
                .debug_struct("Analog")
                .field("channel", channel)
                .field("gain", gain)
                .field("offset", offset)
                .finish(),
            Self::Sensor { component, .. } => f
                .debug_struct("Sensor")
                .field("component", component)
                .finish_non_exhaustive(),
        }
    }
}

impl ForceSource {
    /// Sample the source and return calibrated force [N].
    pub fn read(&mut self, io: &dyn DaqIo) -> Result<f64, DaqError> {
        match self {
            Self::Analog {
                channel,
                gain,
                offset,
            } => Ok(*gain * io.analog_input(*channel)? + *offset),
            Self::Sensor { sensor, component } => {
                sensor.update(io)?;
                Ok(component.read(sensor.as_ref()))
            }
        }
    }
}

/// Channels one Capstan Module reads and drives. Fixed at construction.
#[derive(Debug)]
pub struct IoBinding {
    /// Amplifier enable (digital output).
    pub enable: u32,
    /// Amplifier fault (digital input).
    pub fault: u32,
    /// Motor command (analog output).
    pub command: u32,
    /// Motor encoder.
    pub encoder: u32,
    /// Force measurement.
    pub force: ForceSource,
}

impl IoBinding {
    /// Binding with an analog load cell.
    pub fn analog(enable: u32, fault: u32, command: u32, encoder: u32, force_channel: u32) -> Self {
        Self {
            enable,
            fault,
            command,
            encoder,
            force: ForceSource::Analog {
                channel: force_channel,
                gain: 1.0,
                offset: 0.0,
            },
        }
    }

    /// Replace the analog load cell scale.
    pub fn with_force_scale(mut self, gain: f64, offset: f64) -> Self {
        if let ForceSource::Analog {
            gain: g, offset: o, ..
        } = &mut self.force
        {
            *g = gain;
            *o = offset;
        }
        self
    }

    /// Check every bound channel against a DAQ's channel counts.
    pub fn validate(&self, counts: &ChannelCounts) -> Result<(), DaqError> {
        let check = |kind: ChannelKind, channel: u32| {
            if counts.contains(kind, channel) {
                Ok(())
            } else {
                Err(DaqError::InvalidChannel { kind, channel })
            }
        };

        check(ChannelKind::DigitalOutput, self.enable)?;
        check(ChannelKind::DigitalInput, self.fault)?;
        check(ChannelKind::AnalogOutput, self.command)?;
        check(ChannelKind::Encoder, self.encoder)?;
        match &self.force {
            ForceSource::Analog { channel, .. } => check(ChannelKind::AnalogInput, *channel),
            ForceSource::Sensor { sensor, .. } => sensor.check_channels(counts),
        }
    }
}
