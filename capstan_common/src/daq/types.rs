//! DAQ channel types.
//!
//! This module defines:
//! - `ChannelKind` - The five channel families a capstan binding uses
//! - `ChannelCounts` - How many channels of each family a DAQ exposes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel family on a DAQ board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Digital input (e.g. amplifier fault line).
    DigitalInput,
    /// Digital output (e.g. amplifier enable line).
    DigitalOutput,
    /// Analog input [V].
    AnalogInput,
    /// Analog output [V].
    AnalogOutput,
    /// Quadrature encoder (counts and counts/s).
    Encoder,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DigitalInput => "DI",
            Self::DigitalOutput => "DO",
            Self::AnalogInput => "AI",
            Self::AnalogOutput => "AO",
            Self::Encoder => "ENC",
        };
        f.write_str(name)
    }
}

/// Number of channels per family exposed by a DAQ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCounts {
    /// Digital inputs.
    pub digital_inputs: u32,
    /// Digital outputs.
    pub digital_outputs: u32,
    /// Analog inputs.
    pub analog_inputs: u32,
    /// Analog outputs.
    pub analog_outputs: u32,
    /// Encoder channels.
    pub encoders: u32,
}

impl ChannelCounts {
    /// Number of channels of the given family.
    pub const fn count(&self, kind: ChannelKind) -> u32 {
        match kind {
            ChannelKind::DigitalInput => self.digital_inputs,
            ChannelKind::DigitalOutput => self.digital_outputs,
            ChannelKind::AnalogInput => self.analog_inputs,
            ChannelKind::AnalogOutput => self.analog_outputs,
            ChannelKind::Encoder => self.encoders,
        }
    }

    /// Returns true if `channel` addresses an existing channel of `kind`.
    #[inline]
    pub const fn contains(&self, kind: ChannelKind, channel: u32) -> bool {
        channel < self.count(kind)
    }
}
