//! DAQ driver traits and error types.
//!
//! This module defines:
//! - `DaqIo` trait - Per-channel access used by devices inside a tick
//! - `Daq` trait - Lifecycle and bulk synchronization owned by the hub
//! - `DaqError` enum - Error types for DAQ operations
//! - `DaqFactory` type alias - Factory function type for the driver registry

use crate::daq::types::{ChannelCounts, ChannelKind};
use thiserror::Error;

/// Error types for DAQ operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DaqError {
    /// Opening the device failed.
    #[error("Open failed: {0}")]
    OpenFailed(String),

    /// Enabling or disabling outputs failed.
    #[error("Enable failed: {0}")]
    EnableFailed(String),

    /// Bulk input synchronization failed.
    #[error("Read failed: {0}")]
    ReadFailed(String),

    /// Bulk output synchronization failed.
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Channel index out of range for this DAQ.
    #[error("Invalid {kind} channel {channel}")]
    InvalidChannel {
        /// Channel family.
        kind: ChannelKind,
        /// Requested index.
        channel: u32,
    },

    /// Driver-specific configuration rejected.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No driver registered under this name.
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
}

/// Factory function type for creating DAQ instances from driver config.
pub type DaqFactory = fn(&toml::Table) -> Result<Box<dyn Daq>, DaqError>;

/// Per-channel access to buffered DAQ values.
///
/// Reads return the value latched by the last `Daq::read_all`; writes are
/// buffered until the next `Daq::write_all`. Devices only ever see this
/// trait, handed to them by the hub inside a tick.
pub trait DaqIo: Send {
    /// Channels exposed by this DAQ.
    fn channel_counts(&self) -> ChannelCounts;

    /// Latched digital input state.
    fn digital_input(&self, channel: u32) -> Result<bool, DaqError>;

    /// Buffer a digital output state.
    fn set_digital_output(&mut self, channel: u32, value: bool) -> Result<(), DaqError>;

    /// Latched analog input [V].
    fn analog_input(&self, channel: u32) -> Result<f64, DaqError>;

    /// Buffer an analog output [V].
    fn set_analog_output(&mut self, channel: u32, volts: f64) -> Result<(), DaqError>;

    /// Latched encoder position [counts].
    fn encoder_counts(&self, channel: u32) -> Result<i64, DaqError>;

    /// Latched encoder velocity [counts/s].
    fn encoder_velocity(&self, channel: u32) -> Result<f64, DaqError>;

    /// Check that `channel` exists, returning `DaqError::InvalidChannel` otherwise.
    fn check_channel(&self, kind: ChannelKind, channel: u32) -> Result<(), DaqError> {
        if self.channel_counts().contains(kind, channel) {
            Ok(())
        } else {
            Err(DaqError::InvalidChannel { kind, channel })
        }
    }
}

/// Trait defining the interface for DAQ drivers.
///
/// The hub exclusively owns one `Daq` and drives it through this trait.
///
/// # Lifecycle
///
/// 1. `open()` / `enable()` - On hub start (skipped in soft mode)
/// 2. `read_all()` / `write_all()` - Once per tick (skipped in soft mode)
/// 3. `disable()` / `close()` - On hub stop
///
/// # Timing Contracts
///
/// | Operation | RT Constraint |
/// |-----------|---------------|
/// | `open()` / `enable()` | None (pre-loop) |
/// | `read_all()` / `write_all()` | **HARD**, within one tick |
/// | `disable()` / `close()` | None (post-loop) |
pub trait Daq: DaqIo {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Open the device.
    fn open(&mut self) -> Result<(), DaqError>;

    /// Enable outputs and watchdogs.
    fn enable(&mut self) -> Result<(), DaqError>;

    /// Disable outputs, driving them to their safe state.
    fn disable(&mut self) -> Result<(), DaqError>;

    /// Close the device.
    fn close(&mut self) -> Result<(), DaqError>;

    /// Latch all inputs from hardware in one transfer.
    fn read_all(&mut self) -> Result<(), DaqError>;

    /// Push all buffered outputs to hardware in one transfer.
    fn write_all(&mut self) -> Result<(), DaqError>;

    /// Returns true between a successful `open()` and `close()`.
    fn is_open(&self) -> bool;
}
