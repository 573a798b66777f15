//! Hub status snapshot and error types.

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::daq::driver::DaqError;

/// Run state of a hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HubStatus {
    /// No loop thread.
    #[default]
    Idle,
    /// Loop thread ticking.
    Running,
    /// Loop thread exited after a DAQ failure; waiting for `stop`.
    Error,
}

/// Aggregate hub snapshot, republished every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HubQuery {
    /// Run state.
    pub status: HubStatus,
    /// Registered devices.
    pub device_count: usize,
    /// Time since `start` at the last tick [s].
    pub time: f64,
    /// Ticks since `start`.
    pub ticks: u64,
    /// Target sample rate [Hz].
    pub sample_rate: f64,
    /// Ticks that finished after their deadline.
    pub missed_deadlines: u64,
    /// `missed_deadlines / ticks`.
    pub miss_rate: f64,
    /// Ticks whose lock acquisition had to wait.
    pub lock_contentions: u64,
    /// Achieved loop rate over the last measurement window [Hz].
    pub loop_rate: f64,
}

/// Errors returned by hub operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HubError {
    /// Device id already registered, or not registered.
    #[error("Invalid device id {0}")]
    InvalidId(u32),

    /// `start` while the loop is running or has not been stopped after an error.
    #[error("Hub already running")]
    AlreadyRunning,

    /// `stop` without a loop thread.
    #[error("Hub not running")]
    NotRunning,

    /// DAQ could not be opened.
    #[error("DAQ open failed: {0}")]
    DaqOpenFailed(DaqError),

    /// DAQ outputs could not be enabled.
    #[error("DAQ enable failed: {0}")]
    DaqEnableFailed(DaqError),

    /// Device binding addresses a channel the DAQ does not have.
    #[error("Invalid binding for device {id}: {source}")]
    InvalidBinding {
        /// Device id.
        id: u32,
        /// Offending channel.
        source: DaqError,
    },

    /// Device parameters rejected.
    #[error("Invalid parameters: {0}")]
    InvalidParams(#[from] ConfigError),

    /// Sample rate outside the accepted range.
    #[error("Invalid sample rate {0} Hz")]
    InvalidSampleRate(f64),

    /// The loop thread could not be created.
    #[error("Failed to spawn loop thread: {0}")]
    ThreadSpawn(String),
}
