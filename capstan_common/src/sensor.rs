//! Force-sensing collaborator contract.
//!
//! A multi-axis force/torque sensor samples its raw channels through the
//! DAQ once per tick, applies its calibration, and exposes calibrated
//! components. A capstan device reduces it to one configured component.

use crate::daq::driver::{DaqError, DaqIo};
use crate::daq::types::ChannelCounts;
use serde::{Deserialize, Serialize};

/// Cartesian axis of a force/torque sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// X axis.
    X,
    /// Y axis.
    Y,
    /// Z axis.
    Z,
}

impl Axis {
    /// Index into a `[x, y, z]` triple.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// One of the six components reported by a force/torque sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FtComponent {
    /// Force along X [N].
    Fx,
    /// Force along Y [N].
    Fy,
    /// Force along Z [N].
    Fz,
    /// Torque about X [Nm].
    Tx,
    /// Torque about Y [Nm].
    Ty,
    /// Torque about Z [Nm].
    Tz,
}

impl FtComponent {
    /// Read this component from a sensor.
    pub fn read(self, sensor: &dyn ForceSensor) -> f64 {
        match self {
            Self::Fx => sensor.force(Axis::X),
            Self::Fy => sensor.force(Axis::Y),
            Self::Fz => sensor.force(Axis::Z),
            Self::Tx => sensor.torque(Axis::X),
            Self::Ty => sensor.torque(Axis::Y),
            Self::Tz => sensor.torque(Axis::Z),
        }
    }
}

/// Multi-axis force/torque sensor.
///
/// Calibration is loaded and applied once at construction; file formats
/// are the implementor's concern.
pub trait ForceSensor: Send {
    /// Sample raw channels and refresh calibrated values.
    fn update(&mut self, io: &dyn DaqIo) -> Result<(), DaqError>;

    /// Calibrated force along `axis` [N], relative to the last `zero()`.
    fn force(&self, axis: Axis) -> f64;

    /// Calibrated torque about `axis` [Nm], relative to the last `zero()`.
    fn torque(&self, axis: Axis) -> f64;

    /// Rebias so the current reading becomes zero.
    fn zero(&mut self);

    /// Check that every channel the sensor samples exists on a DAQ with
    /// `counts` channels.
    fn check_channels(&self, counts: &ChannelCounts) -> Result<(), DaqError> {
        let _ = counts;
        Ok(())
    }
}
