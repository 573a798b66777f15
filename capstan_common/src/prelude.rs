//! Prelude module for common re-exports.
//!
//! Consumers can `use capstan_common::prelude::*;` to get the types most
//! crates in the workspace touch.
//!
//! # Usage
//!
//! ```rust
//! use capstan_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, ConfigSaver, LogLevel, SharedConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DEFAULT_SAMPLE_RATE, HISTORY_LEN};

// ─── DAQ ────────────────────────────────────────────────────────────
pub use crate::daq::driver::{Daq, DaqError, DaqFactory, DaqIo};
pub use crate::daq::types::{ChannelCounts, ChannelKind};

// ─── Sensors ────────────────────────────────────────────────────────
pub use crate::sensor::{Axis, ForceSensor, FtComponent};

// ─── Devices ────────────────────────────────────────────────────────
pub use crate::device::limits::LimitViolation;
pub use crate::device::params::{ControlMode, FilterMode, Params, ctrl_value_bounds};
pub use crate::device::query::Query;

// ─── Hub ────────────────────────────────────────────────────────────
pub use crate::hub::{HubError, HubQuery, HubStatus};
