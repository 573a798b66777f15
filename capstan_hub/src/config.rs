//! Hub configuration file.
//!
//! # TOML Example
//!
//! ```toml
//! sample_rate = 1000.0
//! soft = false
//! driver = "simulation"
//!
//! [shared]
//! service_name = "capstan-rig-01"
//!
//! [driver_config]
//! analog_inputs = 4
//!
//! [[devices]]
//! id = 1
//! name = "left"
//! params_file = "left_params.toml"
//!
//! [devices.binding]
//! enable = 0
//! fault = 0
//! command = 0
//! encoder = 0
//! force = { kind = "analog", channel = 0, gain = 20.0 }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use capstan_common::config::{ConfigError, ConfigLoader, SharedConfig};
use capstan_common::consts::{DEFAULT_SAMPLE_RATE, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
use capstan_common::device::params::{ControlMode, Params};
use capstan_common::sensor::FtComponent;
use capstan_control::device::{ForceSource, IoBinding};
use capstan_control::sensor::CalibratedFtSensor;
use serde::Deserialize;

use crate::rt::DEFAULT_RT_PRIORITY;

fn default_sample_rate() -> f64 {
    DEFAULT_SAMPLE_RATE
}

fn default_rt_priority() -> i32 {
    DEFAULT_RT_PRIORITY
}

fn default_driver() -> String {
    "simulation".to_string()
}

fn default_gain() -> f64 {
    1.0
}

/// Top-level hub configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HubConfig {
    /// Logging and instance identity.
    pub shared: SharedConfig,
    /// Loop rate [Hz].
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
    /// Run without synchronizing the DAQ.
    #[serde(default)]
    pub soft: bool,
    /// `SCHED_FIFO` priority of the loop thread (`rt` feature only).
    #[serde(default = "default_rt_priority")]
    pub rt_priority: i32,
    /// Registered DAQ driver name.
    #[serde(default = "default_driver")]
    pub driver: String,
    /// Driver-specific settings, handed to the driver factory.
    #[serde(default)]
    pub driver_config: toml::Table,
    /// Devices created at startup.
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl HubConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    /// `ConfigError::ValidationError` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if !(self.sample_rate.is_finite()
            && (MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate))
        {
            return Err(ConfigError::ValidationError(format!(
                "sample_rate must be within [{MIN_SAMPLE_RATE}, {MAX_SAMPLE_RATE}] Hz, got {}",
                self.sample_rate
            )));
        }
        if self.driver.is_empty() {
            return Err(ConfigError::ValidationError(
                "driver cannot be empty".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for device in &self.devices {
            if !ids.insert(device.id) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate device id: {}",
                    device.id
                )));
            }
            device.validate()?;
        }
        Ok(())
    }
}

/// One device created at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// Registry id.
    pub id: u32,
    /// Device name used in logs.
    pub name: String,
    /// DAQ channels.
    pub binding: BindingConfig,
    /// Params file, relative to the hub config's directory.
    #[serde(default)]
    pub params_file: Option<PathBuf>,
    /// Inline params.
    #[serde(default)]
    pub params: Option<Params>,
    /// Initial control mode.
    #[serde(default)]
    pub mode: ControlMode,
    /// Initial control value.
    #[serde(default)]
    pub ctrl_value: f64,
    /// Enable the amplifier on startup.
    #[serde(default)]
    pub enabled: bool,
}

impl DeviceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "device {}: name cannot be empty",
                self.id
            )));
        }
        if self.params.is_some() && self.params_file.is_some() {
            return Err(ConfigError::ValidationError(format!(
                "device {}: params and params_file are mutually exclusive",
                self.id
            )));
        }
        if let Some(params) = &self.params {
            params.validate()?;
        }
        Ok(())
    }

    /// Resolve the device's params: inline, from file, or defaults.
    ///
    /// # Errors
    /// Load or validation errors of the params file.
    pub fn load_params(&self, config_dir: &Path) -> Result<Params, ConfigError> {
        let params = match (&self.params, &self.params_file) {
            (Some(params), _) => *params,
            (None, Some(path)) => Params::load(&resolve_path(config_dir, path))?,
            (None, None) => Params::default(),
        };
        params.validate()?;
        Ok(params)
    }
}

/// DAQ channels of one device.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingConfig {
    /// Amplifier enable (digital output).
    pub enable: u32,
    /// Amplifier fault (digital input).
    pub fault: u32,
    /// Motor command (analog output).
    pub command: u32,
    /// Motor encoder.
    pub encoder: u32,
    /// Force measurement.
    pub force: ForceConfig,
}

/// Force measurement source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForceConfig {
    /// Load cell on one analog input.
    Analog {
        /// Analog input channel.
        channel: u32,
        /// Scale [N/V].
        #[serde(default = "default_gain")]
        gain: f64,
        /// Offset [N].
        #[serde(default)]
        offset: f64,
    },
    /// One component of a six-axis sensor on six analog inputs.
    Sensor {
        /// Gauge channels.
        channels: [u32; 6],
        /// Calibration matrix, identity when omitted.
        #[serde(default)]
        matrix: Option<[[f64; 6]; 6]>,
        /// Component used as the device's force.
        component: FtComponent,
    },
}

impl BindingConfig {
    /// Build the runtime binding.
    pub fn build(&self) -> IoBinding {
        let force = match &self.force {
            ForceConfig::Analog {
                channel,
                gain,
                offset,
            } => ForceSource::Analog {
                channel: *channel,
                gain: *gain,
                offset: *offset,
            },
            ForceConfig::Sensor {
                channels,
                matrix,
                component,
            } => {
                let sensor = match matrix {
                    Some(matrix) => CalibratedFtSensor::new(*channels, *matrix),
                    None => CalibratedFtSensor::identity(*channels),
                };
                ForceSource::Sensor {
                    sensor: Box::new(sensor),
                    component: *component,
                }
            }
        };
        IoBinding {
            enable: self.enable,
            fault: self.fault,
            command: self.command,
            encoder: self.encoder,
            force,
        }
    }
}

/// Resolve a possibly relative path against a base directory.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
