//! TOML persistence for device parameters and hub configuration files.
//!
//! Any `Deserialize` type reads through [`ConfigLoader`] and any
//! `Serialize` type writes through [`ConfigSaver`]; both report failures as
//! [`ConfigError`].
//!
//! ```rust,no_run
//! use capstan_common::config::{ConfigError, ConfigLoader, ConfigSaver};
//! use capstan_common::device::params::Params;
//! use std::path::Path;
//!
//! fn retune(path: &Path) -> Result<(), ConfigError> {
//!     let mut params = Params::load(path)?;
//!     params.set_position_gains(0.01, 0.0002)?;
//!     params.save(path)
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Failure to read, parse, validate or write a TOML file.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// No file at the given path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// Unreadable file or invalid TOML.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Parsed, but a value is out of range or inconsistent.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// Serializing or writing failed.
    #[error("Failed to write configuration: {0}")]
    WriteError(String),
}

/// Default tracing level of a process, lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// `[shared]` table of a process configuration: log level and the name
/// the instance reports itself under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    #[serde(default)]
    pub log_level: LogLevel,
    pub service_name: String,
}

impl SharedConfig {
    /// Reject an empty `service_name`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read a TOML file into `Self`.
///
/// A missing file is `FileNotFound`; any other read error or a syntax or
/// shape mismatch is `ParseError`. Semantic checks are left to the type.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound,
            _ => ConfigError::ParseError(format!("{}: {e}", path.display())),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse an in-memory TOML document.
    fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// Write `Self` as TOML.
pub trait ConfigSaver: Serialize {
    /// Serialize to a TOML document.
    fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::WriteError(e.to_string()))
    }

    /// Serialize and write to `path`, replacing any existing file.
    fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml_string()?;
        std::fs::write(path, content)
            .map_err(|e| ConfigError::WriteError(format!("{}: {e}", path.display())))
    }
}

impl<T: Serialize> ConfigSaver for T {}
