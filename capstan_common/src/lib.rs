//! Capstan Common Library
//!
//! Shared types and collaborator contracts for all Capstan workspace crates.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - System-wide numeric limits
//! - [`daq`] - DAQ collaborator traits, channel types and errors
//! - [`sensor`] - Force/torque sensor collaborator trait
//! - [`device`] - Per-device parameters, modes, snapshots and limit flags
//! - [`hub`] - Hub status snapshot and error types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use capstan_common::prelude::*;
//!
//! let params = Params::default();
//! assert!(params.validate().is_ok());
//! ```

pub mod config;
pub mod consts;
pub mod daq;
pub mod device;
pub mod hub;
pub mod prelude;
pub mod sensor;
