//! Capstan device hub.
//!
//! This crate provides:
//! - [`Hub`] - DAQ owner, device registry and fixed-rate loop thread
//! - [`DaqRegistry`] - Named DAQ driver factories
//! - [`config::HubConfig`] - Hub configuration file
//! - [`drivers::simulation`] - Simulated DAQ with a capstan plant

pub mod config;
pub mod core;
pub mod driver_registry;
pub mod drivers;
pub mod rt;
pub mod stats;

pub use crate::core::Hub;
pub use driver_registry::DaqRegistry;
