//! DAQ driver implementations.
//!
//! - [`simulation`] - Software DAQ with simulated capstans
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `Daq` trait from `capstan_common::daq::driver`
//! 3. Register its factory in [`register_builtin_drivers`]

pub mod simulation;

use crate::driver_registry::DaqRegistry;

/// Register every built-in driver.
pub fn register_builtin_drivers(registry: &mut DaqRegistry) {
    registry.register("simulation", simulation::create_driver);
}
