//! Simulation driver module.
//!
//! Software DAQ for development and testing without physical hardware.
//! Each configured plant closes the loop between a command output and an
//! encoder/load-cell pair.

mod daq;
mod plant;

pub use daq::{SimProbe, SimulatedDaq, SimulatedDaqBuilder, SimulationConfig};
pub use plant::{CapstanPlant, PlantConfig};

use capstan_common::daq::driver::{Daq, DaqError};

/// Factory function to create a simulated DAQ from its `[driver_config]` table.
pub fn create_driver(config: &toml::Table) -> Result<Box<dyn Daq>, DaqError> {
    let config: SimulationConfig = toml::Value::Table(config.clone())
        .try_into()
        .map_err(|e| DaqError::ConfigError(format!("simulation driver: {e}")))?;
    Ok(Box::new(SimulatedDaq::from_config(&config)?))
}
