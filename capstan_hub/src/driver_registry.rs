//! Driver registry for DAQ drivers.
//!
//! Provides a `DaqRegistry` struct for registering and retrieving DAQ driver
//! factories. Constructed at startup and passed by value, no global state.

use capstan_common::daq::driver::{Daq, DaqError, DaqFactory};
use std::collections::HashMap;

use crate::drivers::register_builtin_drivers;

/// Registry of available DAQ drivers.
pub struct DaqRegistry {
    factories: HashMap<&'static str, DaqFactory>,
}

impl DaqRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry holding every driver shipped with the hub.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        register_builtin_drivers(&mut registry);
        registry
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: DaqFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<DaqFactory> {
        self.factories.get(name).copied()
    }

    /// Create a DAQ instance by name from its driver-specific config table.
    ///
    /// # Errors
    /// `DaqError::DriverNotFound` if no driver with the given name is
    /// registered, or the factory's own configuration error.
    pub fn create_driver(&self, name: &str, config: &toml::Table) -> Result<Box<dyn Daq>, DaqError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| DaqError::DriverNotFound(name.to_string()))?;
        factory(config)
    }

    /// List all registered driver names, sorted.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DaqRegistry {
    fn default() -> Self {
        Self::new()
    }
}
