//! Mass-spring capstan plant.
//!
//! One simulated motor and spool wired to DAQ channels. The motor turns
//! against a rotational spring and viscous damping:
//!
//! ```text
//! J·θ̈ = τ − k·θ − b·θ̇      τ = torque_per_volt · V   (0 while disabled)
//! ```
//!
//! with θ in motor degrees. The encoder reports θ, the load cell reports a
//! voltage proportional to the spring deflection.

use serde::Deserialize;

/// Channel wiring and physical constants of one plant.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlantConfig {
    /// Amplifier enable (digital output).
    pub enable: u32,
    /// Motor command (analog output).
    pub command: u32,
    /// Motor encoder.
    pub encoder: u32,
    /// Load cell analog input, if wired.
    pub force_input: Option<u32>,
    /// Rotor and spool inertia [Nm/(deg/s²)].
    pub inertia: f64,
    /// Viscous damping [Nm/(deg/s)].
    pub damping: f64,
    /// Spring stiffness [Nm/deg].
    pub stiffness: f64,
    /// Amplifier and motor gain [Nm/V].
    pub torque_per_volt: f64,
    /// Encoder resolution [counts/deg].
    pub counts_per_deg: f64,
    /// Load cell output per degree of deflection [V/deg].
    pub force_volts_per_deg: f64,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            enable: 0,
            command: 0,
            encoder: 0,
            force_input: None,
            inertia: 0.001,
            damping: 0.0,
            stiffness: 0.001,
            torque_per_volt: 1.0,
            counts_per_deg: 100.0,
            force_volts_per_deg: 0.0,
        }
    }
}

impl PlantConfig {
    /// Check physical constants.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.inertia.is_finite() && self.inertia > 0.0) {
            return Err(format!("inertia must be > 0, got {}", self.inertia));
        }
        if !(self.counts_per_deg.is_finite() && self.counts_per_deg > 0.0) {
            return Err(format!("counts_per_deg must be > 0, got {}", self.counts_per_deg));
        }
        for (name, value) in [
            ("damping", self.damping),
            ("stiffness", self.stiffness),
            ("torque_per_volt", self.torque_per_volt),
            ("force_volts_per_deg", self.force_volts_per_deg),
        ] {
            if !value.is_finite() {
                return Err(format!("{name} must be finite"));
            }
        }
        Ok(())
    }
}

/// Simulated motor and spool state.
#[derive(Debug, Clone)]
pub struct CapstanPlant {
    config: PlantConfig,
    position: f64,
    velocity: f64,
}

impl CapstanPlant {
    /// Plant at rest in its spring's neutral position.
    pub fn new(config: PlantConfig) -> Self {
        Self {
            config,
            position: 0.0,
            velocity: 0.0,
        }
    }

    /// Wiring and constants.
    pub fn config(&self) -> &PlantConfig {
        &self.config
    }

    /// Motor position [deg].
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Motor velocity [deg/s].
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Advance by `dt` under command `volts` (semi-implicit Euler).
    pub fn step(&mut self, volts: f64, enabled: bool, dt: f64) {
        let c = &self.config;
        let torque = if enabled { c.torque_per_volt * volts } else { 0.0 };
        let accel = (torque - c.stiffness * self.position - c.damping * self.velocity) / c.inertia;
        self.velocity += accel * dt;
        self.position += self.velocity * dt;
    }

    /// Encoder position [counts].
    pub fn encoder_counts(&self) -> i64 {
        (self.position * self.config.counts_per_deg).round() as i64
    }

    /// Encoder velocity [counts/s].
    pub fn encoder_velocity(&self) -> f64 {
        self.velocity * self.config.counts_per_deg
    }

    /// Load cell voltage [V].
    pub fn force_volts(&self) -> f64 {
        self.config.force_volts_per_deg * self.position
    }
}
