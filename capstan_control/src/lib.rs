//! # Capstan Control Library
//!
//! Per-device controller for a Capstan Module: a motor-driven spool whose
//! position, force or torque is regulated in closed loop against encoder
//! and force feedback.
//!
//! ## Tick pipeline
//!
//! 1. **Sense** - fault input, encoder, force source
//! 2. **Condition** - Butterworth / median / cascade force filters, dF/dt
//! 3. **Control law** - Torque, Position, Force, ForceHybrid or Custom
//! 4. **Safety** - per-tick velocity and torque limits
//! 5. **Actuate** - enable output and command voltage
//! 6. **Record** - cached [`Query`](capstan_common::device::query::Query)
//!    and fixed-size history
//!
//! ## Locking
//!
//! [`device::CapstanModule`] wraps a [`device::DeviceCore`] in its own
//! mutex. Ticks and custom controllers operate on the locked core; every
//! public handle method takes the lock for one short critical section.

pub mod control;
pub mod device;
pub mod safety;
pub mod sensor;
