//! DAQ collaborator contracts.
//!
//! This module contains the traits and types the control core uses to
//! reach the shared data-acquisition hardware. Concrete drivers live in
//! `capstan_hub::drivers`.

pub mod driver;
pub mod types;
