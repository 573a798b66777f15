//! Per-device shared types.
//!
//! Parameters, control/filter modes, snapshots and limit flags for one
//! Capstan Module. These are the contract between the controller and any
//! observer (GUI, experiment logic, loggers).

pub mod limits;
pub mod params;
pub mod query;
