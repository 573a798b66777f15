//! Safety module root.
//!
//! Soft per-tick velocity and torque limiting.

pub mod limits;
