//! Control engine root.
//!
//! PID primitive, signal conditioning filters and the per-mode control laws.

pub mod filters;
pub mod law;
pub mod pid;
