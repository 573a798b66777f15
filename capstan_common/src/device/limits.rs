//! Soft safety limit flags.
//!
//! A flag set in a tick means the command written during that tick was
//! forced to zero. Flags never latch: they are recomputed every tick.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Safety limits violated during one tick.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct LimitViolation: u8 {
        /// Sensed spool velocity exceeded `velocity_max`.
        const VELOCITY   = 0x01;
        /// Commanded torque exceeded `torque_max`.
        const TORQUE     = 0x02;
        /// Control law produced NaN or infinity.
        const NON_FINITE = 0x04;
    }
}

impl Default for LimitViolation {
    fn default() -> Self {
        Self::empty()
    }
}

impl LimitViolation {
    /// Returns true if the tick's command had to be zeroed.
    #[inline]
    pub const fn blocks_output(&self) -> bool {
        !self.is_empty()
    }
}
