//! Experiment-defined control laws.

use super::inner::DeviceCore;

/// Control law installed on a device and run while it is in Custom mode.
///
/// Called once per tick with the device lock held. Implementations drive
/// the motor through the [`DeviceCore`] inner API, typically by calling one
/// of `control_torque`, `control_spool_position`, `control_force` or
/// `control_force_hybrid`. A tick where no inner control call is made
/// commands zero torque.
pub trait CustomController: Send + Sync {
    /// Run the law for one tick.
    fn update(&self, ctrl_value: f64, time: f64, device: &mut DeviceCore);
}

impl<F> CustomController for F
where
    F: Fn(f64, f64, &mut DeviceCore) + Send + Sync,
{
    fn update(&self, ctrl_value: f64, time: f64, device: &mut DeviceCore) {
        self(ctrl_value, time, device)
    }
}
