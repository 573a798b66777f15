//! Reference scaling through the device handle.

use capstan_common::device::params::ControlMode;
use proptest::prelude::*;

use super::common::{module, unit_params};

const MODES: [ControlMode; 5] = [
    ControlMode::Torque,
    ControlMode::Position,
    ControlMode::Force,
    ControlMode::ForceHybrid,
    ControlMode::Custom,
];

#[test]
fn position_midpoint_maps_to_half() {
    let cm = module(unit_params());
    cm.set_position_range(0.0, 100.0).unwrap();
    cm.set_control_mode(ControlMode::Position);
    assert!((cm.scale_ref_to_ctrl_value(50.0) - 0.5).abs() < 1e-12);
    assert!((cm.scale_ctrl_value(0.5, ControlMode::Position) - 50.0).abs() < 1e-12);
}

proptest! {
    #[test]
    fn device_scaling_round_trips(
        reference in -500.0f64..500.0,
        mode_index in 0usize..5,
        torque_max in 0.01f64..10.0,
    ) {
        let cm = module(unit_params());
        cm.set_torque_max(torque_max).unwrap();
        cm.set_force_range(-20.0, 35.0).unwrap();
        let mode = MODES[mode_index];
        cm.set_control_mode(mode);

        let cv = cm.scale_ref_to_ctrl_value(reference);
        let back = cm.scale_ctrl_value(cv, mode);
        prop_assert!((back - reference).abs() <= 1e-9 * (1.0 + reference.abs()));
    }
}
