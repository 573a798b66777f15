//! Mode switches keep filter and integrator state.

use capstan_common::device::params::ControlMode;

use super::common::{MockIo, module, unit_params};

fn tick_range(cm: &capstan_control::device::CapstanModule, io: &mut MockIo, from: usize, to: usize) {
    for i in from..to {
        cm.update(i as f64 * 0.001, io).unwrap();
    }
}

#[test]
fn force_position_force_keeps_integral() {
    let cm = module(unit_params());
    cm.set_force_gains(0.01, 2.0, 0.0).unwrap();
    cm.set_control_value(0.4);
    cm.set_control_mode(ControlMode::Force);

    let mut io = MockIo::default();
    io.ai[0] = 1.0;
    tick_range(&cm, &mut io, 0, 200);
    let integral = cm.query(false).force_integral;
    assert!(integral > 0.0);

    cm.set_control_mode(ControlMode::Position);
    tick_range(&cm, &mut io, 200, 400);
    assert_eq!(cm.query(false).force_integral, integral);

    cm.set_control_mode(ControlMode::Force);
    let q = cm.query(true);
    assert_eq!(q.control_mode, ControlMode::Force);
    assert_eq!(q.force_integral, integral);

    // Integration resumes from the retained value.
    tick_range(&cm, &mut io, 400, 401);
    assert!(cm.query(false).force_integral > integral);
}

#[test]
fn switch_is_immediate_and_filters_continue() {
    let cm = module(unit_params());
    let mut io = MockIo::default();
    io.ai[0] = 3.0;
    tick_range(&cm, &mut io, 0, 500);
    let filtered = cm.query(false).force_filtered;
    assert!((filtered - 3.0).abs() < 1e-9);

    cm.set_control_mode(ControlMode::ForceHybrid);
    tick_range(&cm, &mut io, 500, 501);
    let q = cm.query(false);
    assert_eq!(q.control_mode, ControlMode::ForceHybrid);
    assert!((q.force_filtered - 3.0).abs() < 1e-9);
}

#[test]
fn switching_to_same_mode_is_noop() {
    let cm = module(unit_params());
    cm.set_control_mode(ControlMode::Torque);
    assert_eq!(cm.control_mode(), ControlMode::Torque);
}
