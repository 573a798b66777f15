//! Soft limiting zeroes the command for the offending tick only.

use capstan_common::device::limits::LimitViolation;
use capstan_common::device::params::ControlMode;

use super::common::{COUNTS_PER_DEG, MockIo, module, unit_params};

#[test]
fn over_speed_zeroes_one_tick_then_recovers() {
    let mut params = unit_params();
    params.velocity_max = 100.0;
    let cm = module(params);
    cm.set_control_mode(ControlMode::Torque);
    cm.set_control_value(0.02); // 1 Nm
    cm.enable();

    let mut io = MockIo::default();
    io.counts_per_sec[0] = 150.0 * COUNTS_PER_DEG;
    cm.update(0.0, &mut io).unwrap();

    let q = cm.query(false);
    assert_eq!(io.ao[0], 0.0);
    assert_eq!(q.command_volts, 0.0);
    assert_eq!(q.limits, LimitViolation::VELOCITY);
    assert_eq!(q.velocity_violations, 1);
    assert!((q.law_torque - 1.0).abs() < 1e-12);

    io.counts_per_sec[0] = 50.0 * COUNTS_PER_DEG;
    cm.update(0.001, &mut io).unwrap();

    let q = cm.query(false);
    assert!((io.ao[0] - 1.0).abs() < 1e-12);
    assert!(q.limits.is_empty());
    assert_eq!(q.velocity_violations, 1);
}

#[test]
fn negative_over_speed_is_limited() {
    let mut params = unit_params();
    params.velocity_max = 100.0;
    let cm = module(params);
    cm.set_control_value(0.02);
    cm.enable();

    let mut io = MockIo::default();
    io.counts_per_sec[0] = -101.0 * COUNTS_PER_DEG;
    cm.update(0.0, &mut io).unwrap();
    assert_eq!(io.ao[0], 0.0);
}

#[test]
fn over_torque_from_law_is_zeroed() {
    let cm = module(unit_params());
    cm.set_torque_max(0.1).unwrap();
    cm.set_position_gains(1.0, 0.0).unwrap();
    cm.set_control_mode(ControlMode::Position);
    cm.set_control_value(0.5); // 50 deg away
    cm.enable();

    let mut io = MockIo::default();
    cm.update(0.0, &mut io).unwrap();

    let q = cm.query(false);
    assert_eq!(q.limits, LimitViolation::TORQUE);
    assert_eq!(q.torque, 0.0);
    assert_eq!(io.ao[0], 0.0);
    assert!(io.dout[0]);
    assert_eq!(q.torque_violations, 1);
}

#[test]
fn non_finite_control_value_is_blocked() {
    let cm = module(unit_params());
    cm.set_control_value(f64::NAN);
    cm.enable();

    let mut io = MockIo::default();
    io.ao[0] = 2.0;
    cm.update(0.0, &mut io).unwrap();

    let q = cm.query(false);
    assert!(q.limits.contains(LimitViolation::NON_FINITE));
    assert_eq!(io.ao[0], 0.0);
}

#[test]
fn violations_accumulate() {
    let mut params = unit_params();
    params.velocity_max = 10.0;
    let cm = module(params);
    cm.enable();

    let mut io = MockIo::default();
    io.counts_per_sec[0] = 20.0 * COUNTS_PER_DEG;
    for i in 0..25 {
        cm.update(i as f64 * 0.001, &mut io).unwrap();
    }
    assert_eq!(cm.query(false).velocity_violations, 25);
}

#[test]
fn disabled_device_is_not_limited() {
    let mut params = unit_params();
    params.velocity_max = 10.0;
    let cm = module(params);

    let mut io = MockIo::default();
    io.counts_per_sec[0] = 20.0 * COUNTS_PER_DEG;
    cm.update(0.0, &mut io).unwrap();

    let q = cm.query(false);
    assert!(q.limits.is_empty());
    assert_eq!(q.velocity_violations, 0);
    assert_eq!(io.ao[0], 0.0);
}
