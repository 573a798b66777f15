//! Custom mode delegates to an installed controller.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use capstan_common::device::params::ControlMode;
use capstan_control::device::{CustomController, DeviceCore};

use super::common::{MockIo, module, unit_params};

/// Holds the spool at `ctrl_value` degrees and counts its invocations.
struct HoldAt {
    calls: AtomicU64,
}

impl CustomController for HoldAt {
    fn update(&self, ctrl_value: f64, _time: f64, device: &mut DeviceCore) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        device.control_spool_position(ctrl_value);
    }
}

#[test]
fn custom_controller_runs_once_per_tick() {
    let cm = module(unit_params());
    cm.set_position_gains(0.01, 0.0).unwrap();
    let controller = Arc::new(HoldAt {
        calls: AtomicU64::new(0),
    });
    cm.set_custom_controller(Some(controller.clone()));
    cm.set_control_mode(ControlMode::Custom);
    cm.set_control_value(30.0);
    cm.enable();

    let mut io = MockIo::default();
    for i in 0..5 {
        cm.update(i as f64 * 0.001, &mut io).unwrap();
    }

    assert_eq!(controller.calls.load(Ordering::Relaxed), 5);
    let q = cm.query(false);
    // Custom control values are not clamped.
    assert_eq!(q.ctrl_value_filtered, 30.0);
    assert_eq!(q.reference, 30.0);
    assert!((q.law_torque - 0.3).abs() < 1e-12);
    assert!((io.ao[0] - 0.3).abs() < 1e-12);
}

#[test]
fn closure_controller_sees_time() {
    let cm = module(unit_params());
    cm.set_custom_controller(Some(Arc::new(|_cv: f64, t: f64, dev: &mut DeviceCore| {
        dev.control_torque(t);
    })));
    cm.set_control_mode(ControlMode::Custom);
    cm.enable();

    let mut io = MockIo::default();
    cm.update(0.25, &mut io).unwrap();
    assert!((cm.query(false).torque - 0.25).abs() < 1e-12);
}

#[test]
fn custom_mode_without_controller_commands_zero() {
    let cm = module(unit_params());
    cm.set_control_mode(ControlMode::Custom);
    cm.set_control_value(0.7);
    cm.enable();

    let mut io = MockIo::default();
    io.ao[0] = 1.0;
    cm.update(0.0, &mut io).unwrap();

    let q = cm.query(false);
    assert_eq!(q.law_torque, 0.0);
    assert_eq!(io.ao[0], 0.0);
    assert!(q.limits.is_empty());
}

#[test]
fn removing_controller_stops_delegation() {
    let cm = module(unit_params());
    cm.set_custom_controller(Some(Arc::new(|_cv: f64, _t: f64, dev: &mut DeviceCore| {
        dev.control_torque(1.0);
    })));
    cm.set_control_mode(ControlMode::Custom);
    cm.enable();

    let mut io = MockIo::default();
    cm.update(0.0, &mut io).unwrap();
    assert_eq!(cm.query(false).torque, 1.0);

    cm.set_custom_controller(None);
    cm.update(0.001, &mut io).unwrap();
    assert_eq!(cm.query(false).torque, 0.0);
}
