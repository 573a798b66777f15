//! Closed-loop step responses on a simulated spool.

use capstan_common::device::params::{ControlMode, FilterMode};

use super::common::{MockIo, SimulatedSpool, module, run_closed_loop, unit_params};

#[test]
fn position_mode_converges_to_range_midpoint() {
    let cm = module(unit_params());
    cm.set_position_range(0.0, 100.0).unwrap();
    cm.set_position_gains(0.01, 0.001).unwrap();
    cm.set_control_mode(ControlMode::Position);
    cm.set_control_value(0.5);
    cm.enable();

    let mut io = MockIo::default();
    let mut spool = SimulatedSpool::new(0.0001, 1.0, 0.0);
    run_closed_loop(&cm, &mut spool, &mut io, 0, 3000);

    let q = cm.query(false);
    assert!(
        (q.spool_position - 50.0).abs() < 0.5,
        "spool at {} deg",
        q.spool_position
    );
    assert!((q.reference - 50.0).abs() < 1e-12);
    assert!(q.limits.is_empty());
    assert_eq!(q.velocity_violations, 0);
}

#[test]
fn force_mode_tracks_reference_against_spring() {
    let cm = module(unit_params());
    cm.set_force_range(0.0, 10.0).unwrap();
    cm.set_force_gains(0.1, 0.1, 0.01).unwrap();
    cm.set_force_filter_mode(FilterMode::Lowpass);
    cm.set_control_mode(ControlMode::Force);
    cm.set_control_value(0.5);
    cm.enable();

    let mut io = MockIo::default();
    let mut spool = SimulatedSpool::new(0.0001, 1.0, 0.1);
    run_closed_loop(&cm, &mut spool, &mut io, 0, 4000);

    let q = cm.query(false);
    assert!(
        (q.force_filtered - 5.0).abs() < 0.05,
        "force at {} N",
        q.force_filtered
    );
    assert!((q.reference - 5.0).abs() < 1e-12);
}

#[test]
fn hybrid_mode_tracks_reference_against_spring() {
    let cm = module(unit_params());
    cm.set_force_range(0.0, 10.0).unwrap();
    // Damping now acts on spool velocity: 0.001 Nm·s/deg.
    cm.set_force_gains(0.1, 0.1, 0.001).unwrap();
    cm.set_control_mode(ControlMode::ForceHybrid);
    cm.set_control_value(0.3);
    cm.enable();

    let mut io = MockIo::default();
    let mut spool = SimulatedSpool::new(0.0001, 1.0, 0.1);
    run_closed_loop(&cm, &mut spool, &mut io, 0, 4000);

    let q = cm.query(false);
    assert!(
        (q.force_filtered - 3.0).abs() < 0.05,
        "force at {} N",
        q.force_filtered
    );
}

#[test]
fn torque_mode_scales_control_value() {
    let mut params = unit_params();
    params.torque_max = 2.0;
    params.kt = 0.5;
    params.command_gain = 2.0;
    let cm = module(params);
    cm.set_control_mode(ControlMode::Torque);
    cm.set_control_value(-0.25);
    cm.enable();

    let mut io = MockIo::default();
    cm.update(0.0, &mut io).unwrap();

    let q = cm.query(false);
    assert!((q.torque + 0.5).abs() < 1e-12);
    // volts = τ / (kt · command_gain)
    assert!((io.ao[0] + 0.5).abs() < 1e-12);
    assert!(io.dout[0]);
}

#[test]
fn torque_mode_clamps_control_value() {
    let cm = module(unit_params());
    cm.set_torque_max(2.0).unwrap();
    cm.set_control_mode(ControlMode::Torque);
    cm.set_control_value(3.0);
    cm.enable();

    let mut io = MockIo::default();
    cm.update(0.0, &mut io).unwrap();

    let q = cm.query(false);
    assert_eq!(q.ctrl_value, 3.0);
    assert_eq!(q.ctrl_value_filtered, 1.0);
    assert!((q.torque - 2.0).abs() < 1e-12);
}

#[test]
fn command_voltage_saturates() {
    let mut params = unit_params();
    params.command_max = 1.5;
    let cm = module(params);
    cm.set_control_mode(ControlMode::Torque);
    cm.set_control_value(0.1); // 5 Nm at 1 V/Nm
    cm.enable();

    let mut io = MockIo::default();
    cm.update(0.0, &mut io).unwrap();
    assert_eq!(io.ao[0], 1.5);
}

#[test]
fn disabled_device_writes_safe_outputs_but_stays_live() {
    let cm = module(unit_params());
    cm.set_control_mode(ControlMode::Position);
    cm.set_control_value(1.0);

    let mut io = MockIo::default();
    io.ao[0] = 3.0;
    io.dout[0] = true;
    io.counts[0] = 1234;
    cm.update(0.0, &mut io).unwrap();

    assert_eq!(io.ao[0], 0.0);
    assert!(!io.dout[0]);
    let q = cm.query(false);
    assert!(!q.enabled);
    assert!((q.spool_position - 12.34).abs() < 1e-12);
    assert!(q.law_torque > 0.0);
    assert_eq!(q.torque, 0.0);
}

#[test]
fn control_value_smoothing_ramps_reference() {
    let cm = module(unit_params());
    cm.set_control_mode(ControlMode::Position);
    cm.set_ctrl_value_filter(true, 1.0).unwrap();

    let mut io = MockIo::default();
    cm.set_control_value(0.0);
    cm.update(0.0, &mut io).unwrap();
    cm.set_control_value(1.0);
    cm.update(0.001, &mut io).unwrap();

    let q = cm.query(false);
    assert!(q.ctrl_value_filtered > 0.0 && q.ctrl_value_filtered < 0.05);

    for i in 2..5000 {
        cm.update(i as f64 * 0.001, &mut io).unwrap();
    }
    assert!((cm.query(false).ctrl_value_filtered - 1.0).abs() < 1e-6);
}

#[test]
fn zero_position_rebases_encoder() {
    let cm = module(unit_params());
    let mut io = MockIo::default();
    io.counts[0] = 500;
    cm.update(0.0, &mut io).unwrap();
    assert!((cm.query(false).spool_position - 5.0).abs() < 1e-12);

    cm.zero_position();
    let q = cm.query(true);
    assert_eq!(q.encoder_counts, 0);
    assert_eq!(q.spool_position, 0.0);

    io.counts[0] = 600;
    cm.update(0.001, &mut io).unwrap();
    assert!((cm.query(false).spool_position - 1.0).abs() < 1e-12);
}

#[test]
fn zero_force_rebiases_and_clears_integrator() {
    let cm = module(unit_params());
    cm.set_force_gains(0.0, 1.0, 0.0).unwrap();
    cm.set_control_mode(ControlMode::Force);
    cm.set_control_value(0.5);

    let mut io = MockIo::default();
    io.ai[0] = 2.0;
    for i in 0..100 {
        cm.update(i as f64 * 0.001, &mut io).unwrap();
    }
    let before = cm.query(false);
    assert!((before.force - 2.0).abs() < 1e-12);
    assert!(before.force_integral != 0.0);

    cm.zero_force();
    let q = cm.query(true);
    assert_eq!(q.force, 0.0);
    assert_eq!(q.force_integral, 0.0);

    cm.update(0.1, &mut io).unwrap();
    let q = cm.query(false);
    assert!(q.force.abs() < 1e-12);
    assert!(q.force_filtered.abs() < 1e-9);
    assert_eq!(q.dforce, 0.0);
}

#[test]
fn analog_force_scale_is_applied() {
    use capstan_control::device::{CapstanModule, IoBinding};

    let binding = IoBinding::analog(0, 0, 0, 0, 2).with_force_scale(10.0, -1.0);
    let cm = CapstanModule::new("cell", binding, unit_params()).unwrap();
    cm.set_force_filter_mode(FilterMode::None);

    let mut io = MockIo::default();
    io.ai[2] = 0.5;
    cm.update(0.0, &mut io).unwrap();
    let q = cm.query(false);
    assert!((q.force - 4.0).abs() < 1e-12);
    assert!((q.force_filtered - 4.0).abs() < 1e-12);
}

#[test]
fn sensor_force_source_reads_selected_component() {
    use capstan_common::sensor::FtComponent;
    use capstan_control::device::{CapstanModule, ForceSource, IoBinding};
    use capstan_control::sensor::CalibratedFtSensor;

    let binding = IoBinding {
        enable: 0,
        fault: 0,
        command: 0,
        encoder: 0,
        force: ForceSource::Sensor {
            sensor: Box::new(CalibratedFtSensor::identity([0, 1, 2, 3, 0, 1])),
            component: FtComponent::Fz,
        },
    };
    let cm = CapstanModule::new("ft", binding, unit_params()).unwrap();
    cm.set_force_filter_mode(FilterMode::None);

    let mut io = MockIo::default();
    io.ai = [0.1, 0.2, 7.5, 0.4];
    cm.update(0.0, &mut io).unwrap();
    assert!((cm.query(false).force - 7.5).abs() < 1e-12);

    cm.zero_force();
    cm.update(0.001, &mut io).unwrap();
    assert!(cm.query(false).force.abs() < 1e-12);
}

#[test]
fn fault_input_is_reported() {
    let cm = module(unit_params());
    let mut io = MockIo::default();
    cm.update(0.0, &mut io).unwrap();
    assert!(!cm.query(false).fault);

    io.di[0] = true;
    cm.update(0.001, &mut io).unwrap();
    assert!(cm.query(false).fault);
}
