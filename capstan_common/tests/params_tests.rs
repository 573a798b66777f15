//! Params persistence and reference scaling tests.
//!
//! TOML round trip through a file, rejection of invalid documents, and the
//! scale/unscale inverse property for every control mode.

use capstan_common::config::{ConfigError, ConfigLoader, ConfigSaver};
use capstan_common::device::params::{ControlMode, FilterMode, Params};
use proptest::prelude::*;
use tempfile::TempDir;

fn tuned_params() -> Params {
    let mut p = Params::default();
    p.set_position_range(-45.0, 270.0).unwrap();
    p.set_force_range(0.5, 25.0).unwrap();
    p.set_force_gains(0.02, 0.4, 0.001).unwrap();
    p.set_feedforward(0.01).unwrap();
    p.set_force_filter(80.0, 15.0, 9).unwrap();
    p.filter_mode = FilterMode::Cascade;
    p.set_ctrl_value_filter(true, 3.0).unwrap();
    p
}

#[test]
fn params_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cm.toml");
    let original = tuned_params();
    original.save(&path).unwrap();

    let loaded = Params::load(&path).unwrap();
    assert_eq!(loaded, original);
    assert!(loaded.validate().is_ok());
}

#[test]
fn params_string_is_human_readable() {
    let doc = tuned_params().to_toml_string().unwrap();
    assert!(doc.contains("filter_mode = \"cascade\""));
    assert!(doc.contains("median_window = 9"));
}

#[test]
fn malformed_document_is_parse_error() {
    let result = Params::from_toml_str("kt = \"fast\"");
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn semantically_invalid_document_fails_validation() {
    let p = Params::from_toml_str("position_min = 10.0\nposition_max = 0.0\n").unwrap();
    assert!(matches!(p.validate(), Err(ConfigError::ValidationError(_))));
}

const MODES: [ControlMode; 5] = [
    ControlMode::Torque,
    ControlMode::Position,
    ControlMode::Force,
    ControlMode::ForceHybrid,
    ControlMode::Custom,
];

proptest! {
    #[test]
    fn scaling_round_trips(
        reference in -1000.0f64..1000.0,
        mode_index in 0usize..5,
        lo in -500.0f64..500.0,
        span in 0.1f64..500.0,
    ) {
        let mut p = Params::default();
        p.set_position_range(lo, lo + span).unwrap();
        p.set_force_range(lo, lo + span).unwrap();
        let mode = MODES[mode_index];

        let cv = p.ref_to_ctrl_value(reference, mode);
        let back = p.ctrl_value_to_ref(cv, mode);
        prop_assert!((back - reference).abs() <= 1e-9 * (1.0 + reference.abs()));
    }
}
