//! Parameter export and import through TOML.

use capstan_common::config::ConfigError;
use capstan_common::device::params::{FilterMode, Params};
use tempfile::TempDir;

use super::common::{module, unit_params};

#[test]
fn export_mutate_import_restores_params() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cm0.toml");
    let cm = module(unit_params());
    cm.set_force_gains(0.2, 0.05, 0.003).unwrap();
    cm.set_force_filter_mode(FilterMode::Median);
    let exported = cm.params();
    cm.export_params(&path).unwrap();

    cm.set_force_gains(1.0, 1.0, 1.0).unwrap();
    cm.set_position_range(-10.0, 10.0).unwrap();
    cm.set_force_filter_mode(FilterMode::None);
    assert_ne!(cm.params(), exported);

    cm.import_params(&path).unwrap();
    assert_eq!(cm.params(), exported);
}

#[test]
fn string_round_trip() {
    let cm = module(unit_params());
    cm.set_velocity_max(123.0).unwrap();
    let doc = cm.export_params_string().unwrap();

    let other = module(Params::default());
    other.import_params_str(&doc).unwrap();
    assert_eq!(other.params(), cm.params());
}

#[test]
fn failed_import_leaves_params_unchanged() {
    let dir = TempDir::new().unwrap();
    let cm = module(unit_params());
    let before = cm.params();

    let missing = cm.import_params(&dir.path().join("absent.toml"));
    assert_eq!(missing, Err(ConfigError::FileNotFound));

    let garbage = cm.import_params_str("kt = [1, 2");
    assert!(matches!(garbage, Err(ConfigError::ParseError(_))));

    let invalid = cm.import_params_str("torque_max = -1.0");
    assert!(matches!(invalid, Err(ConfigError::ValidationError(_))));

    assert_eq!(cm.params(), before);
}

#[test]
fn export_to_unwritable_path_fails() {
    let cm = module(unit_params());
    let result = cm.export_params(std::path::Path::new("/nonexistent/dir/cm.toml"));
    assert!(matches!(result, Err(ConfigError::WriteError(_))));
}

#[test]
fn rejected_setter_keeps_params() {
    let cm = module(unit_params());
    let before = cm.params();
    assert!(cm.set_force_filter(50.0, 20.0, 6).is_err());
    assert!(cm.set_torque_max(0.0).is_err());
    assert!(cm.set_params(Params {
        gear_ratio: 0.0,
        ..before
    })
    .is_err());
    assert_eq!(cm.params(), before);
}
