mod common;

mod control_accuracy;
mod custom_controller;
mod history;
mod mode_switch;
mod params_roundtrip;
mod safety_limits;
mod scaling;
