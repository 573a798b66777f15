//! System-wide constants for the Capstan workspace.
//!
//! Single source of truth for numeric limits shared between crates.

use static_assertions::const_assert;

/// Default hub sample rate [Hz].
pub const DEFAULT_SAMPLE_RATE: f64 = 1000.0;

/// Lowest accepted hub sample rate [Hz].
pub const MIN_SAMPLE_RATE: f64 = 1.0;

/// Highest accepted hub sample rate [Hz].
pub const MAX_SAMPLE_RATE: f64 = 20_000.0;

/// Number of `Query` snapshots retained per device.
pub const HISTORY_LEN: usize = 128;

/// Largest median filter window [samples].
pub const MEDIAN_WINDOW_MAX: usize = 51;

/// Butterworth cutoffs are clamped below this fraction of the sample rate.
pub const NYQUIST_MARGIN: f64 = 0.45;

/// Safety warnings beyond this count are only logged every
/// [`LIMIT_LOG_EVERY`] occurrences.
pub const LIMIT_LOG_FIRST: u64 = 10;

/// Log interval for repeated safety warnings.
pub const LIMIT_LOG_EVERY: u64 = 1000;

const_assert!(MEDIAN_WINDOW_MAX % 2 == 1);
const_assert!(HISTORY_LEN.is_power_of_two());
