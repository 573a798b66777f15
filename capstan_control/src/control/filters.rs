//! Signal conditioning filters.
//!
//! 2nd-order Butterworth low-pass (biquad), 1st-order low-pass, and a
//! moving median. Every filter primes itself on its first sample so the
//! output starts at the input instead of ramping up from zero.
//!
//! [`ForceFilterChain`] runs all stages on every sample and selects one
//! output by [`FilterMode`], so switching modes never produces a step from
//! a stale stage.

use core::f64::consts::{PI, SQRT_2};

use capstan_common::consts::{MEDIAN_WINDOW_MAX, NYQUIST_MARGIN};
use capstan_common::device::params::FilterMode;
use heapless::{Deque, Vec};

// ─── Butterworth Low-Pass (2nd-order biquad) ────────────────────────

/// Biquad coefficients.
///
/// ```text
/// H(z) = (b0 + b1·z⁻¹ + b2·z⁻²) / (1 + a1·z⁻¹ + a2·z⁻²)
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    /// Identity filter.
    pub const PASSTHROUGH: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };
}

/// Compute 2nd-order Butterworth low-pass coefficients (bilinear transform
/// with frequency prewarping).
///
/// The cutoff is clamped to `NYQUIST_MARGIN · sample_rate`. Returns `None`
/// if `cutoff <= 0.0` or `sample_rate <= 0.0`.
pub fn butterworth_coefficients(cutoff: f64, sample_rate: f64) -> Option<BiquadCoeffs> {
    if cutoff <= 0.0 || sample_rate <= 0.0 {
        return None;
    }

    let fc = cutoff.min(NYQUIST_MARGIN * sample_rate);
    let k = (PI * fc / sample_rate).tan();
    let k2 = k * k;
    let norm = 1.0 / (1.0 + SQRT_2 * k + k2);
    let b0 = k2 * norm;

    Some(BiquadCoeffs {
        b0,
        b1: 2.0 * b0,
        b2: b0,
        a1: 2.0 * (k2 - 1.0) * norm,
        a2: (1.0 - SQRT_2 * k + k2) * norm,
    })
}

/// Internal state of a biquad (Direct Form I).
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
    primed: bool,
}

impl BiquadState {
    /// Forget history; the next sample primes the filter again.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Apply one sample through the biquad.
///
/// The first sample after a reset loads the delay line with the input,
/// which is the steady state of a unity-DC-gain low-pass.
#[inline]
pub fn biquad_apply(state: &mut BiquadState, coeffs: &BiquadCoeffs, input: f64) -> f64 {
    if !state.primed {
        *state = BiquadState {
            x1: input,
            x2: input,
            y1: input,
            y2: input,
            primed: true,
        };
    }

    let output = coeffs.b0 * input + coeffs.b1 * state.x1 + coeffs.b2 * state.x2
        - coeffs.a1 * state.y1
        - coeffs.a2 * state.y2;

    state.x2 = state.x1;
    state.x1 = input;
    state.y2 = state.y1;
    state.y1 = output;

    output
}

// ─── Low-Pass Filter (1st-order) ────────────────────────────────────

/// Internal state of the 1st-order low-pass filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowPassState {
    prev_output: f64,
    primed: bool,
}

impl LowPassState {
    /// Forget history; the next sample primes the filter again.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Force the filter output to `value`.
    #[inline]
    pub fn prime(&mut self, value: f64) {
        self.prev_output = value;
        self.primed = true;
    }
}

/// Apply one sample through the 1st-order low-pass filter.
///
/// ```text
/// alpha = 2π·flp·dt / (1 + 2π·flp·dt)
/// y[n] = y[n-1] + alpha × (x[n] - y[n-1])
/// ```
///
/// Returns `input` unchanged when `flp <= 0.0` (disabled).
#[inline]
pub fn lowpass_apply(state: &mut LowPassState, flp: f64, input: f64, dt: f64) -> f64 {
    if !state.primed || flp <= 0.0 || dt <= 0.0 {
        state.prime(input);
        return input;
    }

    let omega = 2.0 * PI * flp * dt;
    let alpha = omega / (1.0 + omega);
    let output = state.prev_output + alpha * (input - state.prev_output);
    state.prev_output = output;
    output
}

// ─── Moving Median ──────────────────────────────────────────────────

/// Moving median over the last `window` samples.
#[derive(Debug, Clone)]
pub struct MedianFilter {
    samples: Deque<f64, MEDIAN_WINDOW_MAX>,
    window: usize,
}

impl MedianFilter {
    /// Create a filter; `window` is clamped to `1..=MEDIAN_WINDOW_MAX`.
    pub fn new(window: usize) -> Self {
        Self {
            samples: Deque::new(),
            window: window.clamp(1, MEDIAN_WINDOW_MAX),
        }
    }

    /// Current window length.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Change the window length, keeping the newest samples.
    pub fn set_window(&mut self, window: usize) {
        self.window = window.clamp(1, MEDIAN_WINDOW_MAX);
        while self.samples.len() > self.window {
            self.samples.pop_front();
        }
    }

    /// Forget history; the next sample primes the window again.
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Push one sample and return the median of the window.
    pub fn apply(&mut self, input: f64) -> f64 {
        if self.samples.is_empty() {
            for _ in 1..self.window {
                let _ = self.samples.push_back(input);
            }
        }
        while self.samples.len() >= self.window {
            self.samples.pop_front();
        }
        let _ = self.samples.push_back(input);

        let mut sorted: Vec<f64, MEDIAN_WINDOW_MAX> = Vec::new();
        for &sample in self.samples.iter() {
            let _ = sorted.push(sample);
        }
        sorted.sort_unstable_by(f64::total_cmp);
        sorted[sorted.len() / 2]
    }
}

// ─── Force filter chain ─────────────────────────────────────────────

/// Butterworth, median and cascade stages fed with the same signal.
#[derive(Debug, Clone)]
pub struct ForceFilterChain {
    coeffs: BiquadCoeffs,
    butterworth: BiquadState,
    median: MedianFilter,
    cascade: MedianFilter,
    cutoff: f64,
    sample_rate: f64,
}

impl ForceFilterChain {
    /// Create a chain for `cutoff` [Hz] and `window` samples at `sample_rate` [Hz].
    pub fn new(cutoff: f64, window: usize, sample_rate: f64) -> Self {
        Self {
            coeffs: butterworth_coefficients(cutoff, sample_rate)
                .unwrap_or(BiquadCoeffs::PASSTHROUGH),
            butterworth: BiquadState::default(),
            median: MedianFilter::new(window),
            cascade: MedianFilter::new(window),
            cutoff,
            sample_rate,
        }
    }

    /// Apply new settings, keeping filter state. No-op when unchanged.
    pub fn configure(&mut self, cutoff: f64, window: usize, sample_rate: f64) {
        if cutoff != self.cutoff || sample_rate != self.sample_rate {
            self.coeffs = butterworth_coefficients(cutoff, sample_rate)
                .unwrap_or(BiquadCoeffs::PASSTHROUGH);
            self.cutoff = cutoff;
            self.sample_rate = sample_rate;
        }
        if window != self.median.window() {
            self.median.set_window(window);
            self.cascade.set_window(window);
        }
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        self.butterworth.reset();
        self.median.reset();
        self.cascade.reset();
    }

    /// Advance every stage with `input` and return the one selected by `mode`.
    pub fn apply(&mut self, input: f64, mode: FilterMode) -> f64 {
        let lowpassed = biquad_apply(&mut self.butterworth, &self.coeffs, input);
        let median = self.median.apply(input);
        let cascade = self.cascade.apply(lowpassed);

        match mode {
            FilterMode::None => input,
            FilterMode::Lowpass => lowpassed,
            FilterMode::Median => median,
            FilterMode::Cascade => cascade,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
