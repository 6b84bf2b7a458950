//! Window functions
//!
//! Fill functions write into a caller buffer so they can be used without
//! allocating. [`WindowType::generate`] is the allocating convenience for
//! constructors.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

/// Default Kaiser shape parameter
pub const DEFAULT_KAISER_BETA: f32 = 8.0;

/// Window shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    Hann,
    Hamming,
    Blackman,
    BlackmanHarris,
    Triangular,
    Rectangular,
    Kaiser { beta: f32 },
}

impl Default for WindowType {
    fn default() -> Self {
        Self::Hann
    }
}

impl WindowType {
    /// Allocate and fill a window of `size` samples
    pub fn generate(self, size: usize) -> Vec<f32> {
        let mut window = vec![0.0; size];
        fill(self, &mut window);
        window
    }
}

/// Fill `buffer` with the given window shape
pub fn fill(window_type: WindowType, buffer: &mut [f32]) {
    match window_type {
        WindowType::Hann => hann(buffer),
        WindowType::Hamming => hamming(buffer),
        WindowType::Blackman => blackman(buffer),
        WindowType::BlackmanHarris => blackman_harris(buffer),
        WindowType::Triangular => triangular(buffer),
        WindowType::Rectangular => rectangular(buffer),
        WindowType::Kaiser { beta } => kaiser(buffer, beta),
    }
}

// ============ Shapes ============

/// Periodic Hann: `0.5 * (1 - cos(2πn/N))`
///
/// Periodic rather than symmetric, so shifted copies overlap-add to a constant.
pub fn hann(buffer: &mut [f32]) {
    let scale = TAU / buffer.len() as f32;
    for (i, w) in buffer.iter_mut().enumerate() {
        *w = 0.5 * (1.0 - (scale * i as f32).cos());
    }
}

/// `0.54 - 0.46 * cos(2πn/(N-1))`
pub fn hamming(buffer: &mut [f32]) {
    cosine_sum(buffer, &[0.54, 0.46]);
}

/// 3-term Blackman
pub fn blackman(buffer: &mut [f32]) {
    cosine_sum(buffer, &[0.42, 0.5, 0.08]);
}

/// 4-term Blackman-Harris (-92 dB sidelobes)
pub fn blackman_harris(buffer: &mut [f32]) {
    cosine_sum(buffer, &[0.35875, 0.48829, 0.14128, 0.01168]);
}

/// Bartlett: `1 - |2n/(N-1) - 1|`
pub fn triangular(buffer: &mut [f32]) {
    let Some(denom) = symmetric_denominator(buffer) else {
        return;
    };
    for (i, w) in buffer.iter_mut().enumerate() {
        *w = 1.0 - (2.0 * i as f32 / denom - 1.0).abs();
    }
}

pub fn rectangular(buffer: &mut [f32]) {
    buffer.fill(1.0);
}

/// Kaiser window with shape parameter `beta`
pub fn kaiser(buffer: &mut [f32], beta: f32) {
    let Some(denom) = symmetric_denominator(buffer) else {
        return;
    };
    let i0_beta = bessel_i0(beta);
    for (i, w) in buffer.iter_mut().enumerate() {
        let ratio = 2.0 * i as f32 / denom - 1.0;
        let arg = beta * (1.0 - ratio * ratio).max(0.0).sqrt();
        *w = bessel_i0(arg) / i0_beta;
    }
}

/// Symmetric generalized cosine window with alternating-sign terms
fn cosine_sum(buffer: &mut [f32], coeffs: &[f32]) {
    let Some(denom) = symmetric_denominator(buffer) else {
        return;
    };
    for (i, w) in buffer.iter_mut().enumerate() {
        let phase = TAU * i as f32 / denom;
        let mut value = 0.0;
        let mut sign = 1.0;
        for (k, &a) in coeffs.iter().enumerate() {
            value += sign * a * (k as f32 * phase).cos();
            sign = -sign;
        }
        *w = value;
    }
}

/// `N - 1`, or `None` after handling the degenerate lengths 0 and 1
fn symmetric_denominator(buffer: &mut [f32]) -> Option<f32> {
    match buffer.len() {
        0 => None,
        1 => {
            buffer[0] = 1.0;
            None
        }
        n => Some((n - 1) as f32),
    }
}

// ============ Utilities ============

/// Multiply `signal` by `window` in place
#[inline]
pub fn apply(signal: &mut [f32], window: &[f32]) {
    debug_assert_eq!(signal.len(), window.len());
    for (s, &w) in signal.iter_mut().zip(window) {
        *s *= w;
    }
}

pub fn sum(window: &[f32]) -> f32 {
    window.iter().sum()
}

/// Sum of squares, the overlap-add gain of a window used twice
pub fn sum_squared(window: &[f32]) -> f32 {
    window.iter().map(|w| w * w).sum()
}

/// Modified Bessel function of the first kind, order 0
///
/// Power series, stopped once a term drops below 1e-10 or after 20 terms.
pub fn bessel_i0(x: f32) -> f32 {
    let half_sq = (x / 2.0) * (x / 2.0);
    let mut sum = 1.0;
    let mut term = 1.0;
    for k in 1..=20 {
        term *= half_sq / (k * k) as f32;
        sum += term;
        if term < 1e-10 {
            break;
        }
    }
    sum
}
