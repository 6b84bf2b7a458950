//! Phase wrapping to the principal range

use std::f32::consts::{PI, TAU};

/// Wrap a phase in radians to `[-π, π)`
#[inline]
pub fn princarg(phase: f32) -> f32 {
    phase - TAU * ((phase + PI) / TAU).floor()
}

/// Wrapped difference `a - b`
#[inline]
pub fn phase_diff(a: f32, b: f32) -> f32 {
    princarg(a - b)
}

/// Wrap every phase in place
pub fn princarg_slice(phases: &mut [f32]) {
    for phase in phases.iter_mut() {
        *phase = princarg(*phase);
    }
}
