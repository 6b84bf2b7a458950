//! Simplified HRIR generator
//!
//! Spherical-head model with two cues only: a first-order shelving filter for
//! the level difference and an integer delay for the time difference. Good
//! enough to build crosstalk cancellation filters, not a substitute for a
//! measured HRTF set.

use std::f32::consts::PI;

use sfx_core::sample_rate_or_default;

// ============ Constants ============

/// Angle at which head shadowing is strongest (degrees)
const THETA_0: f32 = 150.0;

/// Minimum shelving gain at the shadowed ear
const ALPHA_MIN: f32 = 0.05;

/// Speed of sound (m/s)
const SPEED_OF_SOUND: f32 = 334.0;

/// Head radius (m)
const HEAD_RADIUS: f32 = 0.08;

/// Impulse response duration (seconds)
const HRIR_DURATION: f32 = 0.003;

// ============ Generator ============

/// HRIR generator producing at most `MAX_LENGTH` taps
#[derive(Debug, Clone)]
pub struct SimpleHrir<const MAX_LENGTH: usize = 256> {
    sample_rate: f32,
    length: usize,
    /// Shelving filter coefficients from the last `generate` call
    b0: f32,
    b1: f32,
    a1: f32,
}

impl<const MAX_LENGTH: usize> SimpleHrir<MAX_LENGTH> {
    const LENGTH_OK: () = assert!(MAX_LENGTH >= 1, "HRIR length must be at least 1");

    pub fn new(sample_rate: f32) -> Self {
        let () = Self::LENGTH_OK;

        let mut hrir = Self {
            sample_rate: 0.0,
            length: 1,
            b0: 1.0,
            b1: 0.0,
            a1: 0.0,
        };
        hrir.set_sample_rate(sample_rate);
        hrir
    }

    /// Set sample rate and recompute the response length (3 ms, capped)
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate_or_default(sample_rate);
        self.length = ((HRIR_DURATION * self.sample_rate) as usize).clamp(1, MAX_LENGTH);
    }

    /// Write the response for `azimuth_deg` into `output[..length]`
    ///
    /// 0° is straight ahead, positive angles to the right. Samples past
    /// `length()` are left untouched.
    pub fn generate(&mut self, azimuth_deg: f32, output: &mut [f32]) {
        debug_assert!(output.len() >= self.length);
        let length = self.length.min(output.len());
        let output = &mut output[..length];
        output.fill(0.0);
        if length == 0 {
            return;
        }

        let w0 = SPEED_OF_SOUND / HEAD_RADIUS;
        let w0_fs = w0 / self.sample_rate;

        // Level difference: first-order shelf
        let alpha = 1.0
            + ALPHA_MIN / 2.0
            + (1.0 - ALPHA_MIN / 2.0) * ((azimuth_deg + 90.0) / THETA_0 * PI).cos();
        let denom = 1.0 + w0_fs;
        self.b0 = (alpha + w0_fs) / denom;
        self.b1 = (-alpha + w0_fs) / denom;
        self.a1 = -(1.0 - w0_fs) / denom;

        // Time difference
        let delay = if azimuth_deg.abs() < 90.0 {
            -(self.sample_rate / w0) * (azimuth_deg.to_radians().cos() - 1.0)
        } else {
            self.sample_rate / w0 * ((azimuth_deg.abs() - 90.0).to_radians() + 1.0)
        };
        let delay = (delay.round().max(0.0) as usize).min(length - 1);

        // Impulse response of the shelf, shifted by the delay
        let mut x_prev = 0.0;
        let mut y_prev = 0.0;
        for (i, out) in output[delay..].iter_mut().enumerate() {
            let x = if i == 0 { 1.0 } else { 0.0 };
            let y = self.b0 * x + self.b1 * x_prev - self.a1 * y_prev;
            *out = y;
            x_prev = x;
            y_prev = y;
        }
    }

    /// Number of taps written by `generate`
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Shelf coefficients `(b0, b1, a1)` from the last `generate` call
    pub fn coefficients(&self) -> (f32, f32, f32) {
        (self.b0, self.b1, self.a1)
    }
}

impl Default for SimpleHrir {
    fn default() -> Self {
        Self::new(sfx_core::DEFAULT_SAMPLE_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn first_nonzero(ir: &[f32]) -> usize {
        ir.iter().position(|&x| x != 0.0).unwrap()
    }

    fn energy(ir: &[f32]) -> f32 {
        ir.iter().map(|x| x * x).sum()
    }

    #[test]
    fn test_length() {
        assert_eq!(SimpleHrir::<256>::new(48000.0).length(), 144);
        assert_eq!(SimpleHrir::<256>::new(44100.0).length(), 132);
        // Capped at MAX_LENGTH
        assert_eq!(SimpleHrir::<128>::new(96000.0).length(), 128);
    }

    #[test]
    fn test_invalid_sample_rate_falls_back() {
        let hrir = SimpleHrir::<256>::new(-1.0);
        assert_eq!(hrir.sample_rate(), 48000.0);
        assert_eq!(hrir.length(), 144);
    }

    #[test]
    fn test_front_has_no_delay() {
        let mut hrir = SimpleHrir::<256>::new(48000.0);
        let mut ir = [0.0; 256];
        hrir.generate(0.0, &mut ir);

        let (b0, _, _) = hrir.coefficients();
        assert_eq!(first_nonzero(&ir), 0);
        assert_abs_diff_eq!(ir[0], b0);
    }

    #[test]
    fn test_delay_grows_with_angle() {
        let mut hrir = SimpleHrir::<256>::new(48000.0);
        let mut ir = [0.0; 256];

        hrir.generate(60.0, &mut ir);
        // fs / w0 = 11.497, delay = round(11.497 * 0.5)
        assert_eq!(first_nonzero(&ir), 6);

        hrir.generate(90.0, &mut ir);
        assert_eq!(first_nonzero(&ir), 11);

        hrir.generate(180.0, &mut ir);
        // round(11.497 * (π/2 + 1)) = 30
        assert_eq!(first_nonzero(&ir), 30);
    }

    #[test]
    fn test_shadowed_side_is_quieter() {
        let mut hrir = SimpleHrir::<256>::new(48000.0);
        let mut near = [0.0; 256];
        let mut far = [0.0; 256];
        hrir.generate(-90.0, &mut near);
        hrir.generate(90.0, &mut far);

        assert!(energy(&near) > energy(&far));
    }

    #[test]
    fn test_tail_untouched() {
        let mut hrir = SimpleHrir::<256>::new(48000.0);
        let mut ir = [7.0; 256];
        hrir.generate(30.0, &mut ir);
        assert!(ir[144..].iter().all(|&x| x == 7.0));
        assert!(ir[..144].iter().all(|x| x.is_finite()));
    }
}
