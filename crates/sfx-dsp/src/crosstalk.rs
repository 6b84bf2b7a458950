//! Crosstalk Canceller
//!
//! Loudspeaker binaural playback: each speaker also reaches the opposite ear,
//! so the stereo feed is pre-filtered by a regularized inverse of the 2x2
//! acoustic transfer matrix
//!
//! ```text
//! C(ω) = | C11  C12 |      H(ω) = (Cᴴ C + βI)⁻¹ Cᴴ
//!        | C21  C22 |
//! ```
//!
//! with `C` built from [`SimpleHrir`] responses at ±half the speaker angle.
//! Filtering is block overlap-add with one block of latency.

use num_complex::Complex32;
use sfx_core::{CrosstalkParams, Sample, sample_rate_or_default};

use crate::fft::FftHandler;
use crate::hrir::SimpleHrir;
use crate::{Processor, ProcessorConfig, StereoProcessor};

// ============ Constants ============

/// Default loudspeaker angle (degrees)
pub const DEFAULT_SPEAKER_ANGLE: f32 = 10.0;

/// Default Tikhonov regularization
pub const DEFAULT_REGULARIZATION: f32 = 1e-5;

/// Floor for `|det|²` in the per-bin inversion
const DET_FLOOR: f32 = 1e-10;

pub type CrosstalkCanceller128 = CrosstalkCanceller<128, 256>;
pub type CrosstalkCanceller256 = CrosstalkCanceller<256, 512>;

// ============ Canceller ============

/// Stereo crosstalk canceller with `HRIR_LENGTH`-sample blocks
pub struct CrosstalkCanceller<const HRIR_LENGTH: usize = 256, const FFT_SIZE: usize = 512> {
    sample_rate: f32,
    speaker_angle: f32,
    regularization: f32,

    fft: FftHandler<FFT_SIZE>,
    hrir: SimpleHrir<HRIR_LENGTH>,

    /// Inverse filter matrix per bin
    h11: Vec<Complex32>,
    h12: Vec<Complex32>,
    h21: Vec<Complex32>,
    h22: Vec<Complex32>,

    left_in: Vec<f32>,
    right_in: Vec<f32>,
    left_out: Vec<f32>,
    right_out: Vec<f32>,
    left_overlap: Vec<f32>,
    right_overlap: Vec<f32>,
    pos: usize,

    /// Scratch (time domain, then HRIR staging)
    padded: Vec<f32>,
    left_spectrum: Vec<Complex32>,
    right_spectrum: Vec<Complex32>,
}

impl<const HRIR_LENGTH: usize, const FFT_SIZE: usize> CrosstalkCanceller<HRIR_LENGTH, FFT_SIZE> {
    const SIZE_OK: () = assert!(
        HRIR_LENGTH >= 1 && FFT_SIZE == 2 * HRIR_LENGTH,
        "FFT size must be twice the HRIR length"
    );

    pub fn new(sample_rate: f32) -> Self {
        let () = Self::SIZE_OK;
        let sample_rate = sample_rate_or_default(sample_rate);
        let zero = Complex32::new(0.0, 0.0);

        let mut canceller = Self {
            sample_rate,
            speaker_angle: DEFAULT_SPEAKER_ANGLE,
            regularization: DEFAULT_REGULARIZATION,
            fft: FftHandler::new(),
            hrir: SimpleHrir::new(sample_rate),
            h11: vec![zero; FFT_SIZE],
            h12: vec![zero; FFT_SIZE],
            h21: vec![zero; FFT_SIZE],
            h22: vec![zero; FFT_SIZE],
            left_in: vec![0.0; HRIR_LENGTH],
            right_in: vec![0.0; HRIR_LENGTH],
            left_out: vec![0.0; HRIR_LENGTH],
            right_out: vec![0.0; HRIR_LENGTH],
            left_overlap: vec![0.0; HRIR_LENGTH],
            right_overlap: vec![0.0; HRIR_LENGTH],
            pos: 0,
            padded: vec![0.0; FFT_SIZE],
            left_spectrum: vec![zero; FFT_SIZE],
            right_spectrum: vec![zero; FFT_SIZE],
        };
        canceller.compute_inverse_filters();
        canceller
    }

    /// Loudspeaker angle in degrees (total spread between the speakers)
    pub fn set_speaker_angle(&mut self, angle_deg: f32) {
        if !angle_deg.is_finite() {
            log::debug!("CrosstalkCanceller: ignoring non-finite speaker angle");
            return;
        }
        if angle_deg != self.speaker_angle {
            self.speaker_angle = angle_deg;
            self.compute_inverse_filters();
        }
    }

    pub fn speaker_angle(&self) -> f32 {
        self.speaker_angle
    }

    /// Regularization β, taken as given; the determinant floor keeps the
    /// inverse finite for any value
    pub fn set_regularization(&mut self, beta: f32) {
        if !beta.is_finite() {
            log::debug!("CrosstalkCanceller: ignoring non-finite regularization");
            return;
        }
        if beta != self.regularization {
            self.regularization = beta;
            self.compute_inverse_filters();
        }
    }

    pub fn regularization(&self) -> f32 {
        self.regularization
    }

    pub fn apply_params(&mut self, params: &CrosstalkParams) {
        self.set_speaker_angle(params.speaker_angle_deg);
        self.set_regularization(params.regularization);
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Per-bin inverse filters `[H11, H12, H21, H22]`
    pub fn filter_matrix(&self) -> [&[Complex32]; 4] {
        [&self.h11, &self.h12, &self.h21, &self.h22]
    }

    // ============ Filter Design ============

    fn compute_inverse_filters(&mut self) {
        let half_angle = self.speaker_angle / 2.0;

        // Ipsilateral path into the left spectrum, contralateral into the
        // right; the head is symmetric so C22 = C11 and C21 = C12
        self.padded.fill(0.0);
        self.hrir.generate(half_angle, &mut self.padded[..HRIR_LENGTH]);
        self.fft.forward_complex(&self.padded, &mut self.left_spectrum);

        self.padded.fill(0.0);
        self.hrir.generate(-half_angle, &mut self.padded[..HRIR_LENGTH]);
        self.fft.forward_complex(&self.padded, &mut self.right_spectrum);

        let beta = self.regularization;
        for k in 0..FFT_SIZE {
            let c11 = self.left_spectrum[k];
            let c12 = self.right_spectrum[k];
            let c21 = c12;
            let c22 = c11;

            // A = CᴴC + βI
            let a11 = c11.conj() * c11 + c21.conj() * c21 + beta;
            let a12 = c11.conj() * c12 + c21.conj() * c22;
            let a21 = c12.conj() * c11 + c22.conj() * c21;
            let a22 = c12.conj() * c12 + c22.conj() * c22 + beta;

            let det = a11 * a22 - a12 * a21;
            let inv_det = det.conj() / det.norm_sqr().max(DET_FLOOR);

            let i11 = a22 * inv_det;
            let i12 = -a12 * inv_det;
            let i21 = -a21 * inv_det;
            let i22 = a11 * inv_det;

            // H = A⁻¹Cᴴ
            self.h11[k] = i11 * c11.conj() + i12 * c12.conj();
            self.h12[k] = i11 * c21.conj() + i12 * c22.conj();
            self.h21[k] = i21 * c11.conj() + i22 * c12.conj();
            self.h22[k] = i21 * c21.conj() + i22 * c22.conj();
        }

        log::debug!(
            "CrosstalkCanceller: recomputed filters (angle {}°, β {})",
            self.speaker_angle,
            self.regularization
        );
    }

    // ============ Processing ============

    /// Process a stereo sample pair
    #[inline]
    pub fn process(&mut self, left: Sample, right: Sample) -> (Sample, Sample) {
        self.left_in[self.pos] = left;
        self.right_in[self.pos] = right;
        let out = (self.left_out[self.pos], self.right_out[self.pos]);
        self.pos += 1;

        if self.pos == HRIR_LENGTH {
            self.pos = 0;
            self.filter_block();
        }

        out
    }

    fn filter_block(&mut self) {
        self.padded[HRIR_LENGTH..].fill(0.0);

        self.padded[..HRIR_LENGTH].copy_from_slice(&self.left_in);
        self.fft.forward_complex(&self.padded, &mut self.left_spectrum);
        self.padded[..HRIR_LENGTH].copy_from_slice(&self.right_in);
        self.fft.forward_complex(&self.padded, &mut self.right_spectrum);

        for k in 0..FFT_SIZE {
            let l = self.left_spectrum[k];
            let r = self.right_spectrum[k];
            self.left_spectrum[k] = self.h11[k] * l + self.h12[k] * r;
            self.right_spectrum[k] = self.h21[k] * l + self.h22[k] * r;
        }

        self.fft.inverse_complex(&self.left_spectrum, &mut self.padded);
        overlap_add(&self.padded, &mut self.left_out, &mut self.left_overlap);

        self.fft.inverse_complex(&self.right_spectrum, &mut self.padded);
        overlap_add(&self.padded, &mut self.right_out, &mut self.right_overlap);
    }
}

/// Emit the head plus carried overlap, carry the tail
#[inline]
fn overlap_add(block: &[f32], output: &mut [f32], overlap: &mut [f32]) {
    let (head, tail) = block.split_at(output.len());
    for i in 0..output.len() {
        output[i] = head[i] + overlap[i];
        overlap[i] = tail[i];
    }
}

impl Default for CrosstalkCanceller {
    fn default() -> Self {
        Self::new(sfx_core::DEFAULT_SAMPLE_RATE)
    }
}

impl<const HRIR_LENGTH: usize, const FFT_SIZE: usize> Processor
    for CrosstalkCanceller<HRIR_LENGTH, FFT_SIZE>
{
    fn reset(&mut self) {
        self.left_in.fill(0.0);
        self.right_in.fill(0.0);
        self.left_out.fill(0.0);
        self.right_out.fill(0.0);
        self.left_overlap.fill(0.0);
        self.right_overlap.fill(0.0);
        self.pos = 0;
    }

    fn latency(&self) -> usize {
        HRIR_LENGTH
    }
}

impl<const HRIR_LENGTH: usize, const FFT_SIZE: usize> StereoProcessor
    for CrosstalkCanceller<HRIR_LENGTH, FFT_SIZE>
{
    #[inline]
    fn process_sample(&mut self, left: Sample, right: Sample) -> (Sample, Sample) {
        self.process(left, right)
    }
}

impl<const HRIR_LENGTH: usize, const FFT_SIZE: usize> ProcessorConfig
    for CrosstalkCanceller<HRIR_LENGTH, FFT_SIZE>
{
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate_or_default(sample_rate as f32);
        self.hrir.set_sample_rate(self.sample_rate);
        self.compute_inverse_filters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(len: usize) -> Vec<f32> {
        let mut state = 12345u32;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 8) as f32 / (1u32 << 24) as f32 - 0.5
            })
            .collect()
    }

    #[test]
    fn test_defaults() {
        let xtc = CrosstalkCanceller256::new(48000.0);
        assert_eq!(xtc.speaker_angle(), 10.0);
        assert_eq!(xtc.regularization(), 1e-5);
        assert_eq!(xtc.latency(), 256);
        assert!(xtc.filter_matrix().iter().all(|h| h.len() == 512));
    }

    #[test]
    fn test_zero_input_zero_output() {
        let mut xtc = CrosstalkCanceller128::new(48000.0);
        for _ in 0..1024 {
            let (l, r) = xtc.process(0.0, 0.0);
            assert!(l.abs() < 1e-4 && r.abs() < 1e-4);
        }
    }

    #[test]
    fn test_filters_finite_near_zero_angle() {
        let mut xtc = CrosstalkCanceller128::new(48000.0);
        for angle in [0.0, 0.01, 1.0, 10.0, 60.0, 170.0] {
            xtc.set_speaker_angle(angle);
            for h in xtc.filter_matrix() {
                assert!(h.iter().all(|c| c.re.is_finite() && c.im.is_finite()), "{angle}°");
            }
        }
    }

    #[test]
    fn test_output_finite_at_zero_angle() {
        let mut xtc = CrosstalkCanceller128::new(48000.0);
        xtc.set_speaker_angle(0.0);
        let left = noise(2048);
        let right = noise(4096);
        for (&l, &r) in left.iter().zip(&right[2048..]) {
            let (ol, or) = xtc.process(l, r);
            assert!(ol.is_finite() && or.is_finite());
        }
    }

    #[test]
    fn test_inverse_at_nyquist() {
        // At Nyquist the shelves differ strongly between ±30°, so C is well
        // conditioned and H·C is close to the identity
        let mut xtc = CrosstalkCanceller256::new(48000.0);
        xtc.set_speaker_angle(60.0);

        let mut hrir = SimpleHrir::<256>::new(48000.0);
        let mut fft = FftHandler::<512>::new();
        let mut ipsi = vec![0.0; 512];
        let mut contra = vec![0.0; 512];
        hrir.generate(30.0, &mut ipsi[..256]);
        hrir.generate(-30.0, &mut contra[..256]);
        let mut c_ipsi = vec![Complex32::new(0.0, 0.0); 512];
        let mut c_contra = vec![Complex32::new(0.0, 0.0); 512];
        fft.forward_complex(&ipsi, &mut c_ipsi);
        fft.forward_complex(&contra, &mut c_contra);

        let k = 256;
        let [h11, h12, h21, h22] = xtc.filter_matrix();
        let (c11, c12, c21, c22) = (c_ipsi[k], c_contra[k], c_contra[k], c_ipsi[k]);

        let p11 = h11[k] * c11 + h12[k] * c21;
        let p12 = h11[k] * c12 + h12[k] * c22;
        let p21 = h21[k] * c11 + h22[k] * c21;
        let p22 = h21[k] * c12 + h22[k] * c22;

        assert!((p11 - 1.0).norm() < 1e-3);
        assert!(p12.norm() < 1e-3);
        assert!(p21.norm() < 1e-3);
        assert!((p22 - 1.0).norm() < 1e-3);
    }

    #[test]
    fn test_one_block_latency() {
        let mut xtc = CrosstalkCanceller128::new(48000.0);
        let (l, r) = xtc.process(1.0, 0.0);
        assert_eq!((l, r), (0.0, 0.0));
        for _ in 1..128 {
            assert_eq!(xtc.process(0.0, 0.0), (0.0, 0.0));
        }

        let mut energy = 0.0;
        for _ in 0..256 {
            let (l, r) = xtc.process(0.0, 0.0);
            energy += l * l + r * r;
        }
        assert!(energy > 0.0);
    }

    #[test]
    fn test_setters_recompute() {
        let mut xtc = CrosstalkCanceller128::new(48000.0);
        let before = xtc.filter_matrix()[0].to_vec();

        xtc.set_speaker_angle(40.0);
        assert_ne!(before, xtc.filter_matrix()[0]);

        xtc.set_regularization(-1e-3);
        assert_eq!(xtc.regularization(), -1e-3);
        for filter in xtc.filter_matrix() {
            assert!(filter.iter().all(|h| h.re.is_finite() && h.im.is_finite()));
        }
        xtc.set_regularization(f32::NAN);
        assert_eq!(xtc.regularization(), -1e-3);

        xtc.apply_params(&CrosstalkParams::default());
        assert_eq!(xtc.speaker_angle(), 10.0);
        assert_eq!(xtc.regularization(), 1e-5);
    }

    #[test]
    fn test_stereo_block() {
        let mut a = CrosstalkCanceller128::new(48000.0);
        let mut b = CrosstalkCanceller128::new(48000.0);
        let mut left = noise(1024);
        let mut right = noise(2048)[1024..].to_vec();

        let expected: Vec<(f32, f32)> = left
            .iter()
            .zip(&right)
            .map(|(&l, &r)| b.process(l, r))
            .collect();
        a.process_block(&mut left, &mut right);

        for (i, (l, r)) in expected.into_iter().enumerate() {
            assert_eq!(left[i], l);
            assert_eq!(right[i], r);
        }
    }
}
