//! Spectral (FIR) Filter
//!
//! Overlap-add block convolution: each block of `FIR_LENGTH` inputs is
//! zero-padded to `FFT_SIZE = 2 * FIR_LENGTH`, multiplied by the cached
//! kernel spectrum and transformed back. The first half of the result is
//! emitted (plus the previous block's tail), the second half is carried.
//! Latency is one block.

use std::f32::consts::{PI, TAU};

use num_complex::Complex32;
use sfx_core::{FilterShape, Sample, sample_rate_or_default};

use crate::fft::FftHandler;
use crate::windows;
use crate::{MonoProcessor, Processor, ProcessorConfig};

/// Default bandpass damping
pub const DEFAULT_DAMPING: f32 = 0.002;

pub type SpectralFilter256 = SpectralFilter<256, 512>;
pub type SpectralFilter1024 = SpectralFilter<1024, 2048>;

/// FFT convolution with a `FIR_LENGTH`-tap kernel
pub struct SpectralFilter<const FIR_LENGTH: usize = 1024, const FFT_SIZE: usize = 2048> {
    sample_rate: f32,
    shape: FilterShape,
    fft: FftHandler<FFT_SIZE>,

    /// Time-domain kernel
    fir: Vec<f32>,
    /// Spectrum of the zero-padded kernel
    kernel: Vec<Complex32>,

    input_block: Vec<f32>,
    output_block: Vec<f32>,
    /// Tail of the previous block's convolution
    overlap: Vec<f32>,
    pos: usize,

    padded: Vec<f32>,
    spectrum: Vec<Complex32>,
}

impl<const FIR_LENGTH: usize, const FFT_SIZE: usize> SpectralFilter<FIR_LENGTH, FFT_SIZE> {
    const SIZE_OK: () = assert!(
        FIR_LENGTH >= 1 && FFT_SIZE == 2 * FIR_LENGTH,
        "FFT size must be twice the FIR length"
    );

    /// Create a pass-through filter (unity tap at 0)
    pub fn new(sample_rate: f32) -> Self {
        let () = Self::SIZE_OK;

        let mut filter = Self {
            sample_rate: sample_rate_or_default(sample_rate),
            shape: FilterShape::Identity,
            fft: FftHandler::new(),
            fir: vec![0.0; FIR_LENGTH],
            kernel: vec![Complex32::new(0.0, 0.0); FFT_SIZE],
            input_block: vec![0.0; FIR_LENGTH],
            output_block: vec![0.0; FIR_LENGTH],
            overlap: vec![0.0; FIR_LENGTH],
            pos: 0,
            padded: vec![0.0; FFT_SIZE],
            spectrum: vec![Complex32::new(0.0, 0.0); FFT_SIZE],
        };
        filter.set_identity();
        filter
    }

    // ============ Kernel Design ============

    /// Unity tap at index 0
    pub fn set_identity(&mut self) {
        self.fir.fill(0.0);
        self.fir[0] = 1.0;
        self.shape = FilterShape::Identity;
        self.update_kernel();
    }

    /// Exponentially damped sinusoid, unity gain at `center_hz`
    pub fn set_bandpass(&mut self, center_hz: f32, damping: f32) {
        if !center_hz.is_finite() || !damping.is_finite() {
            log::debug!("SpectralFilter: ignoring non-finite bandpass parameters");
            return;
        }
        let fr = (center_hz / self.sample_rate).clamp(0.0, 0.5);
        let damping = damping.max(0.0);

        for (i, h) in self.fir.iter_mut().enumerate() {
            let n = i as f32;
            *h = (-damping * n).exp() * (TAU * fr * n).sin();
        }

        // Response magnitude at the centre frequency
        let response: Complex32 = self
            .fir
            .iter()
            .enumerate()
            .map(|(i, &h)| Complex32::from_polar(h, -TAU * fr * i as f32))
            .sum();
        let gain = response.norm();
        if gain > 1e-10 {
            self.fir.iter_mut().for_each(|h| *h /= gain);
        }

        self.shape = FilterShape::Bandpass { center_hz, damping };
        self.update_kernel();
    }

    /// Hann-windowed sinc, unity DC gain
    pub fn set_lowpass(&mut self, cutoff_hz: f32) {
        if !cutoff_hz.is_finite() {
            log::debug!("SpectralFilter: ignoring non-finite cutoff");
            return;
        }
        self.design_lowpass(cutoff_hz);
        self.shape = FilterShape::Lowpass { cutoff_hz };
        self.update_kernel();
    }

    /// Spectral inversion of the lowpass
    pub fn set_highpass(&mut self, cutoff_hz: f32) {
        if !cutoff_hz.is_finite() {
            log::debug!("SpectralFilter: ignoring non-finite cutoff");
            return;
        }
        self.design_lowpass(cutoff_hz);
        for h in self.fir.iter_mut() {
            *h = -*h;
        }
        self.fir[FIR_LENGTH / 2] += 1.0;

        self.shape = FilterShape::Highpass { cutoff_hz };
        self.update_kernel();
    }

    /// Custom taps, truncated or zero-padded to `FIR_LENGTH`
    pub fn set_fir(&mut self, coeffs: &[f32]) {
        let len = coeffs.len().min(FIR_LENGTH);
        if coeffs.len() > FIR_LENGTH {
            log::debug!(
                "SpectralFilter: truncating {} taps to {FIR_LENGTH}",
                coeffs.len()
            );
        }
        self.fir.fill(0.0);
        self.fir[..len].copy_from_slice(&coeffs[..len]);

        self.shape = FilterShape::Custom;
        self.update_kernel();
    }

    /// Apply a configured shape; `Custom` keeps the current taps
    pub fn apply_params(&mut self, shape: &FilterShape) {
        match *shape {
            FilterShape::Identity => self.set_identity(),
            FilterShape::Bandpass { center_hz, damping } => self.set_bandpass(center_hz, damping),
            FilterShape::Lowpass { cutoff_hz } => self.set_lowpass(cutoff_hz),
            FilterShape::Highpass { cutoff_hz } => self.set_highpass(cutoff_hz),
            FilterShape::Custom => {}
        }
    }

    fn design_lowpass(&mut self, cutoff_hz: f32) {
        let fc = (cutoff_hz / self.sample_rate).clamp(0.0, 0.5);
        let center = (FIR_LENGTH / 2) as f32;

        for (i, h) in self.fir.iter_mut().enumerate() {
            let n = i as f32 - center;
            *h = if n == 0.0 {
                2.0 * fc
            } else {
                (TAU * fc * n).sin() / (PI * n)
            };
        }
        // Window in the padding scratch; update_kernel overwrites it next
        let window = &mut self.padded[..FIR_LENGTH];
        windows::hann(window);
        windows::apply(&mut self.fir, window);

        let sum = windows::sum(&self.fir);
        if sum.abs() > 1e-6 {
            let scale = 1.0 / sum.abs();
            self.fir.iter_mut().for_each(|h| *h *= scale);
        }
    }

    fn update_kernel(&mut self) {
        self.padded[..FIR_LENGTH].copy_from_slice(&self.fir);
        self.padded[FIR_LENGTH..].fill(0.0);
        self.fft.forward_complex(&self.padded, &mut self.kernel);
        log::debug!("SpectralFilter: kernel rebuilt ({:?})", self.shape);
    }

    // ============ Accessors ============

    pub fn shape(&self) -> FilterShape {
        self.shape
    }

    pub fn coefficients(&self) -> &[f32] {
        &self.fir
    }

    pub const fn fir_length(&self) -> usize {
        FIR_LENGTH
    }

    pub const fn fft_size(&self) -> usize {
        FFT_SIZE
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    // ============ Processing ============

    /// Process a single sample
    #[inline]
    pub fn process(&mut self, input: Sample) -> Sample {
        self.input_block[self.pos] = input;
        let out = self.output_block[self.pos];
        self.pos += 1;

        if self.pos == FIR_LENGTH {
            self.pos = 0;
            self.convolve_block();
        }

        out
    }

    fn convolve_block(&mut self) {
        self.padded[..FIR_LENGTH].copy_from_slice(&self.input_block);
        self.padded[FIR_LENGTH..].fill(0.0);
        self.fft.forward_complex(&self.padded, &mut self.spectrum);

        for (bin, k) in self.spectrum.iter_mut().zip(&self.kernel) {
            *bin *= *k;
        }

        self.fft.inverse_complex(&self.spectrum, &mut self.padded);

        let (head, tail) = self.padded.split_at(FIR_LENGTH);
        for i in 0..FIR_LENGTH {
            self.output_block[i] = head[i] + self.overlap[i];
            self.overlap[i] = tail[i];
        }
    }
}

impl Default for SpectralFilter {
    fn default() -> Self {
        Self::new(sfx_core::DEFAULT_SAMPLE_RATE)
    }
}

impl<const FIR_LENGTH: usize, const FFT_SIZE: usize> Processor
    for SpectralFilter<FIR_LENGTH, FFT_SIZE>
{
    fn reset(&mut self) {
        self.input_block.fill(0.0);
        self.output_block.fill(0.0);
        self.overlap.fill(0.0);
        self.pos = 0;
    }

    fn latency(&self) -> usize {
        FIR_LENGTH
    }
}

impl<const FIR_LENGTH: usize, const FFT_SIZE: usize> MonoProcessor
    for SpectralFilter<FIR_LENGTH, FFT_SIZE>
{
    #[inline]
    fn process_sample(&mut self, input: Sample) -> Sample {
        self.process(input)
    }
}

impl<const FIR_LENGTH: usize, const FFT_SIZE: usize> ProcessorConfig
    for SpectralFilter<FIR_LENGTH, FFT_SIZE>
{
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate_or_default(sample_rate as f32);
        // Frequency-based shapes depend on the rate
        let shape = self.shape;
        self.apply_params(&shape);
    }
}
