//! Phase Vocoder Pitch Shifter
//!
//! Analysis hop is fixed at N/4. Each frame's phases are advanced by the
//! measured instantaneous frequency scaled by `1/pitch_ratio`, the frame is
//! resynthesized, and the resulting grain is resampled to `N / pitch_ratio`
//! samples before overlap-add.
//!
//! ```ignore
//! let mut pv = PhaseVocoder::<2048>::new(48000.0);
//! pv.set_pitch_ratio(1.2);
//! let out = pv.process(input);
//! ```

use std::f64::consts::PI;

use num_complex::Complex32;
use sfx_core::{PitchShiftParams, Sample, sample_rate_or_default};

use crate::fft::{FftHandler, fft_shift};
use crate::princarg::princarg;
use crate::windows::{self, WindowType};
use crate::{MonoProcessor, Processor, ProcessorConfig};

// ============ Phase Vocoder ============

/// Real-time pitch shifter with fixed latency of `N` samples
pub struct PhaseVocoder<const N: usize = 2048> {
    sample_rate: f32,
    pitch_ratio: f32,

    fft: FftHandler<N>,
    analysis_window: Vec<f32>,
    synthesis_window: Vec<f32>,

    /// Expected phase advance per hop for bins `0..=N/2`
    omega: Vec<f32>,
    /// Measured phase of the previous frame, bins `0..=N/2`
    prev_phase: Vec<f32>,
    /// Synthesis phase, all `N` bins (upper half mirrors the lower)
    accum_phase: Vec<f32>,

    /// Circular input history (2N)
    history: Vec<f32>,
    write_pos: usize,
    /// Overlap-add ring (2N), drained as it is read
    accumulator: Vec<f32>,
    read_pos: usize,
    hop_counter: usize,

    /// Scratch
    frame: Vec<f32>,
    spectrum: Vec<Complex32>,
    /// Windowed output of the last frame, before resampling
    synthesis: Vec<f32>,

    /// Resampled grain length (`N / pitch_ratio`, at most 2N)
    grain_length: usize,
    /// Playback position of the current grain's first hop
    grain_pos: usize,
    interp_idx0: Vec<usize>,
    interp_idx1: Vec<usize>,
    interp_frac: Vec<f32>,
    /// Normalizes overlapping resampled grains to unity gain
    ola_gain: f32,
}

impl<const N: usize> PhaseVocoder<N> {
    /// Analysis hop (75% overlap)
    pub const HOP_SIZE: usize = N / 4;

    const SIZE_OK: () = assert!(
        N.is_power_of_two() && N >= 4,
        "phase vocoder size must be a power of two and at least 4"
    );

    pub fn new(sample_rate: f32) -> Self {
        let () = Self::SIZE_OK;
        let half = N / 2;

        let omega = (0..=half)
            .map(|k| (2.0 * PI * k as f64 * Self::HOP_SIZE as f64 / N as f64) as f32)
            .collect();

        let mut pv = Self {
            sample_rate: sample_rate_or_default(sample_rate),
            pitch_ratio: 1.0,
            fft: FftHandler::new(),
            analysis_window: WindowType::Hann.generate(N),
            synthesis_window: WindowType::Hann.generate(N),
            omega,
            prev_phase: vec![0.0; half + 1],
            accum_phase: vec![0.0; N],
            history: vec![0.0; 2 * N],
            write_pos: 0,
            accumulator: vec![0.0; 2 * N],
            read_pos: 0,
            hop_counter: 0,
            frame: vec![0.0; N],
            spectrum: vec![Complex32::new(0.0, 0.0); N],
            synthesis: vec![0.0; N],
            grain_length: N,
            grain_pos: 0,
            interp_idx0: vec![0; 2 * N],
            interp_idx1: vec![0; 2 * N],
            interp_frac: vec![0.0; 2 * N],
            ola_gain: 1.0,
        };
        pv.update_interpolation();
        pv
    }

    /// Set pitch ratio, clamped to `[0.5, 2.0]`
    pub fn set_pitch_ratio(&mut self, ratio: f32) {
        if !ratio.is_finite() {
            log::debug!("PhaseVocoder: ignoring non-finite pitch ratio");
            return;
        }

        let clamped = PitchShiftParams { pitch_ratio: ratio }.clamped_ratio();
        if clamped != ratio {
            log::debug!("PhaseVocoder: pitch ratio {ratio} clamped to {clamped}");
        }

        if clamped != self.pitch_ratio {
            self.pitch_ratio = clamped;
            self.update_interpolation();
        }
    }

    pub fn pitch_ratio(&self) -> f32 {
        self.pitch_ratio
    }

    pub fn apply_params(&mut self, params: &PitchShiftParams) {
        self.set_pitch_ratio(params.pitch_ratio);
    }

    pub const fn fft_size(&self) -> usize {
        N
    }

    pub const fn hop_size(&self) -> usize {
        Self::HOP_SIZE
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Current resampled grain length
    pub fn grain_length(&self) -> usize {
        self.grain_length
    }

    /// Process a single sample
    #[inline]
    pub fn process(&mut self, input: Sample) -> Sample {
        self.history[self.write_pos] = input;
        self.write_pos = (self.write_pos + 1) % (2 * N);

        let mut out = self.accumulator[self.read_pos];
        self.accumulator[self.read_pos] = 0.0;
        self.read_pos = (self.read_pos + 1) % (2 * N);

        // The first hop of each grain is played straight from the frame,
        // the tail has already been added to the accumulator
        if self.grain_pos < Self::HOP_SIZE.min(self.grain_length) {
            out += self.grain_sample(self.grain_pos);
            self.grain_pos += 1;
        }

        self.hop_counter += 1;
        if self.hop_counter == Self::HOP_SIZE {
            self.hop_counter = 0;
            self.process_frame();
        }

        out
    }

    /// Resampled, gain-corrected grain sample `i`
    #[inline]
    fn grain_sample(&self, i: usize) -> f32 {
        let frac = self.interp_frac[i];
        let a = self.synthesis[self.interp_idx0[i]];
        let b = self.synthesis[self.interp_idx1[i]];
        (a * (1.0 - frac) + b * frac) * self.ola_gain
    }

    /// Recompute grain length, resampling tables and overlap gain
    fn update_interpolation(&mut self) {
        self.grain_length = ((N as f32 / self.pitch_ratio) as usize).clamp(1, 2 * N);

        let step = N as f32 / self.grain_length as f32;
        let mut window_sum = 0.0;
        for i in 0..self.grain_length {
            let x = i as f32 * step;
            let idx0 = (x as usize).min(N - 1);
            let idx1 = (idx0 + 1).min(N - 1);
            let frac = x - idx0 as f32;

            self.interp_idx0[i] = idx0;
            self.interp_idx1[i] = idx1;
            self.interp_frac[i] = frac;

            let w0 = self.analysis_window[idx0] * self.synthesis_window[idx0];
            let w1 = self.analysis_window[idx1] * self.synthesis_window[idx1];
            window_sum += w0 * (1.0 - frac) + w1 * frac;
        }

        self.ola_gain = Self::HOP_SIZE as f32 / window_sum.max(1e-10);

        log::debug!(
            "PhaseVocoder: ratio {}, grain {} samples, ola gain {:.4}",
            self.pitch_ratio,
            self.grain_length,
            self.ola_gain
        );
    }

    /// Analyze the last N samples and overlap-add the new grain
    fn process_frame(&mut self) {
        let half = N / 2;
        let start = (self.write_pos + N) % (2 * N);

        for (i, sample) in self.frame.iter_mut().enumerate() {
            *sample = self.history[(start + i) % (2 * N)] * self.analysis_window[i];
        }
        fft_shift(&mut self.frame);
        self.fft.forward_complex(&self.frame, &mut self.spectrum);

        // Phase propagation
        let stretch = 1.0 / self.pitch_ratio;
        for k in 0..=half {
            let phase = self.spectrum[k].arg();
            let omega = self.omega[k];
            let delta = omega + princarg(phase - self.prev_phase[k] - omega);
            self.prev_phase[k] = phase;
            self.accum_phase[k] = princarg(self.accum_phase[k] + delta * stretch);
        }
        for k in half + 1..N {
            self.accum_phase[k] = princarg(-self.accum_phase[N - k]);
        }

        for (bin, &phase) in self.spectrum.iter_mut().zip(&self.accum_phase) {
            *bin = Complex32::from_polar(bin.norm(), phase);
        }

        self.fft.inverse_complex(&self.spectrum, &mut self.synthesis);
        fft_shift(&mut self.synthesis);
        windows::apply(&mut self.synthesis, &self.synthesis_window);

        // Tail of the grain goes into the accumulator; slot read_pos is the
        // next sample out, so grain sample i lands at read_pos + i
        for i in Self::HOP_SIZE..self.grain_length {
            let value = self.grain_sample(i);
            let idx = (self.read_pos + i) % (2 * N);
            self.accumulator[idx] += value;
        }

        self.grain_pos = 0;
    }
}

impl Default for PhaseVocoder {
    fn default() -> Self {
        Self::new(sfx_core::DEFAULT_SAMPLE_RATE)
    }
}

impl<const N: usize> Processor for PhaseVocoder<N> {
    fn reset(&mut self) {
        self.prev_phase.fill(0.0);
        self.accum_phase.fill(0.0);
        self.history.fill(0.0);
        self.accumulator.fill(0.0);
        self.synthesis.fill(0.0);
        self.write_pos = 0;
        self.read_pos = 0;
        self.hop_counter = 0;
        self.grain_pos = 0;
    }

    fn latency(&self) -> usize {
        N
    }
}

impl<const N: usize> MonoProcessor for PhaseVocoder<N> {
    #[inline]
    fn process_sample(&mut self, input: Sample) -> Sample {
        self.process(input)
    }
}

impl<const N: usize> ProcessorConfig for PhaseVocoder<N> {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate_or_default(sample_rate as f32);
    }
}
