//! Whisperization
//!
//! Random-phase grain resynthesis. Magnitudes are kept, phases are drawn
//! from a seeded LCG, so the pitch structure is destroyed while the spectral
//! envelope survives. Short grains and a small hop work best.

use std::f32::consts::TAU;

use num_complex::Complex32;
use sfx_core::{GrainParams, Sample};

use crate::grain::GrainEngine;
use crate::{MonoProcessor, Processor};

/// Default LCG seed
pub const DEFAULT_SEED: u32 = 12345;

/// Whisper effect over `N`-sample grains (hop `N/8` by default)
pub struct Whisperization<const N: usize = 512> {
    engine: GrainEngine<N>,
    rng: PhaseRng,
    seed: u32,
}

/// 32-bit linear congruential generator
#[derive(Debug, Clone, Copy)]
struct PhaseRng {
    state: u32,
}

impl PhaseRng {
    /// Uniform phase in `[0, 2π)`
    #[inline]
    fn next_phase(&mut self) -> f32 {
        self.state = self.state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (self.state as f64 / 4_294_967_296.0) as f32 * TAU
    }

    /// Replace phases with random ones, keeping the spectrum Hermitian
    fn randomize(&mut self, bins: &mut [Complex32]) {
        let n = bins.len();
        let half = n / 2;

        // DC and Nyquist must stay real
        for k in [0, half] {
            let mag = bins[k].norm();
            bins[k] = Complex32::new(mag * self.next_phase().cos(), 0.0);
        }

        for k in 1..half {
            let bin = Complex32::from_polar(bins[k].norm(), self.next_phase());
            bins[k] = bin;
            bins[n - k] = bin.conj();
        }
    }
}

impl<const N: usize> Whisperization<N> {
    pub const DEFAULT_HOP_SIZE: usize = N / 8;

    pub fn new() -> Self {
        Self {
            engine: GrainEngine::new(Self::DEFAULT_HOP_SIZE),
            rng: PhaseRng { state: DEFAULT_SEED },
            seed: DEFAULT_SEED,
        }
    }

    /// Process a single sample
    #[inline]
    pub fn process_sample(&mut self, input: Sample) -> Sample {
        let rng = &mut self.rng;
        self.engine
            .process_sample(input, &mut |bins: &mut [Complex32]| rng.randomize(bins))
    }

    /// Process a block; equivalent to calling `process_sample` per sample
    pub fn process(&mut self, input: &[Sample], output: &mut [Sample]) {
        debug_assert_eq!(input.len(), output.len());
        let rng = &mut self.rng;
        let mut reshape = |bins: &mut [Complex32]| rng.randomize(bins);
        for (out, &x) in output.iter_mut().zip(input) {
            *out = self.engine.process_sample(x, &mut reshape);
        }
    }

    /// Restart the phase sequence from `seed`
    pub fn set_seed(&mut self, seed: u32) {
        self.seed = seed;
        self.rng.state = seed;
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Grain hop in samples; ignored unless `1..=N`
    pub fn set_hop_size(&mut self, hop_size: usize) {
        self.engine.set_hop_size(hop_size);
    }

    pub fn hop_size(&self) -> usize {
        self.engine.hop_size()
    }

    /// Dry/wet mix, clamped to `[0, 1]`
    pub fn set_mix(&mut self, mix: f32) {
        self.engine.set_mix(mix);
    }

    pub fn mix(&self) -> f32 {
        self.engine.mix()
    }

    pub const fn fft_size(&self) -> usize {
        N
    }

    pub fn apply_params(&mut self, params: &GrainParams) {
        if let Some(hop_size) = params.hop_size {
            self.set_hop_size(hop_size);
        }
        self.set_mix(params.mix);
        if let Some(seed) = params.seed {
            self.set_seed(seed);
        }
    }
}

impl<const N: usize> Default for Whisperization<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Processor for Whisperization<N> {
    /// Clears buffers and restarts the phase sequence from the current seed
    fn reset(&mut self) {
        self.engine.reset();
        self.rng.state = self.seed;
    }

    fn latency(&self) -> usize {
        self.engine.latency()
    }
}

impl<const N: usize> MonoProcessor for Whisperization<N> {
    #[inline]
    fn process_sample(&mut self, input: Sample) -> Sample {
        let rng = &mut self.rng;
        self.engine
            .process_sample(input, &mut |bins: &mut [Complex32]| rng.randomize(bins))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(len: usize) -> Vec<f32> {
        let mut state = 1u32;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(22_695_477).wrapping_add(1);
                (state >> 8) as f32 / (1u32 << 24) as f32 - 0.5
            })
            .collect()
    }

    fn render(whisper: &mut Whisperization<512>, input: &[f32]) -> Vec<f32> {
        input.iter().map(|&x| whisper.process_sample(x)).collect()
    }

    #[test]
    fn test_lcg_sequence() {
        let mut rng = PhaseRng { state: 0 };
        rng.next_phase();
        assert_eq!(rng.state, 1_013_904_223);
        rng.next_phase();
        assert_eq!(rng.state, 1_196_435_762);
    }

    #[test]
    fn test_randomize_keeps_magnitude_and_symmetry() {
        let mut rng = PhaseRng { state: 7 };
        let mut bins: Vec<Complex32> = (0..16).map(|k| Complex32::new(k as f32, 1.0)).collect();
        let before: Vec<f32> = bins.iter().map(|b| b.norm()).collect();
        rng.randomize(&mut bins);

        for k in 1..8 {
            assert!((bins[k].norm() - before[k]).abs() < 1e-4);
            assert_eq!(bins[16 - k], bins[k].conj());
        }
        assert_eq!(bins[0].im, 0.0);
        assert_eq!(bins[8].im, 0.0);
    }

    #[test]
    fn test_same_seed_is_bit_identical() {
        let input = noise(8192);
        let mut a = Whisperization::<512>::new();
        let mut b = Whisperization::<512>::new();
        a.set_seed(42);
        b.set_seed(42);

        assert_eq!(render(&mut a, &input), render(&mut b, &input));
    }

    #[test]
    fn test_different_seeds_differ() {
        let input = noise(8192);
        let mut a = Whisperization::<512>::new();
        let mut b = Whisperization::<512>::new();
        a.set_seed(1);
        b.set_seed(2);

        assert_ne!(render(&mut a, &input), render(&mut b, &input));
    }

    #[test]
    fn test_reset_replays_sequence() {
        let input = noise(4096);
        let mut whisper = Whisperization::<512>::new();
        let first = render(&mut whisper, &input);
        whisper.reset();
        assert_eq!(render(&mut whisper, &input), first);
    }

    #[test]
    fn test_output_finite_and_bounded() {
        let input = noise(16384);
        let mut whisper = Whisperization::<512>::new();
        let output = render(&mut whisper, &input);
        assert!(output.iter().all(|x| x.is_finite()));
        assert!(output.iter().any(|x| x.abs() > 1e-3));
        assert!(output.iter().all(|x| x.abs() < 10.0));
    }

    #[test]
    fn test_defaults_and_params() {
        let mut whisper = Whisperization::<512>::default();
        assert_eq!(whisper.hop_size(), 64);
        assert_eq!(whisper.seed(), DEFAULT_SEED);

        whisper.apply_params(&GrainParams {
            hop_size: Some(128),
            mix: 0.5,
            seed: Some(99),
        });
        assert_eq!(whisper.hop_size(), 128);
        assert_eq!(whisper.mix(), 0.5);
        assert_eq!(whisper.seed(), 99);
    }
}
