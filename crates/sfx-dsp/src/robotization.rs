//! Robotization
//!
//! Zero-phase grain resynthesis. Discarding the phase of every grain and
//! re-emitting grains at a fixed hop imposes a pitch of `sample_rate / hop`
//! on the signal, giving the familiar monotone robot voice.

use num_complex::Complex32;
use sfx_core::{GrainParams, Sample};

use crate::grain::GrainEngine;
use crate::{MonoProcessor, Processor};

/// Robot voice effect over `N`-sample grains (hop `N/4` by default)
pub struct Robotization<const N: usize = 1024> {
    engine: GrainEngine<N>,
}

impl<const N: usize> Robotization<N> {
    pub const DEFAULT_HOP_SIZE: usize = N / 4;

    pub fn new() -> Self {
        Self {
            engine: GrainEngine::new(Self::DEFAULT_HOP_SIZE),
        }
    }

    /// Process a single sample
    #[inline]
    pub fn process_sample(&mut self, input: Sample) -> Sample {
        self.engine.process_sample(input, &mut zero_phase)
    }

    /// Process a block; equivalent to calling `process_sample` per sample
    pub fn process(&mut self, input: &[Sample], output: &mut [Sample]) {
        debug_assert_eq!(input.len(), output.len());
        for (out, &x) in output.iter_mut().zip(input) {
            *out = self.engine.process_sample(x, &mut zero_phase);
        }
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
    }
}

impl<const N: usize> Default for Robotization<N> {
    fn default() -> Self {
        Self::new()
    }
}

fn zero_phase(bins: &mut [Complex32]) {
    for bin in bins.iter_mut() {
        *bin = Complex32::new(bin.norm(), 0.0);
    }
}

impl<const N: usize> Processor for Robotization<N> {
    fn reset(&mut self) {
        self.engine.reset();
    }

    fn latency(&self) -> usize {
        self.engine.latency()
    }
}

impl<const N: usize> MonoProcessor for Robotization<N> {
    #[inline]
    fn process_sample(&mut self, input: Sample) -> Sample {
        self.engine.process_sample(input, &mut zero_phase)
    }
}
