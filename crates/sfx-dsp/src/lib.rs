//! sfx-dsp: spectral audio processors
//!
//! Fixed-size, allocation-free FFT processing for real-time audio. Every
//! processor allocates its buffers in `new()` and never again.
//!
//! ## Modules
//! - `fft` - Radix-2 FFT with compile-time size
//! - `windows` - Hann, Hamming, Blackman, Blackman-Harris, triangular, Kaiser
//! - `princarg` - Phase wrapping to the principal range
//! - `hrir` - Simplified spherical-head HRIR generator
//! - `phase_vocoder` - Phase vocoder pitch shifter
//! - `spectral_filter` - FFT overlap-add FIR filter
//! - `robotization` - Zero-phase grain resynthesis
//! - `whisperization` - Random-phase grain resynthesis
//! - `crosstalk` - HRIR-based crosstalk canceller for loudspeaker playback

pub mod crosstalk;
pub mod fft;
mod grain;
pub mod hrir;
pub mod phase_vocoder;
pub mod princarg;
pub mod robotization;
pub mod spectral_filter;
pub mod whisperization;
pub mod windows;

pub use crosstalk::{CrosstalkCanceller, CrosstalkCanceller128, CrosstalkCanceller256};
pub use fft::{Fft256, Fft512, Fft1024, Fft2048, Fft4096, FftHandler};
pub use hrir::SimpleHrir;
pub use phase_vocoder::PhaseVocoder;
pub use robotization::Robotization;
pub use spectral_filter::{SpectralFilter, SpectralFilter256, SpectralFilter1024};
pub use whisperization::Whisperization;
pub use windows::WindowType;

use sfx_core::Sample;

/// State shared by every spectral processor: buffered history and delay
pub trait Processor: Send + Sync {
    /// Clear history, overlap tails and pending grains
    fn reset(&mut self);

    /// Delay from input to output, in samples
    fn latency(&self) -> usize {
        0
    }
}

/// Single-channel sample stream
pub trait MonoProcessor: Processor {
    /// One sample in, one sample out; blocks and grains are buffered inside
    fn process_sample(&mut self, input: Sample) -> Sample;

    /// In-place block, identical to calling `process_sample` per sample
    fn process_block(&mut self, buffer: &mut [Sample]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }
}

/// Two-channel processor that mixes across channels
pub trait StereoProcessor: Processor {
    /// One `(left, right)` frame in, one out
    fn process_sample(&mut self, left: Sample, right: Sample) -> (Sample, Sample);

    /// In-place channel blocks of equal length
    fn process_block(&mut self, left: &mut [Sample], right: &mut [Sample]) {
        debug_assert_eq!(left.len(), right.len());
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            (*l, *r) = self.process_sample(*l, *r);
        }
    }
}

/// Sample-rate changes; invalid rates fall back to 48 kHz
pub trait ProcessorConfig {
    /// Rebuilds any rate-dependent kernels or filters
    fn set_sample_rate(&mut self, sample_rate: f64);
}
