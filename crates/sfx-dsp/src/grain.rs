//! Grain overlap-add engine shared by robotization and whisperization
//!
//! Every `hop_size` samples the last `N` inputs are windowed and transformed,
//! a caller-supplied closure rewrites the spectrum, and the resynthesized
//! grain is centred, windowed again and overlap-added into a `2N` ring.

use num_complex::Complex32;
use sfx_core::Sample;

use crate::fft::{FftHandler, fft_shift};
use crate::windows::{self, WindowType};

pub(crate) struct GrainEngine<const N: usize> {
    fft: FftHandler<N>,
    window: Vec<f32>,
    /// Overlap-add normalization for the current hop
    wet_gain: f32,

    /// Circular input history (N); `write_pos` is the oldest sample
    history: Vec<f32>,
    write_pos: usize,
    /// Output ring (2N), drained as it is read
    accumulator: Vec<f32>,
    read_pos: usize,

    hop_size: usize,
    hop_counter: usize,
    mix: f32,

    frame: Vec<f32>,
    spectrum: Vec<Complex32>,
}

impl<const N: usize> GrainEngine<N> {
    const SIZE_OK: () = assert!(
        N.is_power_of_two() && N >= 8,
        "grain size must be a power of two and at least 8"
    );

    pub fn new(hop_size: usize) -> Self {
        let () = Self::SIZE_OK;

        let mut engine = Self {
            fft: FftHandler::new(),
            window: WindowType::Hann.generate(N),
            wet_gain: 1.0,
            history: vec![0.0; N],
            write_pos: 0,
            accumulator: vec![0.0; 2 * N],
            read_pos: 0,
            hop_size: N / 4,
            hop_counter: 0,
            mix: 1.0,
            frame: vec![0.0; N],
            spectrum: vec![Complex32::new(0.0, 0.0); N],
        };
        engine.set_hop_size(hop_size);
        engine.update_gain();
        engine
    }

    /// Ignored unless `1..=N`
    pub fn set_hop_size(&mut self, hop_size: usize) {
        if hop_size == 0 || hop_size > N {
            log::debug!("Grain: ignoring hop size {hop_size} (grain size {N})");
            return;
        }
        if hop_size != self.hop_size {
            self.hop_size = hop_size;
            self.hop_counter = self.hop_counter.min(hop_size - 1);
            self.update_gain();
        }
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn set_mix(&mut self, mix: f32) {
        if mix.is_nan() {
            return;
        }
        self.mix = mix.clamp(0.0, 1.0);
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }

    fn update_gain(&mut self) {
        self.wet_gain = self.hop_size as f32 / windows::sum_squared(&self.window).max(1e-10);
    }

    /// Process one sample; `reshape` rewrites each grain's spectrum
    #[inline]
    pub fn process_sample<F>(&mut self, input: Sample, reshape: &mut F) -> Sample
    where
        F: FnMut(&mut [Complex32]),
    {
        self.history[self.write_pos] = input;
        self.write_pos = (self.write_pos + 1) % N;

        let wet = self.accumulator[self.read_pos];
        self.accumulator[self.read_pos] = 0.0;
        self.read_pos = (self.read_pos + 1) % (2 * N);

        self.hop_counter += 1;
        if self.hop_counter >= self.hop_size {
            self.hop_counter = 0;
            self.process_grain(reshape);
        }

        input * (1.0 - self.mix) + wet * self.mix
    }

    fn process_grain<F>(&mut self, reshape: &mut F)
    where
        F: FnMut(&mut [Complex32]),
    {
        for (i, sample) in self.frame.iter_mut().enumerate() {
            *sample = self.history[(self.write_pos + i) % N] * self.window[i];
        }

        self.fft.forward_complex(&self.frame, &mut self.spectrum);
        reshape(&mut self.spectrum);
        self.fft.inverse_complex(&self.spectrum, &mut self.frame);

        // Zero-phase grains are centred on sample 0; move them to the middle
        fft_shift(&mut self.frame);
        windows::apply(&mut self.frame, &self.window);

        for (i, &sample) in self.frame.iter().enumerate() {
            let idx = (self.read_pos + i) % (2 * N);
            self.accumulator[idx] += sample * self.wet_gain;
        }
    }

    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.accumulator.fill(0.0);
        self.write_pos = 0;
        self.read_pos = 0;
        self.hop_counter = 0;
    }

    /// Wet-path delay, zero when fully dry
    pub fn latency(&self) -> usize {
        if self.mix > 0.0 { N } else { 0 }
    }
}
