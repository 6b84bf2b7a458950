//! Fixed-size FFT
//!
//! Iterative radix-2 decimation-in-time transform with the size fixed at
//! compile time. Twiddle and bit-reversal tables are built once in
//! [`FftHandler::new`]; `forward`/`inverse` never allocate.
//!
//! Conventions:
//! - forward is unnormalized (bin 0 is the plain sum of the input)
//! - inverse scales by `1/N` and keeps only the real part

use std::f64::consts::PI;

use num_complex::Complex32;

// ============ FFT Handler ============

/// Radix-2 FFT of size `N`
///
/// `N` must be a power of two and at least 2; anything else fails to compile
/// when the handler is constructed.
///
/// ```ignore
/// let mut fft = Fft1024::new();
/// fft.forward(&input, &mut re, &mut im);
/// fft.inverse(&re, &im, &mut output);
/// ```
pub struct FftHandler<const N: usize> {
    /// `exp(-2πik/N)` for k in `0..N/2`
    twiddles: Vec<Complex32>,
    /// Bit-reversed index for each position
    bit_reverse: Vec<usize>,
    /// Working buffer
    scratch: Vec<Complex32>,
    initialized: bool,
}

pub type Fft256 = FftHandler<256>;
pub type Fft512 = FftHandler<512>;
pub type Fft1024 = FftHandler<1024>;
pub type Fft2048 = FftHandler<2048>;
pub type Fft4096 = FftHandler<4096>;

impl<const N: usize> FftHandler<N> {
    const SIZE_OK: () = assert!(
        N.is_power_of_two() && N >= 2,
        "FFT size must be a power of two and at least 2"
    );

    const LOG2_N: u32 = N.trailing_zeros();

    /// Create a handler with its tables already built
    pub fn new() -> Self {
        let () = Self::SIZE_OK;

        let mut fft = Self {
            twiddles: vec![Complex32::new(0.0, 0.0); N / 2],
            bit_reverse: vec![0; N],
            scratch: vec![Complex32::new(0.0, 0.0); N],
            initialized: false,
        };
        fft.init();
        fft
    }

    /// Rebuild twiddle and bit-reversal tables
    ///
    /// Idempotent. Angles are computed in double precision so large sizes keep
    /// accurate twiddles.
    pub fn init(&mut self) {
        for (k, w) in self.twiddles.iter_mut().enumerate() {
            let angle = -2.0 * PI * k as f64 / N as f64;
            *w = Complex32::new(angle.cos() as f32, angle.sin() as f32);
        }

        let shift = usize::BITS - Self::LOG2_N;
        for (i, rev) in self.bit_reverse.iter_mut().enumerate() {
            *rev = i.reverse_bits() >> shift;
        }

        self.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Transform size
    pub const fn size() -> usize {
        N
    }

    // ============ Transforms ============

    /// Forward transform of a real signal into split real/imaginary parts
    pub fn forward(&mut self, input: &[f32], re: &mut [f32], im: &mut [f32]) {
        debug_assert_eq!(input.len(), N);
        debug_assert_eq!(re.len(), N);
        debug_assert_eq!(im.len(), N);

        self.load_real(input);
        self.transform(false);

        for ((c, r), i) in self.scratch.iter().zip(re.iter_mut()).zip(im.iter_mut()) {
            *r = c.re;
            *i = c.im;
        }
    }

    /// Forward transform of a real signal into complex bins
    pub fn forward_complex(&mut self, input: &[f32], output: &mut [Complex32]) {
        debug_assert_eq!(input.len(), N);
        debug_assert_eq!(output.len(), N);

        self.load_real(input);
        self.transform(false);
        output.copy_from_slice(&self.scratch);
    }

    /// Inverse transform from split real/imaginary parts
    ///
    /// The imaginary part of the result is discarded.
    pub fn inverse(&mut self, re: &[f32], im: &[f32], output: &mut [f32]) {
        debug_assert_eq!(re.len(), N);
        debug_assert_eq!(im.len(), N);
        debug_assert_eq!(output.len(), N);

        for (i, (&r, &m)) in re.iter().zip(im.iter()).enumerate() {
            self.scratch[self.bit_reverse[i]] = Complex32::new(r, m);
        }
        self.transform(true);
        self.store_real(output);
    }

    /// Inverse transform from complex bins
    pub fn inverse_complex(&mut self, input: &[Complex32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), N);
        debug_assert_eq!(output.len(), N);

        for (i, &c) in input.iter().enumerate() {
            self.scratch[self.bit_reverse[i]] = c;
        }
        self.transform(true);
        self.store_real(output);
    }

    fn load_real(&mut self, input: &[f32]) {
        for (i, &x) in input.iter().enumerate() {
            self.scratch[self.bit_reverse[i]] = Complex32::new(x, 0.0);
        }
    }

    fn store_real(&self, output: &mut [f32]) {
        let scale = 1.0 / N as f32;
        for (out, c) in output.iter_mut().zip(self.scratch.iter()) {
            *out = c.re * scale;
        }
    }

    /// In-place butterflies over bit-reversed `scratch`
    fn transform(&mut self, inverse: bool) {
        let mut half = 1;
        while half < N {
            let span = half * 2;
            let stride = N / span;

            for start in (0..N).step_by(span) {
                for j in 0..half {
                    let w = self.twiddles[j * stride];
                    let w = if inverse { w.conj() } else { w };

                    let a = self.scratch[start + j];
                    let b = self.scratch[start + j + half] * w;
                    self.scratch[start + j] = a + b;
                    self.scratch[start + j + half] = a - b;
                }
            }

            half = span;
        }
    }
}

impl<const N: usize> Default for FftHandler<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ============ Bin Conversions ============

/// Per-bin magnitude
pub fn magnitude(re: &[f32], im: &[f32], output: &mut [f32]) {
    debug_assert_eq!(re.len(), im.len());
    for ((out, &r), &i) in output.iter_mut().zip(re).zip(im) {
        *out = r.hypot(i);
    }
}

/// Per-bin phase in radians
pub fn phase(re: &[f32], im: &[f32], output: &mut [f32]) {
    debug_assert_eq!(re.len(), im.len());
    for ((out, &r), &i) in output.iter_mut().zip(re).zip(im) {
        *out = i.atan2(r);
    }
}

/// Rebuild split real/imaginary parts from magnitude and phase
pub fn from_polar(magnitude: &[f32], phase: &[f32], re: &mut [f32], im: &mut [f32]) {
    debug_assert_eq!(magnitude.len(), phase.len());
    for (((r, i), &mag), &ph) in re.iter_mut().zip(im.iter_mut()).zip(magnitude).zip(phase) {
        let (sin, cos) = ph.sin_cos();
        *r = mag * cos;
        *i = mag * sin;
    }
}

/// Swap the two halves of a buffer in place
///
/// Moves the zero-time sample to the centre of the frame. For even lengths
/// this is its own inverse.
pub fn fft_shift<T>(data: &mut [T]) {
    let half = data.len() / 2;
    data.rotate_right(half);
}
