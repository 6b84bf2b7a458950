//! Sample type and sample-rate validation

use crate::{DspError, DspResult};

/// Type alias for audio samples
///
/// The spectral processors run in single precision end to end, including the
/// complex arithmetic of the transform.
pub type Sample = f32;

/// Fallback sample rate used when a caller hands us something unusable
pub const DEFAULT_SAMPLE_RATE: f32 = 48_000.0;

/// Lowest accepted sample rate
pub const MIN_SAMPLE_RATE: f32 = 8_000.0;

/// Highest accepted sample rate
pub const MAX_SAMPLE_RATE: f32 = 384_000.0;

/// Check that a sample rate is finite and within the supported range
pub fn validate_sample_rate(sample_rate: f32) -> DspResult<f32> {
    if sample_rate.is_finite() && (MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
        Ok(sample_rate)
    } else {
        Err(DspError::InvalidSampleRate(sample_rate))
    }
}

/// Validate a sample rate, falling back to [`DEFAULT_SAMPLE_RATE`]
///
/// Processor constructors use this so that a bad host value degrades to a
/// working default instead of producing non-finite coefficients.
pub fn sample_rate_or_default(sample_rate: f32) -> f32 {
    validate_sample_rate(sample_rate).unwrap_or_else(|err| {
        log::warn!("{err}, falling back to {DEFAULT_SAMPLE_RATE} Hz");
        DEFAULT_SAMPLE_RATE
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_rates_accepted() {
        for sr in [44_100.0, 48_000.0, 96_000.0, 192_000.0] {
            assert_eq!(validate_sample_rate(sr).unwrap(), sr);
        }
    }

    #[test]
    fn test_bad_rates_rejected() {
        for sr in [0.0, -48_000.0, f32::NAN, f32::INFINITY, 1_000_000.0] {
            assert!(matches!(
                validate_sample_rate(sr),
                Err(DspError::InvalidSampleRate(_))
            ));
        }
    }

    #[test]
    fn test_fallback() {
        assert_eq!(sample_rate_or_default(f32::NAN), DEFAULT_SAMPLE_RATE);
        assert_eq!(sample_rate_or_default(44_100.0), 44_100.0);
    }
}
