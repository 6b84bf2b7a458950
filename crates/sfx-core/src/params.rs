//! Parameter sets for the spectral processors
//!
//! These are plain serde structs so presets can be stored as JSON. Values are
//! only checked for being usable numbers here; range clamping happens in the
//! processors' setters, the same way a knob sweep past the end is handled.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{DspError, DspResult};

/// Sanity check for parameter sets loaded from outside the process
pub trait Validate {
    fn validate(&self) -> DspResult<()>;
}

/// Parse and validate a parameter set from JSON
pub fn from_json<T: DeserializeOwned + Validate>(json: &str) -> DspResult<T> {
    let params: T = serde_json::from_str(json)?;
    params.validate()?;
    Ok(params)
}

/// Serialize a parameter set to pretty-printed JSON
pub fn to_json<T: Serialize>(params: &T) -> DspResult<String> {
    Ok(serde_json::to_string_pretty(params)?)
}

fn ensure_finite(name: &str, value: f32) -> DspResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DspError::InvalidParam(format!("{name} must be finite, got {value}")))
    }
}

fn ensure_positive(name: &str, value: f32) -> DspResult<()> {
    ensure_finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(DspError::InvalidParam(format!("{name} must be positive, got {value}")))
    }
}

// ============ Pitch Shift ============

/// Phase vocoder pitch shifter settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchShiftParams {
    /// Pitch multiplier (0.5 = octave down, 2.0 = octave up)
    pub pitch_ratio: f32,
}

impl PitchShiftParams {
    pub const MIN_RATIO: f32 = 0.5;
    pub const MAX_RATIO: f32 = 2.0;

    /// Ratio clamped to the supported range
    #[inline]
    pub fn clamped_ratio(&self) -> f32 {
        self.pitch_ratio.clamp(Self::MIN_RATIO, Self::MAX_RATIO)
    }
}

impl Default for PitchShiftParams {
    fn default() -> Self {
        Self { pitch_ratio: 1.0 }
    }
}

impl Validate for PitchShiftParams {
    fn validate(&self) -> DspResult<()> {
        ensure_positive("pitch_ratio", self.pitch_ratio)
    }
}

// ============ Spectral Filter ============

/// FIR kernel shape of the spectral filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterShape {
    /// Unity tap at index 0 (pass-through, delayed by one block)
    Identity,
    /// Exponentially damped sinusoid
    Bandpass { center_hz: f32, damping: f32 },
    /// Windowed sinc
    Lowpass { cutoff_hz: f32 },
    /// Spectrally inverted windowed sinc
    Highpass { cutoff_hz: f32 },
    /// Caller-supplied taps
    Custom,
}

impl Default for FilterShape {
    fn default() -> Self {
        Self::Identity
    }
}

impl Validate for FilterShape {
    fn validate(&self) -> DspResult<()> {
        match *self {
            Self::Identity | Self::Custom => Ok(()),
            Self::Bandpass { center_hz, damping } => {
                ensure_positive("center_hz", center_hz)?;
                ensure_finite("damping", damping)?;
                if damping < 0.0 {
                    return Err(DspError::InvalidParam(format!(
                        "damping must not be negative, got {damping}"
                    )));
                }
                Ok(())
            }
            Self::Lowpass { cutoff_hz } | Self::Highpass { cutoff_hz } => {
                ensure_positive("cutoff_hz", cutoff_hz)
            }
        }
    }
}

// ============ Grain Effects ============

/// Settings shared by robotization and whisperization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrainParams {
    /// Hop size in samples; `None` keeps the processor's default overlap
    pub hop_size: Option<usize>,
    /// Dry/wet mix (0 = dry, 1 = wet)
    pub mix: f32,
    /// Phase randomization seed (whisperization only)
    pub seed: Option<u32>,
}

impl Default for GrainParams {
    fn default() -> Self {
        Self {
            hop_size: None,
            mix: 1.0,
            seed: None,
        }
    }
}

impl Validate for GrainParams {
    fn validate(&self) -> DspResult<()> {
        ensure_finite("mix", self.mix)?;
        if self.hop_size == Some(0) {
            return Err(DspError::InvalidParam("hop_size must be non-zero".into()));
        }
        Ok(())
    }
}

// ============ Crosstalk Cancellation ============

/// Crosstalk canceller settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrosstalkParams {
    /// Loudspeaker angle in degrees
    pub speaker_angle_deg: f32,
    /// Tikhonov regularization factor
    pub regularization: f32,
}

impl Default for CrosstalkParams {
    fn default() -> Self {
        Self {
            speaker_angle_deg: 10.0,
            regularization: 1e-5,
        }
    }
}

impl Validate for CrosstalkParams {
    fn validate(&self) -> DspResult<()> {
        ensure_finite("speaker_angle_deg", self.speaker_angle_deg)?;
        ensure_finite("regularization", self.regularization)?;
        if self.regularization < 0.0 {
            return Err(DspError::InvalidParam(format!(
                "regularization must not be negative, got {}",
                self.regularization
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_params_clamp() {
        let params = PitchShiftParams { pitch_ratio: 3.0 };
        assert_eq!(params.clamped_ratio(), 2.0);
        let params = PitchShiftParams { pitch_ratio: 0.3 };
        assert_eq!(params.clamped_ratio(), 0.5);
    }

    #[test]
    fn test_pitch_params_from_json() {
        let params: PitchShiftParams = from_json(r#"{ "pitch_ratio": 1.5 }"#).unwrap();
        assert_eq!(params.pitch_ratio, 1.5);

        // Missing fields take defaults
        let params: PitchShiftParams = from_json("{}").unwrap();
        assert_eq!(params, PitchShiftParams::default());

        assert!(from_json::<PitchShiftParams>(r#"{ "pitch_ratio": -1.0 }"#).is_err());
    }

    #[test]
    fn test_filter_shape_tagged() {
        let shape: FilterShape =
            from_json(r#"{ "type": "bandpass", "center_hz": 1000.0, "damping": 0.002 }"#).unwrap();
        assert_eq!(
            shape,
            FilterShape::Bandpass {
                center_hz: 1000.0,
                damping: 0.002
            }
        );

        let shape: FilterShape = from_json(r#"{ "type": "identity" }"#).unwrap();
        assert_eq!(shape, FilterShape::Identity);

        assert!(from_json::<FilterShape>(r#"{ "type": "lowpass", "cutoff_hz": 0.0 }"#).is_err());
        assert!(
            from_json::<FilterShape>(r#"{ "type": "bandpass", "center_hz": 500.0, "damping": -1.0 }"#)
                .is_err()
        );
    }

    #[test]
    fn test_grain_params_validation() {
        let params: GrainParams = from_json(r#"{ "hop_size": 128, "mix": 0.5, "seed": 7 }"#).unwrap();
        assert_eq!(params.hop_size, Some(128));
        assert_eq!(params.seed, Some(7));

        assert!(from_json::<GrainParams>(r#"{ "hop_size": 0 }"#).is_err());
    }

    #[test]
    fn test_crosstalk_params() {
        let params = CrosstalkParams::default();
        assert!(params.validate().is_ok());

        let bad = CrosstalkParams {
            regularization: -1e-3,
            ..params
        };
        assert!(matches!(bad.validate(), Err(DspError::InvalidParam(_))));
    }

    #[test]
    fn test_malformed_json() {
        let err = from_json::<CrosstalkParams>("{ not json").unwrap_err();
        assert!(matches!(err, DspError::Serialization(_)));
    }

    #[test]
    fn test_json_round_trip_preserves_shape() {
        let shape = FilterShape::Highpass { cutoff_hz: 2000.0 };
        let json = to_json(&shape).unwrap();
        assert!(json.contains("highpass"));
        let back: FilterShape = from_json(&json).unwrap();
        assert_eq!(back, shape);
    }
}
