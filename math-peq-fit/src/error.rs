//! Error types for the peaking-filter fitting pipeline.
//!
//! Input and configuration problems are detected before any optimizer runs
//! and are reported through [`FitError`].

use math_audio_optimizers::OptimError;
use thiserror::Error;

/// Errors that can occur while preparing or running a fit.
#[derive(Debug, Error)]
pub enum FitError {
    /// Curve has fewer than two samples.
    #[error("response curve needs at least 2 samples, got {len}")]
    CurveTooShort {
        /// Number of samples provided
        len: usize,
    },

    /// Frequency and gain arrays differ in length.
    #[error("length mismatch: {freq_len} frequencies, {gain_len} gains")]
    LengthMismatch {
        /// Length of the frequency array
        freq_len: usize,
        /// Length of the gain array
        gain_len: usize,
    },

    /// Frequencies are not strictly ascending.
    #[error("frequencies must be strictly ascending: f[{index}] = {freq} Hz follows {previous} Hz")]
    NonAscendingFrequency {
        /// Index of the offending sample
        index: usize,
        /// Offending frequency
        freq: f64,
        /// Frequency of the previous sample
        previous: f64,
    },

    /// A frequency is below 0 Hz.
    #[error("negative frequency at index {index}: {freq} Hz")]
    NegativeFrequency {
        /// Index of the offending sample
        index: usize,
        /// Offending frequency
        freq: f64,
    },

    /// A frequency or gain sample is NaN or infinite.
    #[error("non-finite sample at index {index}")]
    NonFiniteSample {
        /// Index of the offending sample
        index: usize,
    },

    /// Perceptual-grid conversion left no band at or above the trim frequency.
    #[error("perceptual grid has no band at or above {min_freq} Hz")]
    EmptyPerceptualGrid {
        /// Lowest frequency kept by the trim
        min_freq: f64,
    },

    /// A bound range is empty, reversed or non-finite.
    #[error("invalid {name} range: [{low}, {high}]")]
    InvalidRange {
        /// Which range
        name: &'static str,
        /// Lower end
        low: f64,
        /// Upper end
        high: f64,
    },

    /// Sample rate is not a positive finite number.
    #[error("invalid sample rate: {sample_rate} Hz (must be > 0)")]
    InvalidSampleRate {
        /// The invalid sample rate
        sample_rate: f64,
    },

    /// Upper frequency bound is at or above Nyquist.
    #[error("frequency bound {freq} Hz is not below Nyquist ({nyquist} Hz)")]
    FrequencyAboveNyquist {
        /// The offending bound
        freq: f64,
        /// Half the sample rate
        nyquist: f64,
    },

    /// Auditory band growth ratio must be finite and > 1.
    #[error("invalid average bandwidth ratio: {ratio} (must be > 1)")]
    InvalidBandwidthRatio {
        /// The invalid ratio
        ratio: f64,
    },

    /// A probability-like option is outside [0, 1].
    #[error("{name} must be in [0, 1], got {value}")]
    InvalidProbability {
        /// Option name
        name: &'static str,
        /// The rejected value
        value: f64,
    },

    /// An algorithm tuning knob is outside its valid range.
    #[error("{name} must be {requirement}, got {value}")]
    InvalidParameter {
        /// Option name
        name: &'static str,
        /// The rejected value
        value: f64,
        /// The accepted range, in words
        requirement: &'static str,
    },

    /// Model complexity must be a positive percentage.
    #[error("invalid model complexity: {percent}% (must be > 0)")]
    InvalidComplexity {
        /// The rejected percentage
        percent: f64,
    },

    /// Population (K x N) is too small for the selected algorithm.
    #[error("population of {size} is too small for {algorithm} (needs {min})")]
    PopulationTooSmall {
        /// K x N
        size: usize,
        /// Minimum for the algorithm
        min: usize,
        /// Algorithm name
        algorithm: &'static str,
    },

    /// The run would use zero filters.
    #[error("no bands to fit: {reason}")]
    ZeroBands {
        /// Why the count is zero
        reason: &'static str,
    },

    /// Error reading a curve or config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed line in a curve file.
    #[error("parse error on line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },

    /// Malformed JSON configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error raised by an optimizer back-end.
    #[error(transparent)]
    Optimizer(#[from] OptimError),
}

impl FitError {
    /// Returns `true` if the error is about the input curve.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            FitError::CurveTooShort { .. }
                | FitError::LengthMismatch { .. }
                | FitError::NonAscendingFrequency { .. }
                | FitError::NegativeFrequency { .. }
                | FitError::NonFiniteSample { .. }
                | FitError::EmptyPerceptualGrid { .. }
                | FitError::Parse { .. }
        )
    }

    /// Returns `true` if the error is about the fit options.
    pub fn is_config_error(&self) -> bool {
        match self {
            FitError::InvalidRange { .. }
            | FitError::InvalidSampleRate { .. }
            | FitError::FrequencyAboveNyquist { .. }
            | FitError::InvalidBandwidthRatio { .. }
            | FitError::InvalidProbability { .. }
            | FitError::InvalidParameter { .. }
            | FitError::InvalidComplexity { .. }
            | FitError::PopulationTooSmall { .. }
            | FitError::ZeroBands { .. }
            | FitError::Json(_) => true,
            FitError::Optimizer(e) => e.is_config_error() || e.is_bounds_error(),
            _ => false,
        }
    }
}

/// A specialized `Result` type for fitting operations.
pub type Result<T> = std::result::Result<T, FitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FitError::CurveTooShort { len: 1 };
        assert_eq!(
            err.to_string(),
            "response curve needs at least 2 samples, got 1"
        );

        let err = FitError::FrequencyAboveNyquist {
            freq: 30000.0,
            nyquist: 22050.0,
        };
        assert!(err.to_string().contains("Nyquist"));
    }

    #[test]
    fn test_error_classification() {
        assert!(FitError::LengthMismatch { freq_len: 2, gain_len: 3 }.is_input_error());
        assert!(!FitError::LengthMismatch { freq_len: 2, gain_len: 3 }.is_config_error());
        assert!(FitError::ZeroBands { reason: "test" }.is_config_error());
        let knob = FitError::InvalidParameter {
            name: "chio_max_age",
            value: 0.0,
            requirement: ">= 1",
        };
        assert!(knob.is_config_error());
        assert_eq!(knob.to_string(), "chio_max_age must be >= 1, got 0");
        let optim = FitError::from(OptimError::InvalidParameter {
            name: "step",
            value: 0.0,
        });
        assert!(optim.is_config_error());
        assert!(!optim.is_input_error());
    }
}
