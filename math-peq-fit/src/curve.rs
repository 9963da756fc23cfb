//! Validated frequency-response curves.

use std::path::Path;

use ndarray::Array1;
use serde::Serialize;

use crate::error::{FitError, Result};

/// An ordered sequence of (frequency in Hz, gain in dB) samples.
///
/// Frequencies are finite, non-negative and strictly ascending; gains are
/// finite; there are at least two samples. A curve is never modified in
/// place: preprocessing produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseCurve {
    freq: Array1<f64>,
    gain: Array1<f64>,
}

impl ResponseCurve {
    /// Validates and wraps a frequency axis and its gains.
    ///
    /// # Errors
    ///
    /// Returns an input error ([`FitError::is_input_error`]) if the arrays
    /// differ in length, hold fewer than two samples, contain NaN or infinite
    /// values, a negative frequency, or frequencies that do not strictly
    /// increase.
    pub fn new(freq: Array1<f64>, gain: Array1<f64>) -> Result<Self> {
        if freq.len() != gain.len() {
            return Err(FitError::LengthMismatch {
                freq_len: freq.len(),
                gain_len: gain.len(),
            });
        }
        if freq.len() < 2 {
            return Err(FitError::CurveTooShort { len: freq.len() });
        }
        for (index, (&f, &g)) in freq.iter().zip(gain.iter()).enumerate() {
            if !f.is_finite() || !g.is_finite() {
                return Err(FitError::NonFiniteSample { index });
            }
            if f < 0.0 {
                return Err(FitError::NegativeFrequency { index, freq: f });
            }
            if index > 0 && f <= freq[index - 1] {
                return Err(FitError::NonAscendingFrequency {
                    index,
                    freq: f,
                    previous: freq[index - 1],
                });
            }
        }
        Ok(Self { freq, gain })
    }

    /// Builds a curve from `(frequency, gain)` pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self> {
        let freq = pairs.iter().map(|p| p.0).collect();
        let gain = pairs.iter().map(|p| p.1).collect();
        Self::new(freq, gain)
    }

    /// Parses a two-column text curve.
    ///
    /// Columns may be separated by commas, semicolons or whitespace. Blank
    /// lines and lines starting with `#` or `*` are skipped, as is a leading
    /// header line whose first field is not a number. Extra columns are
    /// ignored.
    pub fn parse_text(text: &str) -> Result<Self> {
        let mut pairs = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('*') {
                continue;
            }
            let mut fields = line
                .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                .filter(|s| !s.is_empty());
            let (Some(f), Some(g)) = (fields.next(), fields.next()) else {
                return Err(FitError::Parse {
                    line: i + 1,
                    message: "expected two columns".into(),
                });
            };
            let parsed = (f.parse::<f64>(), g.parse::<f64>());
            match parsed {
                (Ok(f), Ok(g)) => pairs.push((f, g)),
                _ if pairs.is_empty() && f.parse::<f64>().is_err() => {
                    log::debug!("skipping header line {}: {}", i + 1, line);
                }
                _ => {
                    return Err(FitError::Parse {
                        line: i + 1,
                        message: format!("cannot parse '{}'", line),
                    });
                }
            }
        }
        Self::from_pairs(&pairs)
    }

    /// Reads a two-column text or CSV curve file.
    pub fn read_text<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_text(&text)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.freq.len()
    }

    /// Always `false`: a valid curve has at least two samples.
    pub fn is_empty(&self) -> bool {
        self.freq.is_empty()
    }

    /// Frequencies in Hz.
    pub fn freq(&self) -> &Array1<f64> {
        &self.freq
    }

    /// Gains in dB.
    pub fn gain(&self) -> &Array1<f64> {
        &self.gain
    }

    /// The same curve with every gain negated.
    pub fn inverted(&self) -> Self {
        Self {
            freq: self.freq.clone(),
            gain: -&self.gain,
        }
    }

    /// Splits the curve into its frequency and gain arrays.
    pub fn into_parts(self) -> (Array1<f64>, Array1<f64>) {
        (self.freq, self.gain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_validation() {
        assert!(ResponseCurve::new(array![1.0, 2.0], array![0.0, 0.0]).is_ok());

        let err = ResponseCurve::new(array![1.0], array![0.0]).unwrap_err();
        assert!(matches!(err, FitError::CurveTooShort { len: 1 }));

        let err = ResponseCurve::new(array![1.0, 2.0], array![0.0]).unwrap_err();
        assert!(matches!(err, FitError::LengthMismatch { .. }));

        let err = ResponseCurve::new(array![1.0, 1.0], array![0.0, 0.0]).unwrap_err();
        assert!(matches!(err, FitError::NonAscendingFrequency { index: 1, .. }));

        let err = ResponseCurve::new(array![1.0, f64::NAN], array![0.0, 0.0]).unwrap_err();
        assert!(matches!(err, FitError::NonFiniteSample { index: 1 }));

        let err = ResponseCurve::new(array![-1.0, 2.0], array![0.0, 0.0]).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_parse_text_separators_and_comments() {
        let text = "* measurement\nFreq,SPL\n20, 1.5\n# note\n100;2.0\n1000\t-3.0 extra\n\n";
        let curve = ResponseCurve::parse_text(text).unwrap();
        assert_eq!(curve.freq(), &array![20.0, 100.0, 1000.0]);
        assert_eq!(curve.gain(), &array![1.5, 2.0, -3.0]);
    }

    #[test]
    fn test_parse_text_errors() {
        let err = ResponseCurve::parse_text("20 1\n40 x\n").unwrap_err();
        assert!(matches!(err, FitError::Parse { line: 2, .. }));

        let err = ResponseCurve::parse_text("20\n").unwrap_err();
        assert!(matches!(err, FitError::Parse { line: 1, .. }));

        let err = ResponseCurve::parse_text("# only a comment\n").unwrap_err();
        assert!(matches!(err, FitError::CurveTooShort { len: 0 }));
    }

    #[test]
    fn test_inverted() {
        let curve = ResponseCurve::new(array![10.0, 20.0], array![3.0, -1.0]).unwrap();
        let inv = curve.inverted();
        assert_eq!(inv.gain(), &array![-3.0, 1.0]);
        assert_eq!(inv.freq(), curve.freq());
    }
}
