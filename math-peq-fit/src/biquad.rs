//! Peaking biquad coefficients, magnitude response and result descriptors.

use std::f64::consts::{LN_2, PI};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Filter shapes a fit can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Peaking (bell) filter
    Peaking,
}

impl FilterType {
    /// Returns the short string representation of the filter type (e.g., "PK").
    pub fn short_name(&self) -> &'static str {
        match self {
            FilterType::Peaking => "PK",
        }
    }
}

/// Normalized second-order section, `a0 == 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    /// Feed-forward coefficients
    pub b0: f64,
    /// Feed-forward coefficients
    pub b1: f64,
    /// Feed-forward coefficients
    pub b2: f64,
    /// Feedback coefficients
    pub a1: f64,
    /// Feedback coefficients
    pub a2: f64,
}

impl Coefficients {
    /// RBJ cookbook peaking filter.
    pub fn peaking(gain_db: f64, freq: f64, q: f64, srate: f64) -> Self {
        let a = 10.0_f64.powf(gain_db / 40.0);
        let omega = 2.0 * PI * freq / srate;
        let sn = omega.sin();
        let cs = omega.cos();
        let alpha = sn / (2.0 * q);

        let a0 = 1.0 + alpha / a;
        Self {
            b0: (1.0 + alpha * a) / a0,
            b1: -2.0 * cs / a0,
            b2: (1.0 - alpha * a) / a0,
            a1: -2.0 * cs / a0,
            a2: (1.0 - alpha / a) / a0,
        }
    }

    /// Magnitude response in dB at a precomputed `phi = 4 sin^2(pi f / fs)`.
    ///
    /// Numerator and denominator go through the same polynomial, so a filter
    /// with `b == a` is exactly 0 dB.
    pub fn magnitude_db_at_phi(&self, phi: f64) -> f64 {
        let num = power_poly(self.b0, self.b1, self.b2, phi);
        let den = power_poly(1.0, self.a1, self.a2, phi);
        10.0 * num.max(f64::MIN_POSITIVE).log10() - 10.0 * den.max(f64::MIN_POSITIVE).log10()
    }

    /// Magnitude response in dB at `freq` Hz.
    pub fn magnitude_db(&self, freq: f64, srate: f64) -> f64 {
        self.magnitude_db_at_phi(phi(freq, srate))
    }
}

/// `|p0 + p1 z^-1 + p2 z^-2|^2` on the unit circle, as a polynomial in `phi`.
fn power_poly(p0: f64, p1: f64, p2: f64, phi: f64) -> f64 {
    let s = p0 + p1 + p2;
    s * s + (p0 * p2 * phi - (p1 * (p0 + p2) + 4.0 * p0 * p2)) * phi
}

/// `4 sin^2(pi f / fs)`, the per-frequency term of [`Coefficients::magnitude_db_at_phi`].
pub fn phi(freq: f64, srate: f64) -> f64 {
    let s = (PI * freq / srate).sin();
    4.0 * s * s
}

/// Bandwidth measure of a peaking filter from its Q.
///
/// `asinh(1 / 2Q) * sin(w) / (ln2 / 2 * w)` with `w = 2 pi f / fs`; positive
/// and finite for `Q > 0` and `0 < f < fs / 2`.
pub fn bandwidth(q: f64, freq: f64, srate: f64) -> f64 {
    let omega = 2.0 * PI * freq / srate;
    (1.0 / (2.0 * q)).asinh() * omega.sin() / (LN_2 / 2.0 * omega)
}

/// Inverse of [`bandwidth`].
pub fn bandwidth_to_q(bw: f64, freq: f64, srate: f64) -> f64 {
    let omega = 2.0 * PI * freq / srate;
    1.0 / (2.0 * (bw * LN_2 / 2.0 * omega / omega.sin()).sinh())
}

/// A fitted filter band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeflatedBiquad {
    /// Filter shape
    pub filter_type: FilterType,
    /// Centre frequency in Hz
    pub freq: f64,
    /// Bandwidth measure, see [`bandwidth`]
    pub bandwidth: f64,
    /// Gain in dB
    pub gain: f64,
}

impl DeflatedBiquad {
    /// Peaking band from optimizer parameters (`log10` frequency, Q, gain).
    pub fn from_params(log_freq: f64, q: f64, gain: f64, srate: f64) -> Self {
        let freq = 10.0_f64.powf(log_freq);
        Self {
            filter_type: FilterType::Peaking,
            freq,
            bandwidth: bandwidth(q, freq, srate),
            gain,
        }
    }

    /// Q recovered from the bandwidth.
    pub fn q(&self, srate: f64) -> f64 {
        bandwidth_to_q(self.bandwidth, self.freq, srate)
    }

    /// Rebuilds the filter coefficients at `srate`.
    pub fn to_biquad(&self, srate: f64) -> Coefficients {
        Coefficients::peaking(self.gain, self.freq, self.q(srate), srate)
    }
}

impl fmt::Display for DeflatedBiquad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Type:{},Freq:{:.1},BW:{:.3},Gain:{:.2}",
            self.filter_type.short_name(),
            self.freq,
            self.bandwidth,
            self.gain
        )
    }
}
