//! Local maxima and minima detection.

use ndarray::Array1;

/// Threshold, in dB, a curve must move away from an extremum before it counts.
pub const EXTREMA_THRESHOLD_DB: f64 = 0.1;

/// Indices of the local maxima and minima of a curve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extrema {
    /// Indices of local maxima, ascending.
    pub maxima: Vec<usize>,
    /// Indices of local minima, ascending.
    pub minima: Vec<usize>,
}

impl Extrema {
    /// Total number of extrema.
    pub fn count(&self) -> usize {
        self.maxima.len() + self.minima.len()
    }
}

/// Alternating-threshold peak detector.
///
/// A running maximum is accepted once the curve falls more than `threshold`
/// below it, after which the detector tracks the running minimum until the
/// curve rises more than `threshold` above it, and so on. An extremum is
/// only confirmed by a later sample, so the last index is never reported; a
/// running extremum at the first index is dropped.
pub fn find_extrema(values: &Array1<f64>, threshold: f64) -> Extrema {
    let n = values.len();
    let mut out = Extrema::default();
    if n < 3 {
        return out;
    }

    let mut mx = f64::NEG_INFINITY;
    let mut mn = f64::INFINITY;
    let mut mx_pos = 0;
    let mut mn_pos = 0;
    let mut look_for_max = true;

    for (i, &v) in values.iter().enumerate() {
        if v > mx {
            mx = v;
            mx_pos = i;
        }
        if v < mn {
            mn = v;
            mn_pos = i;
        }
        if look_for_max {
            if v < mx - threshold {
                if mx_pos != 0 {
                    out.maxima.push(mx_pos);
                }
                mn = v;
                mn_pos = i;
                look_for_max = false;
            }
        } else if v > mn + threshold {
            if mn_pos != 0 {
                out.minima.push(mn_pos);
            }
            mx = v;
            mx_pos = i;
            look_for_max = true;
        }
    }

    out
}
