//! Mean-squared-error objective over a bank of peaking filters.

use ndarray::{Array1, ArrayView1, s};

use crate::biquad::{Coefficients, DeflatedBiquad, phi};
use crate::curve::ResponseCurve;

/// Scores a flattened parameter vector against a target curve.
///
/// The vector holds `num_bands` log10 centre frequencies, then as many Q
/// values, then as many gains in dB. The context is read-only, so the cost
/// can be evaluated from several threads at once.
#[derive(Debug, Clone)]
pub struct PeakingCost {
    phi: Array1<f64>,
    target: Array1<f64>,
    sample_rate: f64,
    num_bands: usize,
}

impl PeakingCost {
    /// Precomputes the per-frequency phase term for `curve`.
    pub fn new(curve: &ResponseCurve, sample_rate: f64, num_bands: usize) -> Self {
        Self {
            phi: curve.freq().mapv(|f| phi(f, sample_rate)),
            target: curve.gain().clone(),
            sample_rate,
            num_bands,
        }
    }

    /// Number of bands per parameter vector.
    pub fn num_bands(&self) -> usize {
        self.num_bands
    }

    /// Length of a parameter vector.
    pub fn dim(&self) -> usize {
        3 * self.num_bands
    }

    fn band_coefficients<'a>(
        &'a self,
        x: ArrayView1<'a, f64>,
    ) -> impl Iterator<Item = Coefficients> + 'a {
        let n = self.num_bands;
        (0..n).map(move |i| {
            let freq = 10.0_f64.powf(x[i]);
            Coefficients::peaking(x[2 * n + i], freq, x[n + i], self.sample_rate)
        })
    }

    /// Combined response in dB of the bands in `x`, on the working grid.
    pub fn response(&self, x: &Array1<f64>) -> Array1<f64> {
        let mut acc = Array1::zeros(self.phi.len());
        for c in self.band_coefficients(x.view()) {
            acc.zip_mut_with(&self.phi, |r, &p| *r += c.magnitude_db_at_phi(p));
        }
        acc
    }

    /// Mean squared error between the response of `x` and the target.
    pub fn evaluate(&self, x: &Array1<f64>) -> f64 {
        let response = self.response(x);
        let sum: f64 = response
            .iter()
            .zip(self.target.iter())
            .map(|(r, t)| (r - t) * (r - t))
            .sum();
        sum / self.target.len() as f64
    }

    /// Converts a parameter vector into result descriptors, one per band.
    pub fn to_bands(&self, x: &Array1<f64>) -> Vec<DeflatedBiquad> {
        let n = self.num_bands;
        let fc = x.slice(s![..n]);
        let q = x.slice(s![n..2 * n]);
        let gain = x.slice(s![2 * n..]);
        (0..n)
            .map(|i| DeflatedBiquad::from_params(fc[i], q[i], gain[i], self.sample_rate))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, array};

    fn grid(target: Array1<f64>) -> ResponseCurve {
        let n = target.len();
        let freq = Array1::from_shape_fn(n, |i| 20.0 * 1000f64.powf(i as f64 / (n - 1) as f64));
        ResponseCurve::new(freq, target).unwrap()
    }

    #[test]
    fn test_zero_target_zero_gain_is_exactly_zero() {
        let cost = PeakingCost::new(&grid(Array1::zeros(64)), 44100.0, 3);
        let x = array![2.0, 3.0, 4.0, 0.7, 1.0, 5.0, 0.0, 0.0, 0.0];
        assert_eq!(cost.evaluate(&x), 0.0);
    }

    #[test]
    fn test_cost_is_mse() {
        let cost = PeakingCost::new(&grid(Array1::from_elem(10, 2.0)), 44100.0, 1);
        let x = array![3.0, 1.0, 0.0];
        assert_abs_diff_eq!(cost.evaluate(&x), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_response_sums_bands() {
        let curve = grid(Array1::zeros(32));
        let one = PeakingCost::new(&curve, 44100.0, 1);
        let two = PeakingCost::new(&curve, 44100.0, 2);
        let a = array![2.5, 1.0, 3.0];
        let b = array![3.5, 2.0, -2.0];
        let both = array![2.5, 3.5, 1.0, 2.0, 3.0, -2.0];
        let sum = one.response(&a) + one.response(&b);
        for (x, y) in two.response(&both).iter().zip(sum.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_to_bands_layout() {
        let cost = PeakingCost::new(&grid(Array1::zeros(8)), 44100.0, 2);
        let bands = cost.to_bands(&array![2.0, 3.0, 1.0, 2.0, -3.0, 6.0]);
        assert_eq!(bands.len(), 2);
        assert_abs_diff_eq!(bands[0].freq, 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bands[1].freq, 1000.0, epsilon = 1e-9);
        assert_eq!(bands[0].gain, -3.0);
        assert_eq!(bands[1].gain, 6.0);
        assert_abs_diff_eq!(bands[1].q(44100.0), 2.0, epsilon = 1e-9);
    }
}
