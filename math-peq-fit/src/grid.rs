//! Frequency-grid classification and perceptual-grid conversion.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::auditory::{auditory_bands, band_centres, band_means};
use crate::curve::ResponseCurve;
use crate::error::{FitError, Result};
use crate::interpolation::interp_clamped;

/// Mean deviation from an ideal linear grid, in Hz, below which an axis is
/// considered uniform.
pub const UNIFORM_TOLERANCE_HZ: f64 = 10.0;
/// Minimum length of the dense grid an irregular axis is resampled onto.
pub const MIN_DENSE_LEN: usize = 8192;
/// Perceptual bands below this frequency are dropped.
pub const TRIM_FREQ_HZ: f64 = 18.0;

/// Shape of a frequency axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridKind {
    /// Evenly spaced (within [`UNIFORM_TOLERANCE_HZ`]).
    Uniform,
    /// Anything else, typically logarithmic.
    Irregular,
}

/// Classifies a strictly ascending axis of at least two samples.
pub fn classify(freq: &Array1<f64>) -> GridKind {
    let n = freq.len();
    if n < 2 {
        return GridKind::Uniform;
    }
    let first = freq[0];
    let step = (freq[n - 1] - first) / (n - 1) as f64;
    let residue = freq
        .iter()
        .enumerate()
        .map(|(i, &f)| (first + i as f64 * step - f).abs())
        .sum::<f64>()
        / n as f64;
    if residue > UNIFORM_TOLERANCE_HZ {
        GridKind::Irregular
    } else {
        GridKind::Uniform
    }
}

/// Settings for [`normalize`].
#[derive(Debug, Clone, Copy)]
pub struct GridOptions {
    /// Negate every gain before anything else.
    pub invert: bool,
    /// Resample onto the perceptual grid.
    pub convert: bool,
    /// Auditory band growth ratio, > 1.
    pub avg_bandwidth: f64,
    /// Sample rate in Hz, used for the dense grid of irregular input.
    pub sample_rate: f64,
}

/// The working curve produced by [`normalize`].
#[derive(Debug, Clone)]
pub struct NormalizedGrid {
    /// Curve the rest of the pipeline fits.
    pub curve: ResponseCurve,
    /// Classification of the input axis. Advisory only.
    pub kind: GridKind,
}

/// Builds the dense linear grid the auditory bands are laid over.
fn dense_grid(curve: &ResponseCurve, kind: GridKind, sample_rate: f64) -> (Vec<f64>, Vec<f64>) {
    match kind {
        GridKind::Uniform => (curve.freq().to_vec(), curve.gain().to_vec()),
        GridKind::Irregular => {
            let len = curve.len().max(MIN_DENSE_LEN);
            let nyquist = sample_rate / 2.0;
            (0..len)
                .map(|i| {
                    let f = i as f64 / len as f64 * nyquist;
                    (f, interp_clamped(f, curve.freq(), curve.gain()))
                })
                .unzip()
        }
    }
}

/// Produces the working curve for a fit.
///
/// Gains are negated first if `opts.invert` is set. Without conversion the
/// curve is otherwise returned unchanged. With conversion the curve is laid
/// over a dense linear grid (the input itself when uniform, else
/// `max(len, 8192)` points from 0 to Nyquist), averaged over auditory bands,
/// and bands whose frequency is below 18 Hz are dropped.
///
/// # Errors
///
/// [`FitError::EmptyPerceptualGrid`] if no band lies at or above 18 Hz, and
/// the validation errors of [`ResponseCurve::new`] if the perceptual grid is
/// shorter than two samples.
pub fn normalize(curve: &ResponseCurve, opts: &GridOptions) -> Result<NormalizedGrid> {
    let kind = classify(curve.freq());
    let working = if opts.invert {
        curve.inverted()
    } else {
        curve.clone()
    };
    log::info!(
        "Input grid: {} samples, {:?}, conversion {}",
        curve.len(),
        kind,
        if opts.convert { "on" } else { "off" }
    );
    if !opts.convert {
        return Ok(NormalizedGrid {
            curve: working,
            kind,
        });
    }

    let (dense_freq, dense_gain) = dense_grid(&working, kind, opts.sample_rate);
    let bands = auditory_bands(dense_freq.len(), opts.avg_bandwidth);
    let centres = band_centres(&dense_freq, &bands);
    let means = band_means(&dense_gain, &bands);

    let first = centres
        .iter()
        .position(|&f| f >= TRIM_FREQ_HZ)
        .ok_or(FitError::EmptyPerceptualGrid {
            min_freq: TRIM_FREQ_HZ,
        })?;
    let freq: Array1<f64> = centres[first..].iter().copied().collect();
    let gain: Array1<f64> = means[first..].iter().copied().collect();
    log::debug!(
        "Perceptual grid: dense {} -> {} bands, {} trimmed below {} Hz",
        dense_freq.len(),
        bands.len(),
        first,
        TRIM_FREQ_HZ
    );

    Ok(NormalizedGrid {
        curve: ResponseCurve::new(freq, gain)?,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn opts(convert: bool) -> GridOptions {
        GridOptions {
            invert: false,
            convert,
            avg_bandwidth: 1.005,
            sample_rate: 44100.0,
        }
    }

    fn log_curve(n: usize) -> ResponseCurve {
        let freq: Array1<f64> = (0..n)
            .map(|i| 20.0 * 1000f64.powf(i as f64 / (n - 1) as f64))
            .collect();
        let gain = freq.mapv(|f: f64| (f.log10() * 3.0).sin());
        ResponseCurve::new(freq, gain).unwrap()
    }

    #[test]
    fn test_classify() {
        let lin = Array1::linspace(0.0, 22050.0, 512);
        assert_eq!(classify(&lin), GridKind::Uniform);
        assert_eq!(classify(log_curve(200).freq()), GridKind::Irregular);
    }

    #[test]
    fn test_identity_without_conversion() {
        let curve = log_curve(100);
        let out = normalize(&curve, &opts(false)).unwrap();
        assert_eq!(out.curve, curve);
        assert_eq!(out.kind, GridKind::Irregular);
    }

    #[test]
    fn test_invert() {
        let curve = log_curve(50);
        let out = normalize(
            &curve,
            &GridOptions {
                invert: true,
                ..opts(false)
            },
        )
        .unwrap();
        assert_eq!(out.curve.gain(), &-curve.gain());
    }

    #[test]
    fn test_uniform_conversion_shrinks_and_trims() {
        let len = 2048;
        let freq = Array1::linspace(0.0, 22050.0, len);
        let gain = freq.mapv(|f: f64| if f > 900.0 && f < 1100.0 { 6.0 } else { 0.0 });
        let curve = ResponseCurve::new(freq, gain).unwrap();
        let out = normalize(&curve, &opts(true)).unwrap();
        assert_eq!(out.kind, GridKind::Uniform);
        assert!(out.curve.len() <= len);
        assert!(out.curve.freq()[0] >= TRIM_FREQ_HZ);
        let peak = out.curve.gain().iter().cloned().fold(f64::MIN, f64::max);
        assert!(peak > 5.0);
    }

    #[test]
    fn test_uniform_axis_matches_nyquist_relabelling() {
        // An FFT-style axis: bin i at i / len of Nyquist, last bin short of it.
        let len = MIN_DENSE_LEN;
        let nyquist = 22050.0;
        let relabelled: Array1<f64> = (0..len)
            .map(|i| i as f64 / len as f64 * nyquist)
            .collect();
        let gain = relabelled.mapv(|f: f64| 4.0 * (-((f - 1000.0) / 300.0).powi(2)).exp());
        let curve = ResponseCurve::new(relabelled.clone(), gain.clone()).unwrap();
        assert_eq!(classify(curve.freq()), GridKind::Uniform);

        let (freq, dense) = dense_grid(&curve, GridKind::Uniform, 2.0 * nyquist);
        assert_eq!(freq, relabelled.to_vec());
        assert_eq!(dense, gain.to_vec());

        // Resampling onto 0..Nyquist lands on the same points and gains.
        let (freq_r, dense_r) = dense_grid(&curve, GridKind::Irregular, 2.0 * nyquist);
        assert_eq!(freq_r, freq);
        for (a, b) in dense_r.iter().zip(&dense) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
        }

        let out = normalize(&curve, &opts(true)).unwrap();
        let bands = auditory_bands(len, 1.005);
        let centres = band_centres(&freq_r, &bands);
        let kept: Vec<f64> = centres.into_iter().filter(|&f| f >= TRIM_FREQ_HZ).collect();
        assert_eq!(out.curve.len(), kept.len());
        for (a, b) in out.curve.freq().iter().zip(&kept) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_irregular_conversion_holds_edges() {
        let freq = Array1::from(vec![100.0, 200.0, 1000.0, 5000.0, 10000.0]);
        let gain = Array1::from(vec![3.0, 3.0, -2.0, 1.0, 1.0]);
        let curve = ResponseCurve::new(freq, gain).unwrap();
        let out = normalize(&curve, &opts(true)).unwrap();
        assert_eq!(out.kind, GridKind::Irregular);
        assert!(out.curve.freq()[0] >= TRIM_FREQ_HZ);
        assert!(out.curve.gain().iter().all(|&g| (-2.0..=3.0).contains(&g)));
        let last = out.curve.len() - 1;
        assert_abs_diff_eq!(out.curve.gain()[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.curve.gain()[last], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_nothing_above_trim_frequency() {
        let freq = Array1::linspace(0.0, 10.0, 64);
        let curve = ResponseCurve::new(freq, Array1::zeros(64)).unwrap();
        let err = normalize(&curve, &opts(true)).unwrap_err();
        assert!(matches!(err, FitError::EmptyPerceptualGrid { .. }));
    }
}
