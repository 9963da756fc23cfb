//! Initial band count, seeds and starting population.

use math_audio_optimizers::Bounds;
use math_audio_optimizers::density::standard_normal;
use ndarray::{Array1, Array2};
use rand::Rng;

use crate::config::FitOptions;
use crate::curve::ResponseCurve;
use crate::error::{FitError, Result};
use crate::extrema::{EXTREMA_THRESHOLD_DB, find_extrema};
use crate::interpolation::windowed_gain;

/// Seeds closer than this, in Hz, are redrawn.
pub const MIN_SPACING_HZ: f64 = 20.0;
/// Maximum number of spacing redraws.
pub const MAX_SPACING_REPAIRS: usize = 50;
/// Range redrawn seeds are taken from, in Hz.
pub const REDRAW_RANGE_HZ: (f64, f64) = (200.0, 14000.0);

const Q_MIN_SEED: f64 = 0.7;
const Q_MAX_SEED: f64 = 5.0;

/// Half-widths of the uniform noise added to each seed per population member.
const JITTER_LOG_FREQ: f64 = std::f64::consts::LOG10_2;
const JITTER_Q: f64 = 0.5;
const JITTER_GAIN_DB: f64 = 1.5;

fn jitter<R: Rng + ?Sized>(half_width: f64, rng: &mut R) -> f64 {
    (2.0 * rng.random::<f64>() - 1.0) * half_width
}

/// Band count after applying the model complexity percentage.
pub fn scaled_band_count(raw: usize, complexity_percent: f64) -> usize {
    (raw as f64 * complexity_percent / 100.0).round() as usize
}

/// Index of the lower seed of the closest consecutive pair and its gap.
fn closest_pair(sorted: &[f64]) -> Option<(usize, f64)> {
    sorted
        .windows(2)
        .enumerate()
        .map(|(i, w)| (i, w[1] - w[0]))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Redraws seeds that sit within [`MIN_SPACING_HZ`] of their neighbour.
///
/// `freqs` must be sorted and is kept sorted. Redraws are uniform in
/// [`REDRAW_RANGE_HZ`] intersected with `[low, high]` (the whole of
/// `[low, high]` if the intersection is empty). Returns `true` if the retry
/// budget ran out with a violation left.
pub fn repair_spacing<R: Rng + ?Sized>(
    freqs: &mut [f64],
    low: f64,
    high: f64,
    rng: &mut R,
) -> bool {
    let (mut lo, mut hi) = (REDRAW_RANGE_HZ.0.max(low), REDRAW_RANGE_HZ.1.min(high));
    if lo >= hi {
        (lo, hi) = (low, high);
    }
    let mut repairs = 0;
    while let Some((i, gap)) = closest_pair(freqs) {
        if gap > MIN_SPACING_HZ {
            return false;
        }
        if repairs == MAX_SPACING_REPAIRS {
            return true;
        }
        freqs[i] = lo + rng.random::<f64>() * (hi - lo);
        freqs.sort_by(f64::total_cmp);
        repairs += 1;
    }
    false
}

/// Starting point of a fit: one seed per band plus the parameter bounds.
#[derive(Debug, Clone)]
pub struct InitialGuess {
    /// Seed centre frequencies in Hz, ascending.
    pub freqs: Vec<f64>,
    /// Seed Q values.
    pub qs: Vec<f64>,
    /// Seed gains in dB.
    pub gains: Vec<f64>,
    /// Spacing repair gave up with seeds still too close.
    pub spacing_repair_exhausted: bool,
}

impl InitialGuess {
    /// Derives seeds from the working curve.
    ///
    /// The band count is `options.band_count` if set, else the number of
    /// detected extrema scaled by the model complexity. Frequencies come from
    /// the maxima, then the minima, then uniform draws in the frequency
    /// range; they are sorted, clamped into the range and spread apart.
    ///
    /// # Errors
    ///
    /// [`FitError::ZeroBands`] if the band count comes out as zero.
    pub fn synthesize<R: Rng + ?Sized>(
        curve: &ResponseCurve,
        options: &FitOptions,
        rng: &mut R,
    ) -> Result<Self> {
        let extrema = find_extrema(curve.gain(), EXTREMA_THRESHOLD_DB);
        let raw = extrema.count();
        let num_bands = match options.band_count {
            Some(n) => n,
            None => scaled_band_count(raw, options.model_complexity),
        };
        log::info!(
            "Detected {} maxima and {} minima; fitting {} bands",
            extrema.maxima.len(),
            extrema.minima.len(),
            num_bands
        );
        if num_bands == 0 {
            return Err(FitError::ZeroBands {
                reason: "no extrema detected in the target curve",
            });
        }

        let range = options.frequency_range;
        let curve_freq = curve.freq();
        let mut freqs: Vec<f64> = extrema
            .maxima
            .iter()
            .chain(extrema.minima.iter())
            .take(num_bands)
            .map(|&i| curve_freq[i])
            .collect();
        while freqs.len() < num_bands {
            freqs.push(range.low + rng.random::<f64>() * (range.high - range.low));
        }
        freqs.sort_by(f64::total_cmp);
        for f in freqs.iter_mut() {
            *f = f.clamp(range.low, range.high);
        }

        let exhausted = repair_spacing(&mut freqs, range.low, range.high, rng);
        if exhausted {
            log::warn!(
                "Spacing repair gave up after {} attempts; some seeds are within {} Hz",
                MAX_SPACING_REPAIRS,
                MIN_SPACING_HZ
            );
        }

        let gains = freqs
            .iter()
            .map(|&f| windowed_gain(f, curve_freq, curve.gain()))
            .collect();
        let qs = freqs
            .iter()
            .map(|_| {
                let n = standard_normal(rng).abs() / 3.0;
                Q_MIN_SEED + (Q_MAX_SEED - Q_MIN_SEED) * n.min(1.0)
            })
            .collect();

        Ok(Self {
            freqs,
            qs,
            gains,
            spacing_repair_exhausted: exhausted,
        })
    }

    /// Number of bands.
    pub fn num_bands(&self) -> usize {
        self.freqs.len()
    }

    /// Seeds as an optimizer vector: log10 frequencies, Qs, gains.
    pub fn seed_vector(&self) -> Array1<f64> {
        self.freqs
            .iter()
            .map(|f| f.log10())
            .chain(self.qs.iter().copied())
            .chain(self.gains.iter().copied())
            .collect()
    }

    /// Parameter bounds in the layout of [`seed_vector`](Self::seed_vector).
    pub fn bounds(&self, options: &FitOptions) -> Result<Bounds> {
        let n = self.num_bands();
        let (f, q, g) = (options.frequency_range, options.q_range, options.gain_range);
        let block = |lo_f: f64, lo_q: f64, lo_g: f64| {
            let mut v = Array1::zeros(3 * n);
            v.slice_mut(ndarray::s![..n]).fill(lo_f);
            v.slice_mut(ndarray::s![n..2 * n]).fill(lo_q);
            v.slice_mut(ndarray::s![2 * n..]).fill(lo_g);
            v
        };
        let lower = block(f.low.log10(), q.low, g.low);
        let upper = block(f.high.log10(), q.high, g.high);
        Ok(Bounds::new(lower, upper)?)
    }

    /// `size` members jittered around the seeds and clipped into `bounds`.
    pub fn population<R: Rng + ?Sized>(
        &self,
        size: usize,
        bounds: &Bounds,
        rng: &mut R,
    ) -> Array2<f64> {
        let n = self.num_bands();
        let seed = self.seed_vector();
        let mut pop = Array2::zeros((size, 3 * n));
        for mut row in pop.rows_mut() {
            let mut member = seed.clone();
            for j in 0..n {
                member[j] += jitter(JITTER_LOG_FREQ, rng);
                member[n + j] += jitter(JITTER_Q, rng);
                member[2 * n + j] += jitter(JITTER_GAIN_DB, rng);
            }
            bounds.clip(&mut member);
            row.assign(&member);
        }
        pop
    }
}
