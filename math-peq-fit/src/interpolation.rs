//! Linear interpolation on ascending grids.

use ndarray::Array1;

/// Index `i` such that `xs[i] <= x <= xs[i + 1]`, for `x` inside the grid.
fn bracket(xs: &Array1<f64>, x: f64) -> usize {
    let (mut lo, mut hi) = (0, xs.len() - 1);
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        if xs[mid] <= x {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Interpolates `ys(x)` without extrapolation.
///
/// Returns `None` if `x` lies outside `[xs[0], xs[last]]`, is NaN, or the
/// grid has fewer than two points. `xs` must be strictly ascending.
pub fn interp_checked(x: f64, xs: &Array1<f64>, ys: &Array1<f64>) -> Option<f64> {
    let n = xs.len();
    if n < 2 || ys.len() != n || !(x >= xs[0] && x <= xs[n - 1]) {
        return None;
    }
    let i = bracket(xs, x);
    let t = (x - xs[i]) / (xs[i + 1] - xs[i]);
    Some(ys[i] + t * (ys[i + 1] - ys[i]))
}

/// Interpolates `ys(x)`, holding the edge values outside the grid.
///
/// Never produces a value beyond the range of `ys`.
pub fn interp_clamped(x: f64, xs: &Array1<f64>, ys: &Array1<f64>) -> f64 {
    let n = xs.len();
    match n {
        0 => 0.0,
        1 => ys[0],
        _ if x <= xs[0] => ys[0],
        _ if x >= xs[n - 1] => ys[n - 1],
        _ => interp_checked(x, xs, ys).unwrap_or(ys[0]),
    }
}

/// Taps either side of the centre in [`windowed_gain`].
const WINDOW_HALF_TAPS: i32 = 2;
/// Spacing of the taps, in octaves.
const WINDOW_TAP_OCTAVES: f64 = 1.0 / 12.0;

/// Raised-cosine weighted average of a curve around `freq`.
///
/// Five taps spaced 1/12 octave apart, centred on `freq`, are read with
/// [`interp_clamped`]; the outer taps weigh 1/4 and the inner ones 3/4 of
/// the centre.
pub fn windowed_gain(freq: f64, xs: &Array1<f64>, ys: &Array1<f64>) -> f64 {
    let span = f64::from(WINDOW_HALF_TAPS + 1);
    let mut acc = 0.0;
    let mut weight_sum = 0.0;
    for k in -WINDOW_HALF_TAPS..=WINDOW_HALF_TAPS {
        let k = f64::from(k);
        let w = 0.5 * (1.0 + (std::f64::consts::PI * k / span).cos());
        let f = freq * (k * WINDOW_TAP_OCTAVES).exp2();
        acc += w * interp_clamped(f, xs, ys);
        weight_sum += w;
    }
    acc / weight_sum
}
