//! Auditory-band partition of a dense linear grid.

use std::ops::Range;

/// Partitions `0..len` into contiguous bands of geometrically growing width.
///
/// Index 0 (DC) is its own band. From index 1 on, band edges follow
/// `e[k+1] = e[k] * ratio` starting at `e[0] = 1`; each band covers
/// `floor(e[k])..floor(e[k+1])`, and an edge never advances by less than one
/// index, so low bands are one sample wide until the geometric growth takes
/// over. The last band is cut at `len`.
///
/// Returns an empty list for `len == 0`. `ratio` must be finite and > 1.
pub fn auditory_bands(len: usize, ratio: f64) -> Vec<Range<usize>> {
    let mut bands = Vec::new();
    if len == 0 {
        return bands;
    }
    bands.push(0..1);

    let mut start = 1usize;
    let mut edge = 1.0f64;
    while start < len {
        edge = (edge * ratio).max((start + 1) as f64);
        let end = (edge.floor() as usize).min(len);
        bands.push(start..end);
        start = end;
    }
    bands
}

/// Mean of `values` over each band.
pub fn band_means(values: &[f64], bands: &[Range<usize>]) -> Vec<f64> {
    bands
        .iter()
        .map(|r| values[r.clone()].iter().sum::<f64>() / r.len() as f64)
        .collect()
}

/// Centre of each band, interpolated on `axis`.
pub fn band_centres(axis: &[f64], bands: &[Range<usize>]) -> Vec<f64> {
    bands
        .iter()
        .map(|r| 0.5 * (axis[r.start] + axis[r.end - 1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_partition(bands: &[Range<usize>], len: usize) {
        assert_eq!(bands[0], 0..1);
        for w in bands.windows(2) {
            assert_eq!(w[0].end, w[1].start);
        }
        assert_eq!(bands.last().map(|r| r.end), Some(len));
        assert!(bands.iter().all(|r| !r.is_empty()));
    }

    #[test]
    fn test_partition_covers_grid() {
        for (len, ratio) in [(1, 1.005), (2, 1.5), (1000, 1.005), (8192, 1.005), (8192, 1.2)] {
            let bands = auditory_bands(len, ratio);
            assert_partition(&bands, len);
        }
    }

    #[test]
    fn test_widths_grow() {
        let bands = auditory_bands(8192, 1.005);
        assert!(bands.len() < 8192 / 4, "got {} bands", bands.len());
        let first = bands[1].len();
        let last = bands[bands.len() - 2].len();
        assert_eq!(first, 1);
        assert!(last > 10, "last full band has width {}", last);
    }

    #[test]
    fn test_smaller_ratio_gives_more_bands() {
        let coarse = auditory_bands(4096, 1.05).len();
        let fine = auditory_bands(4096, 1.005).len();
        assert!(fine > coarse);
    }

    #[test]
    fn test_means_and_centres() {
        let values = [1.0, 2.0, 4.0, 6.0, 8.0];
        let axis = [0.0, 10.0, 20.0, 30.0, 40.0];
        let bands = vec![0..1, 1..2, 2..5];
        assert_eq!(band_means(&values, &bands), vec![1.0, 2.0, 6.0]);
        assert_eq!(band_centres(&axis, &bands), vec![0.0, 10.0, 30.0]);
    }
}
