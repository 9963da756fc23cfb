use ndarray::{Array1, Array2};
use rand::Rng;

use crate::distinct_indices::distinct_indices;

/// Rand/1 donor: `x[a] + f * (x[b] - x[c])`.
///
/// `a`, `b` and `c` are distinct members, all different from `i`. The
/// population must hold at least four members.
pub(crate) fn mutant_rand1<R: Rng + ?Sized>(
    i: usize,
    pop: &Array2<f64>,
    f: f64,
    rng: &mut R,
) -> Array1<f64> {
    let donors = distinct_indices(i, 3, pop.nrows(), rng);
    let diff = &pop.row(donors[1]) - &pop.row(donors[2]);
    diff * f + &pop.row(donors[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Row `r` is filled with `r`.
    fn ladder(rows: usize, cols: usize) -> Array2<f64> {
        Array2::from_shape_fn((rows, cols), |(r, _)| r as f64)
    }

    #[test]
    fn test_zero_factor_copies_another_member() {
        let pop = ladder(6, 3);
        let mut rng = StdRng::seed_from_u64(3);
        for i in 0..6 {
            let m = mutant_rand1(i, &pop, 0.0, &mut rng);
            let base = m[0];
            assert!(m.iter().all(|&v| v == base));
            assert!(base != i as f64 && (0.0..6.0).contains(&base));
        }
    }

    #[test]
    fn test_difference_is_scaled() {
        let pop = ladder(4, 2);
        let mut rng = StdRng::seed_from_u64(11);
        // With four members and i = 0, donors are a permutation of 1, 2, 3.
        let m = mutant_rand1(0, &pop, 0.5, &mut rng);
        let possible: Vec<f64> = [(1, 2, 3), (1, 3, 2), (2, 1, 3), (2, 3, 1), (3, 1, 2), (3, 2, 1)]
            .iter()
            .map(|&(a, b, c)| a as f64 + 0.5 * (b as f64 - c as f64))
            .collect();
        assert!(possible.contains(&m[0]), "{}", m[0]);
        assert_eq!(m[0], m[1]);
    }
}
