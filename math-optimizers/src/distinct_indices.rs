use rand::Rng;
use rand::seq::index;

/// Picks `count` distinct indices in `0..pool_size`, none equal to `exclude`.
pub(crate) fn distinct_indices<R: Rng + ?Sized>(
    exclude: usize,
    count: usize,
    pool_size: usize,
    rng: &mut R,
) -> Vec<usize> {
    debug_assert!(count <= pool_size.saturating_sub(1));
    // Sample from the pool with `exclude` removed, then shift past it
    index::sample(rng, pool_size - 1, count)
        .into_iter()
        .map(|idx| if idx >= exclude { idx + 1 } else { idx })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_distinct_and_excluded() {
        let mut rng = StdRng::seed_from_u64(5);
        for exclude in 0..6 {
            let idxs = distinct_indices(exclude, 3, 6, &mut rng);
            assert_eq!(idxs.len(), 3);
            assert!(!idxs.contains(&exclude));
            assert!(idxs.iter().all(|&i| i < 6));
            assert!(idxs[0] != idxs[1] && idxs[1] != idxs[2] && idxs[0] != idxs[2]);
        }
    }
}
