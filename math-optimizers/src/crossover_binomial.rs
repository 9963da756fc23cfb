use ndarray::{Array1, ArrayView1};
use rand::Rng;

/// Uniform crossover: each gene comes from the mutant with probability `cr`,
/// and at least one gene (`jrand`) always does.
pub(crate) fn binomial_crossover<R: Rng + ?Sized>(
    target: ArrayView1<'_, f64>,
    mutant: &Array1<f64>,
    cr: f64,
    rng: &mut R,
) -> Array1<f64> {
    let n = target.len();
    let jrand = rng.random_range(0..n);
    let mut trial = target.to_owned();
    for j in 0..n {
        if j == jrand || rng.random::<f64>() < cr {
            trial[j] = mutant[j];
        }
    }
    trial
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_zero_rate_takes_exactly_one_gene() {
        let target = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let mutant = array![10.0, 20.0, 30.0, 40.0, 50.0];
        let mut rng = StdRng::seed_from_u64(42);

        let trial = binomial_crossover(target.view(), &mutant, 0.0, &mut rng);

        let from_mutant = trial.iter().zip(mutant.iter()).filter(|(t, m)| t == m).count();
        assert_eq!(trial.len(), target.len());
        assert_eq!(from_mutant, 1);
    }

    #[test]
    fn test_full_rate_takes_mutant() {
        let target = array![1.0, 2.0, 3.0];
        let mutant = array![10.0, 20.0, 30.0];
        let mut rng = StdRng::seed_from_u64(1);

        let trial = binomial_crossover(target.view(), &mutant, 1.0, &mut rng);
        assert_eq!(trial, mutant);
    }
}
