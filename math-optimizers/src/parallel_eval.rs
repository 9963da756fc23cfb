use ndarray::{Array1, Array2};
use rayon::prelude::*;

use crate::ObjectiveFn;

/// Parallel evaluation configuration
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Enable parallel evaluation
    pub enabled: bool,
    /// Populations smaller than this are evaluated sequentially
    pub min_population: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_population: 4,
        }
    }
}

impl ParallelConfig {
    /// Sequential evaluation only.
    pub fn sequential() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    fn use_parallel(&self, npop: usize) -> bool {
        self.enabled && npop >= self.min_population
    }
}

/// Evaluate every row of `population`.
///
/// Results are in row order whether or not the rayon pool is used.
pub fn evaluate_population(
    population: &Array2<f64>,
    func: &ObjectiveFn<'_>,
    config: &ParallelConfig,
) -> Array1<f64> {
    let npop = population.nrows();

    if !config.use_parallel(npop) {
        return population
            .rows()
            .into_iter()
            .map(|row| func(&row.to_owned()))
            .collect();
    }

    let results = (0..npop)
        .into_par_iter()
        .map(|i| func(&population.row(i).to_owned()))
        .collect::<Vec<f64>>();

    Array1::from_vec(results)
}

/// Evaluate a batch of trial vectors, preserving order.
pub fn evaluate_trials(
    trials: &[Array1<f64>],
    func: &ObjectiveFn<'_>,
    config: &ParallelConfig,
) -> Vec<f64> {
    if !config.use_parallel(trials.len()) {
        return trials.iter().map(|trial| func(trial)).collect();
    }

    trials.par_iter().map(|trial| func(trial)).collect()
}
