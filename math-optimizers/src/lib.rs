//! Bounded gradient-free optimizers.
//!
//! This crate provides four interchangeable minimizers for box-constrained
//! continuous problems. They all implement the [`Optimizer`] trait so that a
//! caller can pick one at run time, or chain a global search with a local
//! polish.
//!
//! # Algorithms
//!
//! - [`DifferentialEvolution`]: rand/1/bin DE with density-dithered mutation
//! - [`FlowerPollination`]: Lévy-flight global pollination plus local mixing
//! - [`Chio`]: coronavirus herd immunity optimizer
//! - [`NelderMead`]: bounded simplex search (variable transform, optional
//!   dimension-adaptive coefficients)
//!
//! # Example
//!
//! ```rust
//! use math_audio_optimizers::{Bounds, Density, DifferentialEvolution, Optimizer, SolveContext};
//! use ndarray::Array1;
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let sphere = |x: &Array1<f64>| x.iter().map(|&xi| xi * xi).sum::<f64>();
//! let bounds = Bounds::new(Array1::from_elem(2, -5.0), Array1::from_elem(2, 5.0))
//!     .expect("valid bounds");
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let init = bounds.sample_uniform(20, &mut rng);
//! let mut ctx = SolveContext::new(200, &mut rng, Density::Normal);
//!
//! let solution = DifferentialEvolution::default()
//!     .minimize(&sphere, init.view(), &bounds, &mut ctx)
//!     .expect("optimization should succeed");
//! assert!(solution.fun < 1e-3);
//! ```
#![warn(missing_docs)]

pub mod error;
pub use error::{OptimError, Result};

use std::fmt;

use ndarray::{Array1, Array2, ArrayView2, Zip};
use rand::Rng;
use rand::rngs::StdRng;

/// Sampling densities used to shape stochastic perturbations.
pub mod density;
/// Utilities for selecting distinct random indices from a population.
pub mod distinct_indices;
/// Parallel population evaluation support.
pub mod parallel_eval;

/// Binomial (uniform) crossover implementation.
pub mod crossover_binomial;
/// Rand/1 mutation strategy.
pub mod mutant_rand1;

/// Coronavirus herd immunity optimizer.
pub mod chio;
/// Differential evolution.
pub mod differential_evolution;
/// Flower pollination algorithm.
pub mod flower_pollination;
/// Bounded Nelder-Mead simplex search.
pub mod nelder_mead;

#[cfg(test)]
mod optim_tests;

pub use chio::Chio;
pub use density::Density;
pub use differential_evolution::DifferentialEvolution;
pub use flower_pollination::FlowerPollination;
pub use nelder_mead::NelderMead;
pub use parallel_eval::ParallelConfig;

/// Objective function type accepted by every optimizer.
pub type ObjectiveFn<'a> = dyn Fn(&Array1<f64>) -> f64 + Sync + 'a;

/// Progress callback type: receives the current best after every iteration.
pub type CallbackFn<'a> = dyn FnMut(&Intermediate<'_>) -> CallbackAction + 'a;

pub(crate) fn argmin(v: &Array1<f64>) -> (usize, f64) {
    let mut best_i = 0usize;
    let mut best_v = v[0];
    for (i, &val) in v.iter().enumerate() {
        if val < best_v {
            best_v = val;
            best_i = i;
        }
    }
    (best_i, best_v)
}

/// Box constraints `lower <= x <= upper`, validated on construction.
#[derive(Debug, Clone)]
pub struct Bounds {
    lower: Array1<f64>,
    upper: Array1<f64>,
}

impl Bounds {
    /// Creates bounds from lower and upper vectors.
    ///
    /// # Errors
    ///
    /// Returns `OptimError::BoundsMismatch` if the vectors differ in length and
    /// `OptimError::InvalidBounds` if any `lower[i] > upper[i]` or is NaN.
    pub fn new(lower: Array1<f64>, upper: Array1<f64>) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(OptimError::BoundsMismatch {
                lower_len: lower.len(),
                upper_len: upper.len(),
            });
        }
        for i in 0..lower.len() {
            if lower[i].is_nan() || upper[i].is_nan() || lower[i] > upper[i] {
                return Err(OptimError::InvalidBounds {
                    index: i,
                    lower: lower[i],
                    upper: upper[i],
                });
            }
        }
        Ok(Self { lower, upper })
    }

    /// Number of variables.
    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// Lower bounds.
    pub fn lower(&self) -> &Array1<f64> {
        &self.lower
    }

    /// Upper bounds.
    pub fn upper(&self) -> &Array1<f64> {
        &self.upper
    }

    /// Clamps `x` into the box in place.
    pub fn clip(&self, x: &mut Array1<f64>) {
        Zip::from(x)
            .and(&self.lower)
            .and(&self.upper)
            .for_each(|x, lo, hi| *x = x.clamp(*lo, *hi));
    }

    /// Returns `true` if every component of `x` lies inside the box.
    pub fn contains(&self, x: &Array1<f64>) -> bool {
        x.len() == self.dim()
            && Zip::from(x)
                .and(&self.lower)
                .and(&self.upper)
                .all(|&x, &lo, &hi| x >= lo && x <= hi)
    }

    /// Draws a uniform random point inside the box.
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<f64> {
        Zip::from(&self.lower)
            .and(&self.upper)
            .map_collect(|&lo, &hi| lo + rng.random::<f64>() * (hi - lo))
    }

    /// Draws `npop` uniform random points inside the box, one per row.
    pub fn sample_uniform<R: Rng + ?Sized>(&self, npop: usize, rng: &mut R) -> Array2<f64> {
        let mut pop = Array2::<f64>::zeros((npop, self.dim()));
        for mut row in pop.rows_mut() {
            row.assign(&self.random_point(rng));
        }
        pop
    }

    /// Copies a starting population, clipping every member into the box.
    pub(crate) fn clipped_population(
        &self,
        init: ArrayView2<'_, f64>,
        min_size: usize,
    ) -> Result<Array2<f64>> {
        if init.ncols() != self.dim() {
            return Err(OptimError::DimensionMismatch {
                expected: self.dim(),
                got: init.ncols(),
            });
        }
        if init.nrows() < min_size {
            return Err(OptimError::PopulationTooSmall {
                pop_size: init.nrows(),
                min: min_size,
            });
        }
        let mut pop = init.to_owned();
        for mut row in pop.rows_mut() {
            Zip::from(&mut row)
                .and(&self.lower)
                .and(&self.upper)
                .for_each(|x, lo, hi| *x = x.clamp(*lo, *hi));
        }
        Ok(pop)
    }
}

/// Information passed to the progress callback after each iteration.
pub struct Intermediate<'a> {
    /// Current best solution vector.
    pub x: &'a Array1<f64>,
    /// Current best objective value.
    pub fun: f64,
    /// Current iteration number (1-based).
    pub iter: usize,
}

/// Action returned by the callback to control optimization flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Continue optimization.
    Continue,
    /// Stop optimization early and return the best found so far.
    Stop,
}

/// Per-run state shared by every optimizer call: iteration budget, random
/// generator, perturbation density and the optional progress callback.
pub struct SolveContext<'a> {
    /// Maximum number of iterations (generations for population methods).
    pub maxiter: usize,
    /// Random generator state; advanced by the optimizer.
    pub rng: &'a mut StdRng,
    /// Density for mutation-style perturbations.
    pub density: Density,
    /// Parallel evaluation configuration.
    pub parallel: ParallelConfig,
    callback: Option<&'a mut CallbackFn<'a>>,
}

impl<'a> SolveContext<'a> {
    /// Creates a context without a progress callback.
    pub fn new(maxiter: usize, rng: &'a mut StdRng, density: Density) -> Self {
        Self {
            maxiter,
            rng,
            density,
            parallel: ParallelConfig::default(),
            callback: None,
        }
    }

    /// Sets the progress callback.
    pub fn with_callback(mut self, callback: &'a mut CallbackFn<'a>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Sets the parallel evaluation configuration.
    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Forwards the current best to the callback, if any.
    pub fn report(&mut self, x: &Array1<f64>, fun: f64, iter: usize) -> CallbackAction {
        match self.callback.as_mut() {
            Some(cb) => cb(&Intermediate { x, fun, iter }),
            None => CallbackAction::Continue,
        }
    }
}

/// Result of an optimizer run.
#[derive(Clone)]
pub struct Solution {
    /// The best solution vector, inside the bounds.
    pub x: Array1<f64>,
    /// The objective value at `x`.
    pub fun: f64,
    /// Number of iterations performed.
    pub nit: usize,
    /// Number of objective evaluations performed.
    pub nfev: usize,
    /// Whether the callback stopped the run early.
    pub stopped: bool,
    /// Human-readable status message.
    pub message: String,
}

impl fmt::Debug for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solution")
            .field("x", &format!("len={}", self.x.len()))
            .field("fun", &self.fun)
            .field("nit", &self.nit)
            .field("nfev", &self.nfev)
            .field("stopped", &self.stopped)
            .field("message", &self.message)
            .finish()
    }
}

/// Common interface of every bounded minimizer.
///
/// `init` holds one starting candidate per row; population methods use all
/// rows, local methods start from the best row. Implementations never return
/// a point outside `bounds`.
pub trait Optimizer: Send + Sync {
    /// Short algorithm name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Minimizes `func` inside `bounds`.
    ///
    /// # Errors
    ///
    /// Returns an error if `init` does not match the bounds dimension, is too
    /// small for the algorithm, or if the algorithm parameters are invalid.
    fn minimize(
        &self,
        func: &ObjectiveFn<'_>,
        init: ArrayView2<'_, f64>,
        bounds: &Bounds,
        ctx: &mut SolveContext<'_>,
    ) -> Result<Solution>;
}

pub(crate) fn check_probability(name: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(OptimError::InvalidParameter { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn test_bounds_validation() {
        assert!(Bounds::new(array![0.0, 1.0], array![1.0]).is_err());
        let err = Bounds::new(array![0.0, 2.0], array![1.0, 1.0]).unwrap_err();
        assert!(matches!(err, OptimError::InvalidBounds { index: 1, .. }));
        assert!(Bounds::new(array![f64::NAN], array![1.0]).is_err());
        assert!(Bounds::new(array![1.0], array![1.0]).is_ok());
    }

    #[test]
    fn test_bounds_clip_and_contains() {
        let bounds = Bounds::new(array![-1.0, 0.0], array![1.0, 2.0]).unwrap();
        let mut x = array![-3.0, 5.0];
        assert!(!bounds.contains(&x));
        bounds.clip(&mut x);
        assert_eq!(x, array![-1.0, 2.0]);
        assert!(bounds.contains(&x));
    }

    #[test]
    fn test_sample_uniform_inside() {
        let bounds = Bounds::new(array![-1.0, 10.0], array![1.0, 20.0]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let pop = bounds.sample_uniform(50, &mut rng);
        assert_eq!(pop.dim(), (50, 2));
        for row in pop.rows() {
            assert!(bounds.contains(&row.to_owned()));
        }
    }

    #[test]
    fn test_clipped_population_checks() {
        let bounds = Bounds::new(array![0.0, 0.0], array![1.0, 1.0]).unwrap();
        let init = Array2::from_elem((3, 3), 0.5);
        let err = bounds.clipped_population(init.view(), 1).unwrap_err();
        assert!(err.is_dimension_error());

        let init = Array2::from_elem((2, 2), 4.0);
        let err = bounds.clipped_population(init.view(), 4).unwrap_err();
        assert!(err.is_config_error());

        let pop = bounds.clipped_population(init.view(), 2).unwrap();
        assert!(pop.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_argmin() {
        let (i, v) = argmin(&array![3.0, -1.0, 2.0, -1.0]);
        assert_eq!(i, 1);
        assert_eq!(v, -1.0);
    }
}
