use ndarray::{Array1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::crossover_binomial::binomial_crossover;
use crate::mutant_rand1::mutant_rand1;
use crate::parallel_eval::{evaluate_population, evaluate_trials};
use crate::{
    Bounds, CallbackAction, ObjectiveFn, Optimizer, Result, Solution, SolveContext, argmin,
    check_probability,
};

/// Smallest population rand/1 mutation can work with.
const MIN_POPULATION: usize = 4;

/// Differential Evolution, rand/1/bin with deferred updating.
///
/// The mutation factor of every trial is dithered around `mutation` by a draw
/// from the context's [`Density`](crate::Density), scaled by `dither` and
/// clamped to `[0.1, 1.0]`. Each member draws from its own generator seeded
/// from the run generator, the generation and the member index, so the result
/// does not depend on whether trials are built in parallel.
#[derive(Debug, Clone)]
pub struct DifferentialEvolution {
    /// Crossover probability CR in [0, 1].
    pub crossover: f64,
    /// Centre of the dithered mutation factor.
    pub mutation: f64,
    /// Scale applied to the density sample.
    pub dither: f64,
}

impl Default for DifferentialEvolution {
    fn default() -> Self {
        Self {
            crossover: 0.5,
            mutation: 0.5,
            dither: 0.25,
        }
    }
}

impl DifferentialEvolution {
    /// DE with the given crossover probability and default mutation.
    pub fn with_crossover(crossover: f64) -> Self {
        Self {
            crossover,
            ..Self::default()
        }
    }
}

impl Optimizer for DifferentialEvolution {
    fn name(&self) -> &'static str {
        "differential-evolution"
    }

    fn minimize(
        &self,
        func: &ObjectiveFn<'_>,
        init: ArrayView2<'_, f64>,
        bounds: &Bounds,
        ctx: &mut SolveContext<'_>,
    ) -> Result<Solution> {
        check_probability("crossover", self.crossover)?;
        let mut pop = bounds.clipped_population(init, MIN_POPULATION)?;
        let npop = pop.nrows();

        let mut energies = evaluate_population(&pop, func, &ctx.parallel);
        let mut nfev = npop;
        let (mut best_idx, mut best_f) = argmin(&energies);
        let mut best_x = pop.row(best_idx).to_owned();

        log::debug!(
            "DE init: population={}, dim={}, maxiter={}, best_f={:.6e}",
            npop,
            bounds.dim(),
            ctx.maxiter,
            best_f
        );

        let base_seed: u64 = ctx.rng.random();
        let density = ctx.density;
        let mut nit = 0;
        let mut stopped = false;

        for iter in 1..=ctx.maxiter {
            nit = iter;

            let build = |i: usize| -> Array1<f64> {
                let mut local_rng = StdRng::seed_from_u64(
                    base_seed
                        .wrapping_add((iter as u64) << 32)
                        .wrapping_add(i as u64),
                );
                let f = (self.mutation + self.dither * density.sample(&mut local_rng))
                    .clamp(0.1, 1.0);
                let mutant = mutant_rand1(i, &pop, f, &mut local_rng);
                let mut trial =
                    binomial_crossover(pop.row(i), &mutant, self.crossover, &mut local_rng);
                bounds.clip(&mut trial);
                trial
            };
            let trials: Vec<Array1<f64>> = if ctx.parallel.enabled {
                (0..npop).into_par_iter().map(build).collect()
            } else {
                (0..npop).map(build).collect()
            };

            let trial_energies = evaluate_trials(&trials, func, &ctx.parallel);
            nfev += npop;

            for (i, (trial, trial_energy)) in trials.into_iter().zip(trial_energies).enumerate() {
                if trial_energy <= energies[i] {
                    pop.row_mut(i).assign(&trial);
                    energies[i] = trial_energy;
                }
            }

            let (new_best_idx, new_best_f) = argmin(&energies);
            if new_best_f < best_f {
                best_idx = new_best_idx;
                best_f = new_best_f;
                best_x = pop.row(best_idx).to_owned();
            }

            if ctx.report(&best_x, best_f, iter) == CallbackAction::Stop {
                stopped = true;
                break;
            }
        }

        let message = if stopped {
            format!("Stopped by callback after {} generations", nit)
        } else {
            format!("Maximum iterations reached: {}", ctx.maxiter)
        };
        log::debug!("DE finished: {} best_f={:.6e}", message, best_f);

        Ok(Solution {
            x: best_x,
            fun: best_f,
            nit,
            nfev,
            stopped,
            message,
        })
    }
}
