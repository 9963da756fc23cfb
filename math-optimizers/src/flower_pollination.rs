use ndarray::{Array1, ArrayView2, Zip};
use rand::Rng;

use crate::density::standard_normal;
use crate::distinct_indices::distinct_indices;
use crate::parallel_eval::evaluate_population;
use crate::{
    Bounds, CallbackAction, Density, ObjectiveFn, Optimizer, OptimError, Result, Solution,
    SolveContext, argmin, check_probability,
};

const MIN_POPULATION: usize = 3;

/// Lévy exponent of the global pollination flights.
const LEVY_BETA: f64 = 1.5;
/// Mantegna's sigma_u for beta = 1.5.
const MANTEGNA_SIGMA: f64 = 0.696_574_502_557_682;

/// Flower Pollination Algorithm (Yang, 2012).
///
/// With probability `switch_probability` a flower performs global
/// pollination, a Lévy flight relative to the current best; otherwise it
/// mixes with two random neighbours. Replacement is greedy and the best is
/// updated immediately.
#[derive(Debug, Clone)]
pub struct FlowerPollination {
    /// Probability of global pollination, in [0, 1].
    pub switch_probability: f64,
    /// Scale of the Lévy step.
    pub step: f64,
}

impl Default for FlowerPollination {
    fn default() -> Self {
        Self {
            switch_probability: 0.8,
            step: 0.1,
        }
    }
}

/// One Lévy-distributed step per dimension (Mantegna's algorithm). The
/// numerator is drawn from `density` so the caller can shape the flights.
fn levy_step<R: Rng + ?Sized>(dim: usize, density: Density, rng: &mut R) -> Array1<f64> {
    Array1::from_shape_fn(dim, |_| {
        let u = density.sample(rng) * MANTEGNA_SIGMA;
        let v = standard_normal(rng).abs().max(1e-12);
        u / v.powf(1.0 / LEVY_BETA)
    })
}

impl Optimizer for FlowerPollination {
    fn name(&self) -> &'static str {
        "flower-pollination"
    }

    fn minimize(
        &self,
        func: &ObjectiveFn<'_>,
        init: ArrayView2<'_, f64>,
        bounds: &Bounds,
        ctx: &mut SolveContext<'_>,
    ) -> Result<Solution> {
        check_probability("switch_probability", self.switch_probability)?;
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(OptimError::InvalidParameter {
                name: "step",
                value: self.step,
            });
        }
        let mut pop = bounds.clipped_population(init, MIN_POPULATION)?;
        let npop = pop.nrows();
        let dim = bounds.dim();

        let mut fitness = evaluate_population(&pop, func, &ctx.parallel);
        let mut nfev = npop;
        let (best_idx, mut best_f) = argmin(&fitness);
        let mut best_x = pop.row(best_idx).to_owned();

        let mut nit = 0;
        let mut stopped = false;

        for iter in 1..=ctx.maxiter {
            nit = iter;
            for i in 0..npop {
                let current = pop.row(i);
                let mut candidate = if ctx.rng.random::<f64>() < self.switch_probability {
                    let levy = levy_step(dim, ctx.density, ctx.rng);
                    Zip::from(current)
                        .and(&levy)
                        .and(&best_x)
                        .map_collect(|&x, &l, &g| x + self.step * l * (x - g))
                } else {
                    let eps: f64 = ctx.rng.random();
                    let idxs = distinct_indices(i, 2, npop, ctx.rng);
                    Zip::from(current)
                        .and(pop.row(idxs[0]))
                        .and(pop.row(idxs[1]))
                        .map_collect(|&x, &a, &b| x + eps * (a - b))
                };
                bounds.clip(&mut candidate);

                let f = func(&candidate);
                nfev += 1;
                if f <= fitness[i] {
                    fitness[i] = f;
                    pop.row_mut(i).assign(&candidate);
                    if f <= best_f {
                        best_f = f;
                        best_x = candidate;
                    }
                }
            }

            if ctx.report(&best_x, best_f, iter) == CallbackAction::Stop {
                stopped = true;
                break;
            }
        }

        let message = if stopped {
            format!("Stopped by callback after {} iterations", nit)
        } else {
            format!("Maximum iterations reached: {}", ctx.maxiter)
        };
        log::debug!("FPA finished: {} best_f={:.6e}", message, best_f);

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
