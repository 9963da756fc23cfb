use ndarray::{Array1, ArrayView2};
use rand::Rng;
use rand::seq::index;

use crate::parallel_eval::evaluate_population;
use crate::{
    Bounds, CallbackAction, ObjectiveFn, Optimizer, OptimError, Result, Solution, SolveContext,
    argmin, check_probability,
};

const MIN_POPULATION: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Susceptible,
    Infected,
    Immune,
}

/// Coronavirus Herd Immunity Optimizer (Al-Betar et al., 2020).
///
/// Each gene of a case is, with total probability `spreading_rate`, pulled
/// away from a random infected case, a random susceptible case, or the best
/// immune case (one third each). Susceptible cases that improve through an
/// infected contact become infected; infected cases that beat the population
/// mean become immune. Infected cases that fail to improve for `max_age`
/// iterations die and are replaced by a fresh random case.
#[derive(Debug, Clone)]
pub struct Chio {
    /// Iterations an infected case may stagnate before it is replaced.
    pub max_age: usize,
    /// Number of initially infected cases.
    pub initial_infected: usize,
    /// Basic reproduction rate, in [0, 1].
    pub spreading_rate: f64,
}

impl Default for Chio {
    fn default() -> Self {
        Self {
            max_age: 100,
            initial_infected: 1,
            spreading_rate: 0.05,
        }
    }
}

fn random_with_status<R: Rng + ?Sized>(
    status: &[Status],
    wanted: Status,
    rng: &mut R,
) -> Option<usize> {
    let count = status.iter().filter(|&&s| s == wanted).count();
    if count == 0 {
        return None;
    }
    let pick = rng.random_range(0..count);
    status
        .iter()
        .enumerate()
        .filter(|(_, s)| **s == wanted)
        .nth(pick)
        .map(|(i, _)| i)
}

fn best_with_status(status: &[Status], fitness: &Array1<f64>, wanted: Status) -> Option<usize> {
    status
        .iter()
        .enumerate()
        .filter(|(_, s)| **s == wanted)
        .min_by(|(a, _), (b, _)| fitness[*a].total_cmp(&fitness[*b]))
        .map(|(i, _)| i)
}

impl Optimizer for Chio {
    fn name(&self) -> &'static str {
        "chio"
    }

    fn minimize(
        &self,
        func: &ObjectiveFn<'_>,
        init: ArrayView2<'_, f64>,
        bounds: &Bounds,
        ctx: &mut SolveContext<'_>,
    ) -> Result<Solution> {
        check_probability("spreading_rate", self.spreading_rate)?;
        if self.max_age == 0 {
            return Err(OptimError::InvalidParameter {
                name: "max_age",
                value: 0.0,
            });
        }
        let mut pop = bounds.clipped_population(init, MIN_POPULATION)?;
        let npop = pop.nrows();
        let dim = bounds.dim();

        let mut fitness = evaluate_population(&pop, func, &ctx.parallel);
        let mut nfev = npop;
        let mut status = vec![Status::Susceptible; npop];
        let mut age = vec![0usize; npop];
        for i in index::sample(ctx.rng, npop, self.initial_infected.min(npop)) {
            status[i] = Status::Infected;
        }

        let (best_idx, mut best_f) = argmin(&fitness);
        let mut best_x = pop.row(best_idx).to_owned();

        let third = self.spreading_rate / 3.0;
        let mut nit = 0;
        let mut stopped = false;

        for iter in 1..=ctx.maxiter {
            nit = iter;
            let mean_f = fitness.mean().unwrap_or(0.0);

            for i in 0..npop {
                let mut candidate = pop.row(i).to_owned();
                let mut infected_contact = false;
                for j in 0..dim {
                    let r: f64 = ctx.rng.random();
                    let source = if r < third {
                        let c = random_with_status(&status, Status::Infected, ctx.rng);
                        infected_contact |= c.is_some();
                        c
                    } else if r < 2.0 * third {
                        random_with_status(&status, Status::Susceptible, ctx.rng)
                    } else if r < self.spreading_rate {
                        best_with_status(&status, &fitness, Status::Immune)
                    } else {
                        None
                    };
                    if let Some(k) = source {
                        let x = candidate[j];
                        candidate[j] = x + ctx.rng.random::<f64>() * (x - pop[(k, j)]);
                    }
                }
                bounds.clip(&mut candidate);

                let f = func(&candidate);
                nfev += 1;
                let improved = f < fitness[i];
                if improved {
                    fitness[i] = f;
                    pop.row_mut(i).assign(&candidate);
                    if f < best_f {
                        best_f = f;
                        best_x = candidate;
                    }
                } else if status[i] == Status::Infected {
                    age[i] += 1;
                }

                match status[i] {
                    Status::Susceptible if improved && infected_contact && f < mean_f => {
                        status[i] = Status::Infected;
                        age[i] = 1;
                    }
                    Status::Infected if fitness[i] < mean_f => {
                        status[i] = Status::Immune;
                        age[i] = 0;
                    }
                    _ => {}
                }

                if status[i] == Status::Infected && age[i] >= self.max_age {
                    let fresh = bounds.random_point(ctx.rng);
                    fitness[i] = func(&fresh);
                    nfev += 1;
                    pop.row_mut(i).assign(&fresh);
                    status[i] = Status::Susceptible;
                    age[i] = 0;
                    if fitness[i] < best_f {
                        best_f = fitness[i];
                        best_x = fresh;
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
        log::debug!("CHIO finished: {} best_f={:.6e}", message, best_f);

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
