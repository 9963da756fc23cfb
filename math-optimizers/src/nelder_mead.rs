//! Bounded Nelder-Mead.
//!
//! Bounds are enforced by optimizing in an unconstrained space `z` and mapping
//! back to `x` on every evaluation:
//!
//! | bounds            | `x(z)`                               |
//! |-------------------|--------------------------------------|
//! | `lb`, `ub` finite | `lb + (ub - lb) * (sin(z) + 1) / 2`  |
//! | `lb` only         | `lb + z^2`                           |
//! | `ub` only         | `ub - z^2`                           |
//! | none              | `z`                                  |
//!
//! Variables with `lb == ub` are held fixed and do not take part in the
//! simplex.

use ndarray::{Array1, ArrayView2};

use crate::parallel_eval::evaluate_population;
use crate::{Bounds, CallbackAction, ObjectiveFn, Optimizer, Result, Solution, SolveContext, argmin};

/// Relative perturbation of non-zero coordinates in the initial simplex.
const USUAL_DELTA: f64 = 0.05;
/// Absolute perturbation of zero coordinates in the initial simplex.
const ZERO_TERM_DELTA: f64 = 0.00025;

#[derive(Debug, Clone, Copy)]
enum Transform {
    Fixed(f64),
    Both { lb: f64, ub: f64 },
    Lower(f64),
    Upper(f64),
    Free,
}

impl Transform {
    fn new(lb: f64, ub: f64) -> Self {
        match (lb.is_finite(), ub.is_finite()) {
            (true, true) if lb == ub => Transform::Fixed(lb),
            (true, true) => Transform::Both { lb, ub },
            (true, false) => Transform::Lower(lb),
            (false, true) => Transform::Upper(ub),
            (false, false) => Transform::Free,
        }
    }

    fn to_x(self, z: f64) -> f64 {
        match self {
            Transform::Fixed(v) => v,
            Transform::Both { lb, ub } => (lb + (ub - lb) * (z.sin() + 1.0) / 2.0).clamp(lb, ub),
            Transform::Lower(lb) => lb + z * z,
            Transform::Upper(ub) => ub - z * z,
            Transform::Free => z,
        }
    }

    fn to_z(self, x: f64) -> f64 {
        match self {
            Transform::Fixed(_) => 0.0,
            Transform::Both { lb, ub } => {
                let t = (2.0 * (x - lb) / (ub - lb) - 1.0).clamp(-1.0, 1.0);
                t.asin()
            }
            Transform::Lower(lb) => (x - lb).max(0.0).sqrt(),
            Transform::Upper(ub) => (ub - x).max(0.0).sqrt(),
            Transform::Free => x,
        }
    }
}

/// Maps between the free simplex coordinates and the bounded problem space.
struct Mapping {
    transforms: Vec<Transform>,
    free: Vec<usize>,
}

impl Mapping {
    fn new(bounds: &Bounds) -> Self {
        let transforms: Vec<Transform> = bounds
            .lower()
            .iter()
            .zip(bounds.upper().iter())
            .map(|(&lb, &ub)| Transform::new(lb, ub))
            .collect();
        let free = transforms
            .iter()
            .enumerate()
            .filter(|(_, t)| !matches!(t, Transform::Fixed(_)))
            .map(|(i, _)| i)
            .collect();
        Self { transforms, free }
    }

    fn to_x(&self, z: &Array1<f64>) -> Array1<f64> {
        let mut x: Array1<f64> = self.transforms.iter().map(|t| t.to_x(0.0)).collect();
        for (k, &i) in self.free.iter().enumerate() {
            x[i] = self.transforms[i].to_x(z[k]);
        }
        x
    }

    fn to_z(&self, x: &Array1<f64>) -> Array1<f64> {
        self.free
            .iter()
            .map(|&i| self.transforms[i].to_z(x[i]))
            .collect()
    }
}

/// Reflection, expansion, contraction and shrink coefficients.
#[derive(Debug, Clone, Copy)]
struct Coefficients {
    rho: f64,
    chi: f64,
    psi: f64,
    sigma: f64,
}

impl Coefficients {
    fn new(n: usize, adaptive: bool) -> Self {
        if adaptive && n > 0 {
            // Gao & Han (2012)
            let n = n as f64;
            Self {
                rho: 1.0,
                chi: 1.0 + 2.0 / n,
                psi: 0.75 - 1.0 / (2.0 * n),
                sigma: 1.0 - 1.0 / n,
            }
        } else {
            Self {
                rho: 1.0,
                chi: 2.0,
                psi: 0.5,
                sigma: 0.5,
            }
        }
    }
}

/// Nelder-Mead simplex search with bound transforms.
#[derive(Debug, Clone)]
pub struct NelderMead {
    /// Termination tolerance on the simplex size.
    pub tol_x: f64,
    /// Termination tolerance on the spread of simplex values.
    pub tol_f: f64,
    /// Use dimension-dependent coefficients.
    pub adaptive: bool,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            tol_x: 1e-8,
            tol_f: 1e-8,
            adaptive: true,
        }
    }
}

impl NelderMead {
    /// Nelder-Mead with default tolerances.
    pub fn new(adaptive: bool) -> Self {
        Self {
            adaptive,
            ..Self::default()
        }
    }
}

/// Simplex vertices kept sorted by value, best first.
struct Simplex {
    vertices: Vec<Array1<f64>>,
    values: Vec<f64>,
}

impl Simplex {
    fn sort(&mut self) {
        let mut order: Vec<usize> = (0..self.values.len()).collect();
        order.sort_by(|&a, &b| self.values[a].total_cmp(&self.values[b]));
        self.vertices = order.iter().map(|&i| self.vertices[i].clone()).collect();
        self.values = order.iter().map(|&i| self.values[i]).collect();
    }

    fn converged(&self, tol_x: f64, tol_f: f64) -> bool {
        let best = &self.vertices[0];
        let f_spread = self.values[1..]
            .iter()
            .map(|v| (v - self.values[0]).abs())
            .fold(0.0, f64::max);
        let x_spread = self.vertices[1..]
            .iter()
            .flat_map(|v| v.iter().zip(best.iter()).map(|(a, b)| (a - b).abs()))
            .fold(0.0, f64::max);
        f_spread <= tol_f && x_spread <= tol_x
    }

    fn centroid(&self) -> Array1<f64> {
        let n = self.vertices.len() - 1;
        let mut c = Array1::zeros(self.vertices[0].len());
        for v in &self.vertices[..n] {
            c += v;
        }
        c / n as f64
    }
}

impl Optimizer for NelderMead {
    fn name(&self) -> &'static str {
        "nelder-mead"
    }

    fn minimize(
        &self,
        func: &ObjectiveFn<'_>,
        init: ArrayView2<'_, f64>,
        bounds: &Bounds,
        ctx: &mut SolveContext<'_>,
    ) -> Result<Solution> {
        let pop = bounds.clipped_population(init, 1)?;
        let (x0, f0, mut nfev) = if pop.nrows() == 1 {
            let x0 = pop.row(0).to_owned();
            let f0 = func(&x0);
            (x0, f0, 1)
        } else {
            let energies = evaluate_population(&pop, func, &ctx.parallel);
            let (i, f) = argmin(&energies);
            (pop.row(i).to_owned(), f, pop.nrows())
        };

        let mapping = Mapping::new(bounds);
        let n = mapping.free.len();
        if n == 0 || ctx.maxiter == 0 {
            return Ok(Solution {
                x: x0,
                fun: f0,
                nit: 0,
                nfev,
                stopped: false,
                message: "Nothing to optimize".into(),
            });
        }

        let eval = |z: &Array1<f64>| func(&mapping.to_x(z));
        let coef = Coefficients::new(n, self.adaptive);

        let z0 = mapping.to_z(&x0);
        let mut vertices = Vec::with_capacity(n + 1);
        let mut values = Vec::with_capacity(n + 1);
        // Rescored through the transform so `fun` always matches the returned `x`.
        values.push(eval(&z0));
        vertices.push(z0.clone());
        for j in 0..n {
            let mut y = z0.clone();
            y[j] = if y[j] != 0.0 {
                (1.0 + USUAL_DELTA) * y[j]
            } else {
                ZERO_TERM_DELTA
            };
            values.push(eval(&y));
            vertices.push(y);
        }
        nfev += n + 1;
        let mut simplex = Simplex { vertices, values };
        simplex.sort();

        let mut nit = 0;
        let mut stopped = false;
        let mut converged = false;

        while nit < ctx.maxiter {
            if simplex.converged(self.tol_x, self.tol_f) {
                converged = true;
                break;
            }
            nit += 1;

            let xbar = simplex.centroid();
            let worst = simplex.vertices[n].clone();
            let xr = &xbar * (1.0 + coef.rho) - &worst * coef.rho;
            let fxr = eval(&xr);
            nfev += 1;

            if fxr < simplex.values[0] {
                let xe = &xbar * (1.0 + coef.rho * coef.chi) - &worst * (coef.rho * coef.chi);
                let fxe = eval(&xe);
                nfev += 1;
                if fxe < fxr {
                    simplex.vertices[n] = xe;
                    simplex.values[n] = fxe;
                } else {
                    simplex.vertices[n] = xr;
                    simplex.values[n] = fxr;
                }
            } else if fxr < simplex.values[n - 1] {
                simplex.vertices[n] = xr;
                simplex.values[n] = fxr;
            } else {
                let (xc, fxc, accept) = if fxr < simplex.values[n] {
                    let xc = &xbar * (1.0 + coef.psi * coef.rho) - &worst * (coef.psi * coef.rho);
                    let fxc = eval(&xc);
                    (xc, fxc, fxc <= fxr)
                } else {
                    let xcc = &xbar * (1.0 - coef.psi) + &worst * coef.psi;
                    let fxcc = eval(&xcc);
                    (xcc, fxcc, fxcc < simplex.values[n])
                };
                nfev += 1;
                if accept {
                    simplex.vertices[n] = xc;
                    simplex.values[n] = fxc;
                } else {
                    let best = simplex.vertices[0].clone();
                    for j in 1..=n {
                        let v = &best + &((&simplex.vertices[j] - &best) * coef.sigma);
                        simplex.values[j] = eval(&v);
                        simplex.vertices[j] = v;
                    }
                    nfev += n;
                }
            }
            simplex.sort();

            let best_x = mapping.to_x(&simplex.vertices[0]);
            if ctx.report(&best_x, simplex.values[0], nit) == CallbackAction::Stop {
                stopped = true;
                break;
            }
        }

        let message = if stopped {
            format!("Stopped by callback after {} iterations", nit)
        } else if converged {
            format!("Converged after {} iterations", nit)
        } else {
            format!("Maximum iterations reached: {}", ctx.maxiter)
        };
        log::debug!("Nelder-Mead finished: {} fun={:.6e}", message, simplex.values[0]);

        Ok(Solution {
            x: mapping.to_x(&simplex.vertices[0]),
            fun: simplex.values[0],
            nit,
            nfev,
            stopped,
            message,
        })
    }
}
