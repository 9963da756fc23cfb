//! The fitting pipeline: grid normalization, initial guess, optimization
//! stages and result reporting.

use math_audio_optimizers::{
    CallbackAction, Chio, DifferentialEvolution, FlowerPollination, Intermediate, NelderMead,
    Optimizer, ParallelConfig, SolveContext,
};
use ndarray::{Array1, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::biquad::DeflatedBiquad;
use crate::cancel::CancelToken;
use crate::config::{FitOptions, GlobalStage};
use crate::cost::PeakingCost;
use crate::curve::ResponseCurve;
use crate::error::Result;
use crate::grid::{GridKind, normalize};
use crate::guess::InitialGuess;
use crate::observer::{FitObserver, ProgressReporter};

/// Outcome of one optimizer stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    /// Optimizer name
    pub optimizer: &'static str,
    /// Best cost reached by the stage
    pub cost: f64,
    /// Iterations performed
    pub iterations: usize,
    /// Objective evaluations performed
    pub evaluations: usize,
    /// Stopped before its iteration budget
    pub stopped: bool,
}

/// Result of a fit.
#[derive(Debug, Clone, Serialize)]
pub struct FitReport {
    /// One descriptor per band, in parameter-vector order
    pub bands: Vec<DeflatedBiquad>,
    /// Mean squared error of `x` against the working curve
    pub cost: f64,
    /// Final parameter vector: log10 frequencies, Qs, gains
    pub x: Array1<f64>,
    /// Curve that was fitted, after grid normalization
    pub curve: ResponseCurve,
    /// Classification of the input frequency axis
    pub grid_kind: GridKind,
    /// Initial-guess spacing repair gave up
    pub spacing_repair_exhausted: bool,
    /// Per-stage outcomes, in run order
    pub stages: Vec<StageSummary>,
    /// The run was cancelled through its [`CancelToken`]
    pub cancelled: bool,
}

impl FitReport {
    /// Number of fitted bands.
    pub fn num_bands(&self) -> usize {
        self.bands.len()
    }
}

struct Stage {
    optimizer: Box<dyn Optimizer>,
    maxiter: usize,
}

fn global_optimizer(stage: GlobalStage, options: &FitOptions) -> Box<dyn Optimizer> {
    match stage {
        GlobalStage::DifferentialEvolution => {
            Box::new(DifferentialEvolution::with_crossover(options.de_crossover))
        }
        GlobalStage::FlowerPollination => Box::new(FlowerPollination {
            switch_probability: options.flower_switch_probability,
            step: options.flower_step,
        }),
        GlobalStage::Chio => Box::new(Chio {
            max_age: options.chio_max_age,
            initial_infected: options.chio_initial_infected,
            spreading_rate: options.chio_spreading_rate,
        }),
    }
}

fn plan_stages(options: &FitOptions) -> Vec<Stage> {
    let mut stages = Vec::with_capacity(2);
    let global = options.algorithm.global_stage();
    if let Some(g) = global {
        stages.push(Stage {
            optimizer: global_optimizer(g, options),
            maxiter: options.iterations,
        });
    }
    if options.algorithm.has_local_stage() {
        stages.push(Stage {
            optimizer: Box::new(NelderMead::new(options.fmin_dimension_adaptive)),
            maxiter: if global.is_some() {
                options.secondary_iterations
            } else {
                options.iterations
            },
        });
    }
    stages
}

/// Fits peaking filters to response curves.
///
/// Options are validated once, on construction, and never change. Each call
/// to [`fit`](Self::fit) derives its own population, bounds and random
/// stream from them, so two calls with the same input give the same result.
#[derive(Debug, Clone)]
pub struct PeakingFitter {
    options: FitOptions,
    cancel: Option<CancelToken>,
}

impl PeakingFitter {
    /// Creates a fitter.
    ///
    /// # Errors
    ///
    /// Any error of [`FitOptions::validate`].
    pub fn new(options: FitOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            cancel: None,
        })
    }

    /// Polls `token` after every optimizer iteration.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The options this fitter runs with.
    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    /// Runs the whole pipeline on `curve`, reporting progress to `observer`.
    ///
    /// Stages run in order. The first stage starts from the jittered
    /// population; a hybrid's local stage starts from the vector the global
    /// stage returned, and the result is the better of the two stage results.
    /// The seed vector itself is never a candidate result. On cancellation
    /// the current stage stops, later stages are skipped and the best vector
    /// returned so far is reported.
    ///
    /// # Errors
    ///
    /// Input errors from grid normalization, [`FitError::ZeroBands`] if no
    /// band can be derived, and optimizer set-up errors.
    ///
    /// [`FitError::ZeroBands`]: crate::FitError::ZeroBands
    pub fn fit(&self, curve: &ResponseCurve, observer: &mut dyn FitObserver) -> Result<FitReport> {
        let opts = &self.options;
        let grid = normalize(curve, &opts.grid_options())?;

        let mut rng = StdRng::seed_from_u64(opts.seed);
        let guess = InitialGuess::synthesize(&grid.curve, opts, &mut rng)?;
        let bounds = guess.bounds(opts)?;
        let population = guess.population(opts.population_size(), &bounds, &mut rng);

        let cost = PeakingCost::new(&grid.curve, opts.sample_rate, guess.num_bands());
        let objective = |x: &Array1<f64>| cost.evaluate(x);
        let parallel = if opts.parallel {
            ParallelConfig::default()
        } else {
            ParallelConfig::sequential()
        };

        let mut seed = guess.seed_vector();
        bounds.clip(&mut seed);
        log::info!(
            "Fitting {} bands on {} points with {}; seed cost {:.6e}",
            guess.num_bands(),
            grid.curve.len(),
            opts.algorithm,
            cost.evaluate(&seed)
        );

        let mut reporter = ProgressReporter::new(&cost, observer);
        let mut summaries = Vec::new();
        let mut cancelled = false;
        // Best over stages, and the vector the next stage starts from.
        let mut best: Option<(Array1<f64>, f64)> = None;
        let mut previous: Option<Array1<f64>> = None;

        for (k, stage) in plan_stages(opts).into_iter().enumerate() {
            let init = match previous.take() {
                None => population.clone(),
                Some(x) => x.insert_axis(Axis(0)),
            };

            let token = self.cancel.as_ref();
            let solution = {
                let mut callback = |it: &Intermediate<'_>| {
                    reporter.iteration(it.x, it.fun);
                    if token.is_some_and(CancelToken::is_cancelled) {
                        CallbackAction::Stop
                    } else {
                        CallbackAction::Continue
                    }
                };
                let mut ctx = SolveContext::new(stage.maxiter, &mut rng, opts.density)
                    .with_parallel(parallel.clone())
                    .with_callback(&mut callback);
                stage
                    .optimizer
                    .minimize(&objective, init.view(), &bounds, &mut ctx)?
            };

            log::info!(
                "Stage {} ({}): cost {:.6e} after {} iterations, {} evaluations",
                k + 1,
                stage.optimizer.name(),
                solution.fun,
                solution.nit,
                solution.nfev
            );
            log::debug!("Stage {} solution: {:?}", k + 1, solution);
            summaries.push(StageSummary {
                optimizer: stage.optimizer.name(),
                cost: solution.fun,
                iterations: solution.nit,
                evaluations: solution.nfev,
                stopped: solution.stopped,
            });

            let stopped = solution.stopped;
            previous = Some(solution.x.clone());
            if best.as_ref().is_none_or(|(_, f)| solution.fun < *f) {
                best = Some((solution.x, solution.fun));
            }
            if stopped {
                cancelled = true;
                log::warn!("Fit cancelled during stage {}; keeping best so far", k + 1);
                break;
            }
        }

        // Every algorithm plans at least one stage.
        let (best_x, best_f) = best.unwrap_or_else(|| {
            let f = cost.evaluate(&seed);
            (seed, f)
        });
        let bands = reporter.finish(&best_x);
        log::info!("Fit finished: {} bands, cost {:.6e}", bands.len(), best_f);

        Ok(FitReport {
            bands,
            cost: best_f,
            x: best_x,
            curve: grid.curve,
            grid_kind: grid.kind,
            spacing_repair_exhausted: guess.spacing_repair_exhausted,
            stages: summaries,
            cancelled,
        })
    }
}

/// Fits `options` to a curve given as two slices, without progress events.
pub fn fit_peaking(freq: &[f64], gain: &[f64], options: &FitOptions) -> Result<FitReport> {
    let curve = ResponseCurve::new(Array1::from(freq.to_vec()), Array1::from(gain.to_vec()))?;
    PeakingFitter::new(options.clone())?.fit(&curve, &mut ())
}
