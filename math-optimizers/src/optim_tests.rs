use crate::{
    Bounds, CallbackAction, Chio, Density, DifferentialEvolution, FlowerPollination, Intermediate,
    NelderMead, Optimizer, ParallelConfig, SolveContext,
};
use ndarray::{Array1, Array2, array};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn sphere(x: &Array1<f64>) -> f64 {
    x.iter().map(|&xi| xi * xi).sum::<f64>()
}

fn rosenbrock(x: &Array1<f64>) -> f64 {
    (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
}

fn square_box(dim: usize, half: f64) -> Bounds {
    Bounds::new(Array1::from_elem(dim, -half), Array1::from_elem(dim, half)).unwrap()
}

fn run(
    optimizer: &dyn Optimizer,
    func: fn(&Array1<f64>) -> f64,
    bounds: &Bounds,
    npop: usize,
    maxiter: usize,
    seed: u64,
) -> crate::Solution {
    let mut rng = StdRng::seed_from_u64(seed);
    let init = bounds.sample_uniform(npop, &mut rng);
    let mut ctx = SolveContext::new(maxiter, &mut rng, Density::Normal);
    optimizer
        .minimize(&func, init.view(), bounds, &mut ctx)
        .unwrap()
}

mod convergence_tests {
    use super::*;

    #[test]
    fn test_de_sphere() {
        let bounds = square_box(3, 5.0);
        let sol = run(&DifferentialEvolution::default(), sphere, &bounds, 30, 300, 42);
        assert!(sol.fun < 1e-4, "DE should converge: f={}", sol.fun);
        assert!(bounds.contains(&sol.x));
    }

    #[test]
    fn test_fpa_sphere() {
        let bounds = square_box(2, 5.0);
        let sol = run(&FlowerPollination::default(), sphere, &bounds, 25, 300, 7);
        assert!(sol.fun < 0.1, "FPA should converge: f={}", sol.fun);
        assert!(bounds.contains(&sol.x));
    }

    #[test]
    fn test_chio_sphere() {
        let chio = Chio {
            spreading_rate: 0.5,
            ..Chio::default()
        };
        let bounds = square_box(2, 5.0);
        let sol = run(&chio, sphere, &bounds, 30, 500, 11);
        assert!(sol.fun < 1.0, "CHIO should improve: f={}", sol.fun);
        assert!(bounds.contains(&sol.x));
    }

    #[test]
    fn test_nelder_mead_rosenbrock() {
        let bounds = square_box(2, 5.0);
        let mut rng = StdRng::seed_from_u64(0);
        let init = array![[-1.2, 1.0]];
        let mut ctx = SolveContext::new(2000, &mut rng, Density::Normal);
        let sol = NelderMead::default()
            .minimize(&rosenbrock, init.view(), &bounds, &mut ctx)
            .unwrap();
        assert!(sol.fun < 1e-3, "NM should reach the valley floor: f={}", sol.fun);
        assert!((sol.x[0] - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_nelder_mead_classic_coefficients() {
        let bounds = square_box(3, 5.0);
        let sol = run(&NelderMead::new(false), sphere, &bounds, 1, 2000, 3);
        assert!(sol.fun < 1e-6, "f={}", sol.fun);
    }

    #[test]
    fn test_nelder_mead_starts_from_best_row() {
        let bounds = square_box(2, 5.0);
        let init = array![[4.0, 4.0], [0.1, -0.1], [-3.0, 2.0]];
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = SolveContext::new(0, &mut rng, Density::Normal);
        let sol = NelderMead::default()
            .minimize(&sphere, init.view(), &bounds, &mut ctx)
            .unwrap();
        assert_eq!(sol.x, array![0.1, -0.1]);
        assert_eq!(sol.nit, 0);
    }
}

mod bounds_tests {
    use super::*;

    fn shifted(x: &Array1<f64>) -> f64 {
        x.iter().map(|&xi| (xi - 3.0).powi(2)).sum::<f64>()
    }

    #[test]
    fn test_optimum_outside_box_lands_on_bound() {
        let bounds = square_box(2, 1.0);
        let optimizers: Vec<Box<dyn Optimizer>> = vec![
            Box::new(DifferentialEvolution::default()),
            Box::new(FlowerPollination::default()),
            Box::new(NelderMead::default()),
        ];
        for opt in &optimizers {
            let sol = run(opt.as_ref(), shifted, &bounds, 20, 400, 5);
            assert!(bounds.contains(&sol.x), "{} left the box", opt.name());
            assert!(
                sol.x.iter().all(|&v| v > 0.98),
                "{} should press against the upper bound: {:?}",
                opt.name(),
                sol.x
            );
        }
    }

    #[test]
    fn test_nelder_mead_keeps_fixed_variable() {
        let bounds = Bounds::new(array![-5.0, 2.0, -5.0], array![5.0, 2.0, 5.0]).unwrap();
        let sol = run(&NelderMead::default(), sphere, &bounds, 4, 1000, 9);
        assert_eq!(sol.x[1], 2.0);
        assert!((sol.fun - 4.0).abs() < 1e-6, "f={}", sol.fun);
    }

    #[test]
    fn test_out_of_box_population_is_clipped() {
        let bounds = square_box(2, 1.0);
        let init = Array2::from_elem((6, 2), 10.0);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = SolveContext::new(1, &mut rng, Density::Normal);
        let sol = DifferentialEvolution::default()
            .minimize(&sphere, init.view(), &bounds, &mut ctx)
            .unwrap();
        assert!(bounds.contains(&sol.x));
    }
}

mod control_tests {
    use super::*;

    #[test]
    fn test_callback_stops_every_optimizer() {
        let bounds = square_box(2, 5.0);
        let optimizers: Vec<Box<dyn Optimizer>> = vec![
            Box::new(DifferentialEvolution::default()),
            Box::new(FlowerPollination::default()),
            Box::new(Chio::default()),
            Box::new(NelderMead::default()),
        ];
        for opt in &optimizers {
            let mut rng = StdRng::seed_from_u64(3);
            let init = bounds.sample_uniform(10, &mut rng);
            let mut calls = 0usize;
            let mut callback = |it: &Intermediate<'_>| {
                calls += 1;
                if it.iter >= 5 {
                    CallbackAction::Stop
                } else {
                    CallbackAction::Continue
                }
            };
            let mut ctx =
                SolveContext::new(1000, &mut rng, Density::Normal).with_callback(&mut callback);
            let sol = opt.minimize(&sphere, init.view(), &bounds, &mut ctx).unwrap();
            drop(ctx);
            assert!(sol.stopped, "{} ignored Stop", opt.name());
            assert_eq!(sol.nit, 5, "{}", opt.name());
            assert_eq!(calls, 5);
        }
    }

    #[test]
    fn test_callback_sees_non_increasing_best() {
        let bounds = square_box(2, 5.0);
        let mut rng = StdRng::seed_from_u64(17);
        let init = bounds.sample_uniform(12, &mut rng);
        let mut history = Vec::new();
        let mut callback = |it: &Intermediate<'_>| {
            history.push(it.fun);
            CallbackAction::Continue
        };
        let mut ctx = SolveContext::new(50, &mut rng, Density::Normal).with_callback(&mut callback);
        DifferentialEvolution::default()
            .minimize(&sphere, init.view(), &bounds, &mut ctx)
            .unwrap();
        drop(ctx);
        assert_eq!(history.len(), 50);
        assert!(history.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_same_seed_same_result() {
        let bounds = square_box(3, 5.0);
        let optimizers: Vec<Box<dyn Optimizer>> = vec![
            Box::new(DifferentialEvolution::default()),
            Box::new(FlowerPollination::default()),
            Box::new(Chio::default()),
        ];
        for opt in &optimizers {
            let a = run(opt.as_ref(), sphere, &bounds, 15, 40, 99);
            let b = run(opt.as_ref(), sphere, &bounds, 15, 40, 99);
            assert_eq!(a.x, b.x, "{} is not deterministic", opt.name());
            assert_eq!(a.fun, b.fun);
        }
    }

    #[test]
    fn test_de_parallel_matches_sequential() {
        let bounds = square_box(4, 5.0);
        let solve = |parallel: ParallelConfig| {
            let mut rng = StdRng::seed_from_u64(2024);
            let init = bounds.sample_uniform(24, &mut rng);
            let mut ctx = SolveContext::new(60, &mut rng, Density::Triangular).with_parallel(parallel);
            DifferentialEvolution::default()
                .minimize(&sphere, init.view(), &bounds, &mut ctx)
                .unwrap()
        };
        let par = solve(ParallelConfig::default());
        let seq = solve(ParallelConfig::sequential());
        assert_eq!(par.x, seq.x);
        assert_eq!(par.fun, seq.fun);
    }

    #[test]
    fn test_population_too_small() {
        let bounds = square_box(2, 1.0);
        let mut rng = StdRng::seed_from_u64(1);
        let init = bounds.sample_uniform(3, &mut rng);
        let mut ctx = SolveContext::new(10, &mut rng, Density::Normal);
        let err = DifferentialEvolution::default()
            .minimize(&sphere, init.view(), &bounds, &mut ctx)
            .unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_dimension_mismatch() {
        let bounds = square_box(2, 1.0);
        let init = Array2::zeros((10, 3));
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = SolveContext::new(10, &mut rng, Density::Normal);
        let err = Chio::default()
            .minimize(&sphere, init.view(), &bounds, &mut ctx)
            .unwrap_err();
        assert!(err.is_dimension_error());
    }

    #[test]
    fn test_invalid_crossover() {
        let bounds = square_box(2, 1.0);
        let sol = {
            let mut rng = StdRng::seed_from_u64(1);
            let init = bounds.sample_uniform(8, &mut rng);
            let mut ctx = SolveContext::new(10, &mut rng, Density::Normal);
            DifferentialEvolution::with_crossover(1.5).minimize(&sphere, init.view(), &bounds, &mut ctx)
        };
        assert!(sol.unwrap_err().is_config_error());
    }
}
