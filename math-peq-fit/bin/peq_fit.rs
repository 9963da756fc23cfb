use clap::Parser;
use math_audio_peq_fit::{
    Algorithm, Density, FitOptions, FitReport, ParamRange, PeakingFitter, ResponseCurve,
};
use std::path::PathBuf;
use std::process;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(
    name = "peq-fit",
    about = "Fit a bank of peaking filters to a target frequency response"
)]
struct Cli {
    /// Target curve: two columns (frequency in Hz, gain in dB), comma, semicolon or whitespace separated
    input: PathBuf,

    /// JSON file with fit options; command-line flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Optimizer: de, nm, fpa, chio, de-nm, fpa-nm, chio-nm
    #[arg(long)]
    algorithm: Option<Algorithm>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Fixed number of bands (skips extrema detection)
    #[arg(long)]
    bands: Option<usize>,

    /// Iterations of the first stage
    #[arg(long)]
    iterations: Option<usize>,

    /// Iterations of the Nelder-Mead stage in hybrid modes
    #[arg(long)]
    secondary_iterations: Option<usize>,

    /// Percentage applied to the detected band count
    #[arg(long)]
    complexity: Option<f64>,

    /// Perturbation density: normal, triangular, hann
    #[arg(long)]
    density: Option<Density>,

    /// Sample rate in Hz
    #[arg(long)]
    sample_rate: Option<f64>,

    /// Lowest allowed centre frequency in Hz
    #[arg(long)]
    freq_min: Option<f64>,

    /// Highest allowed centre frequency in Hz
    #[arg(long)]
    freq_max: Option<f64>,

    /// Fit on the input grid instead of the perceptual grid
    #[arg(long)]
    no_grid: bool,

    /// Fit the negated curve (correction instead of match)
    #[arg(long)]
    invert: bool,

    /// Disable parallel evaluation of the population
    #[arg(long)]
    no_parallel: bool,

    /// Write the full report as JSON to this file
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, options: &mut FitOptions) {
        if let Some(v) = self.algorithm {
            options.algorithm = v;
        }
        if let Some(v) = self.seed {
            options.seed = v;
        }
        if self.bands.is_some() {
            options.band_count = self.bands;
        }
        if let Some(v) = self.iterations {
            options.iterations = v;
        }
        if let Some(v) = self.secondary_iterations {
            options.secondary_iterations = v;
        }
        if let Some(v) = self.complexity {
            options.model_complexity = v;
        }
        if let Some(v) = self.density {
            options.density = v;
        }
        if let Some(v) = self.sample_rate {
            options.sample_rate = v;
        }
        if self.freq_min.is_some() || self.freq_max.is_some() {
            options.frequency_range = ParamRange::new(
                self.freq_min.unwrap_or(options.frequency_range.low),
                self.freq_max.unwrap_or(options.frequency_range.high),
            );
        }
        if self.no_grid {
            options.force_grid_conversion = false;
        }
        if self.invert {
            options.invert_gain = true;
        }
        if self.no_parallel {
            options.parallel = false;
        }
    }
}

fn print_report(report: &FitReport, sample_rate: f64) {
    println!(
        "{:>4}  {:>10}  {:>8}  {:>8}  {:>8}",
        "band", "freq (Hz)", "Q", "BW (oct)", "gain (dB)"
    );
    for (i, band) in report.bands.iter().enumerate() {
        println!(
            "{:>4}  {:>10.1}  {:>8.3}  {:>8.3}  {:>+8.2}",
            i + 1,
            band.freq,
            band.q(sample_rate),
            band.bandwidth,
            band.gain
        );
    }
    println!();
    for (i, stage) in report.stages.iter().enumerate() {
        println!(
            "stage {} {:<20} cost={:.6e} iterations={} evaluations={}{}",
            i + 1,
            stage.optimizer,
            stage.cost,
            stage.iterations,
            stage.evaluations,
            if stage.stopped { " (stopped)" } else { "" }
        );
    }
    println!(
        "final cost={:.6e} grid={:?} points={}",
        report.cost,
        report.grid_kind,
        report.curve.len()
    );
    if report.spacing_repair_exhausted {
        println!("note: initial frequencies could not all be spread apart");
    }
}

fn main() {
    env_logger::init();
    let args = Cli::parse();

    let curve = match ResponseCurve::read_text(&args.input) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: cannot load '{}': {}", args.input.display(), e);
            process::exit(2);
        }
    };

    let mut options = match &args.config {
        Some(path) => match FitOptions::from_json_file(path) {
            Ok(o) => o,
            Err(e) => {
                eprintln!("Error: cannot load config '{}': {}", path.display(), e);
                process::exit(2);
            }
        },
        None => FitOptions::default(),
    };
    args.apply(&mut options);

    let sample_rate = options.sample_rate;
    let fitter = match PeakingFitter::new(options) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    let start = Instant::now();
    let report = match fitter.fit(&curve, &mut ()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: fit failed: {}", e);
            process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    print_report(&report, sample_rate);
    println!("elapsed {:.3}s", elapsed.as_secs_f64());

    if let Some(path) = &args.output {
        let written = serde_json::to_string_pretty(&report)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            eprintln!("Error: cannot write '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}
