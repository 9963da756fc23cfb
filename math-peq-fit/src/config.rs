//! Fit configuration.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use math_audio_optimizers::Density;
use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};
use crate::grid::GridOptions;

/// Optimizer back-end, or a global/local pairing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Differential evolution only
    DifferentialEvolution,
    /// Bounded Nelder-Mead only
    NelderMead,
    /// Flower pollination only
    FlowerPollination,
    /// CHIO only
    Chio,
    /// Differential evolution, then Nelder-Mead
    #[default]
    HybridDeNelderMead,
    /// Flower pollination, then Nelder-Mead
    HybridFlowerNelderMead,
    /// CHIO, then Nelder-Mead
    HybridChioNelderMead,
}

/// Global search stage of an [`Algorithm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalStage {
    /// Differential evolution
    DifferentialEvolution,
    /// Flower pollination
    FlowerPollination,
    /// CHIO
    Chio,
}

impl GlobalStage {
    /// Smallest starting population the stage accepts.
    pub fn min_population(&self) -> usize {
        match self {
            GlobalStage::DifferentialEvolution => 4,
            GlobalStage::FlowerPollination => 3,
            GlobalStage::Chio => 2,
        }
    }
}

impl Algorithm {
    /// All variants, in declaration order.
    pub const ALL: [Algorithm; 7] = [
        Algorithm::DifferentialEvolution,
        Algorithm::NelderMead,
        Algorithm::FlowerPollination,
        Algorithm::Chio,
        Algorithm::HybridDeNelderMead,
        Algorithm::HybridFlowerNelderMead,
        Algorithm::HybridChioNelderMead,
    ];

    /// The global stage, if any.
    pub fn global_stage(&self) -> Option<GlobalStage> {
        match self {
            Algorithm::DifferentialEvolution | Algorithm::HybridDeNelderMead => {
                Some(GlobalStage::DifferentialEvolution)
            }
            Algorithm::FlowerPollination | Algorithm::HybridFlowerNelderMead => {
                Some(GlobalStage::FlowerPollination)
            }
            Algorithm::Chio | Algorithm::HybridChioNelderMead => Some(GlobalStage::Chio),
            Algorithm::NelderMead => None,
        }
    }

    /// Whether a Nelder-Mead stage runs (alone or after the global stage).
    pub fn has_local_stage(&self) -> bool {
        matches!(
            self,
            Algorithm::NelderMead
                | Algorithm::HybridDeNelderMead
                | Algorithm::HybridFlowerNelderMead
                | Algorithm::HybridChioNelderMead
        )
    }

    /// Smallest K x N population the algorithm accepts.
    pub fn min_population(&self) -> usize {
        self.global_stage().map_or(1, |g| g.min_population())
    }

    /// Identifier accepted back by [`FromStr`].
    pub fn short_name(&self) -> &'static str {
        match self {
            Algorithm::DifferentialEvolution => "de",
            Algorithm::NelderMead => "nm",
            Algorithm::FlowerPollination => "fpa",
            Algorithm::Chio => "chio",
            Algorithm::HybridDeNelderMead => "de-nm",
            Algorithm::HybridFlowerNelderMead => "fpa-nm",
            Algorithm::HybridChioNelderMead => "chio-nm",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "de" | "differential-evolution" => Ok(Algorithm::DifferentialEvolution),
            "nm" | "nelder-mead" | "fminsearch" | "fminsearchbnd" => Ok(Algorithm::NelderMead),
            "fpa" | "flower" | "flower-pollination" => Ok(Algorithm::FlowerPollination),
            "chio" => Ok(Algorithm::Chio),
            "de-nm" | "hybrid-de" | "hybrid-de-nelder-mead" => Ok(Algorithm::HybridDeNelderMead),
            "fpa-nm" | "hybrid-flower" | "hybrid-flower-nelder-mead" => {
                Ok(Algorithm::HybridFlowerNelderMead)
            }
            "chio-nm" | "hybrid-chio" | "hybrid-chio-nelder-mead" => {
                Ok(Algorithm::HybridChioNelderMead)
            }
            _ => Err(format!("unknown algorithm '{}'", s)),
        }
    }
}

/// Closed interval used for parameter bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    /// Lower end
    pub low: f64,
    /// Upper end
    pub high: f64,
}

impl ParamRange {
    /// Creates a range; see [`FitOptions::validate`] for the checks.
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    fn check(&self, name: &'static str, positive: bool) -> Result<()> {
        let ok = self.low.is_finite()
            && self.high.is_finite()
            && self.low <= self.high
            && (!positive || self.low > 0.0);
        if ok {
            Ok(())
        } else {
            Err(FitError::InvalidRange {
                name,
                low: self.low,
                high: self.high,
            })
        }
    }
}

/// Every knob of a fit, captured by value when a run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Random seed
    pub seed: u64,
    /// Density of the stochastic perturbations
    pub density: Density,
    /// Optimizer selection
    pub algorithm: Algorithm,
    /// Centre-frequency bounds in Hz
    pub frequency_range: ParamRange,
    /// Q bounds
    pub q_range: ParamRange,
    /// Gain bounds in dB
    pub gain_range: ParamRange,
    /// Resample onto the perceptual grid
    pub force_grid_conversion: bool,
    /// Auditory band growth ratio
    pub avg_bandwidth: f64,
    /// Iterations of the first stage
    pub iterations: usize,
    /// Iterations of the Nelder-Mead stage in hybrid modes
    pub secondary_iterations: usize,
    /// Population groups (K)
    pub population_k: usize,
    /// Members per group (N)
    pub population_n: usize,
    /// DE crossover probability
    pub de_crossover: f64,
    /// Flower pollination global/local switch probability
    pub flower_switch_probability: f64,
    /// Flower pollination Lévy step scale
    pub flower_step: f64,
    /// CHIO iterations an infected case may stagnate
    pub chio_max_age: usize,
    /// CHIO initially infected cases
    pub chio_initial_infected: usize,
    /// CHIO spreading rate
    pub chio_spreading_rate: f64,
    /// Dimension-adaptive Nelder-Mead coefficients
    pub fmin_dimension_adaptive: bool,
    /// Fit the negated curve
    pub invert_gain: bool,
    /// Percentage applied to the detected band count
    pub model_complexity: f64,
    /// Fixed band count, bypassing detection
    pub band_count: Option<usize>,
    /// Sample rate in Hz
    pub sample_rate: f64,
    /// Evaluate populations on the rayon pool
    pub parallel: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            seed: 1,
            density: Density::Normal,
            algorithm: Algorithm::HybridDeNelderMead,
            frequency_range: ParamRange::new(20.0, 20000.0),
            q_range: ParamRange::new(0.1, 10.0),
            gain_range: ParamRange::new(-12.0, 12.0),
            force_grid_conversion: true,
            avg_bandwidth: 1.005,
            iterations: 1000,
            secondary_iterations: 1000,
            population_k: 5,
            population_n: 10,
            de_crossover: 0.5,
            flower_switch_probability: 0.8,
            flower_step: 0.1,
            chio_max_age: 100,
            chio_initial_infected: 1,
            chio_spreading_rate: 0.05,
            fmin_dimension_adaptive: true,
            invert_gain: false,
            model_complexity: 100.0,
            band_count: None,
            sample_rate: 44100.0,
            parallel: true,
        }
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(FitError::InvalidProbability { name, value })
    }
}

impl FitOptions {
    /// Loads options from a JSON file; missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let options: FitOptions = serde_json::from_str(&text)?;
        options.validate()?;
        Ok(options)
    }

    /// Population size, K x N.
    pub fn population_size(&self) -> usize {
        self.population_k * self.population_n
    }

    /// Settings for the grid normalizer.
    pub fn grid_options(&self) -> GridOptions {
        GridOptions {
            invert: self.invert_gain,
            convert: self.force_grid_conversion,
            avg_bandwidth: self.avg_bandwidth,
            sample_rate: self.sample_rate,
        }
    }

    /// Checks everything that can be checked before a run starts.
    ///
    /// # Errors
    ///
    /// A configuration error ([`FitError::is_config_error`]) for a
    /// non-positive sample rate, an empty, reversed or non-finite range, a
    /// frequency or Q range that is not strictly positive, an upper frequency
    /// at or above Nyquist, a bandwidth ratio not above 1, a probability
    /// outside [0, 1], a non-positive flower step, a zero CHIO age limit or
    /// initial infected count, a non-positive model complexity, a population too
    /// small for the algorithm, or `band_count == Some(0)`.
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(FitError::InvalidSampleRate {
                sample_rate: self.sample_rate,
            });
        }
        self.frequency_range.check("frequency", true)?;
        self.q_range.check("Q", true)?;
        self.gain_range.check("gain", false)?;
        let nyquist = self.sample_rate / 2.0;
        if self.frequency_range.high >= nyquist {
            return Err(FitError::FrequencyAboveNyquist {
                freq: self.frequency_range.high,
                nyquist,
            });
        }
        if !(self.avg_bandwidth.is_finite() && self.avg_bandwidth > 1.0) {
            return Err(FitError::InvalidBandwidthRatio {
                ratio: self.avg_bandwidth,
            });
        }
        check_probability("de_crossover", self.de_crossover)?;
        check_probability("flower_switch_probability", self.flower_switch_probability)?;
        check_probability("chio_spreading_rate", self.chio_spreading_rate)?;
        if !(self.flower_step.is_finite() && self.flower_step > 0.0) {
            return Err(FitError::InvalidParameter {
                name: "flower_step",
                value: self.flower_step,
                requirement: "finite and > 0",
            });
        }
        if self.chio_max_age == 0 {
            return Err(FitError::InvalidParameter {
                name: "chio_max_age",
                value: 0.0,
                requirement: ">= 1",
            });
        }
        if self.chio_initial_infected == 0 {
            return Err(FitError::InvalidParameter {
                name: "chio_initial_infected",
                value: 0.0,
                requirement: ">= 1",
            });
        }
        if !(self.model_complexity.is_finite() && self.model_complexity > 0.0) {
            return Err(FitError::InvalidComplexity {
                percent: self.model_complexity,
            });
        }
        let min = self.algorithm.min_population();
        if self.population_size() < min {
            return Err(FitError::PopulationTooSmall {
                size: self.population_size(),
                min,
                algorithm: self.algorithm.short_name(),
            });
        }
        if self.band_count == Some(0) {
            return Err(FitError::ZeroBands {
                reason: "band_count is 0",
            });
        }
        Ok(())
    }
}

/// Builder for [`FitOptions`].
#[derive(Debug, Clone, Default)]
pub struct FitOptionsBuilder {
    opts: FitOptions,
}

impl FitOptionsBuilder {
    /// Creates a builder with default options.
    pub fn new() -> Self {
        Self::default()
    }
    /// Sets the random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.opts.seed = v;
        self
    }
    /// Sets the perturbation density.
    pub fn density(mut self, v: Density) -> Self {
        self.opts.density = v;
        self
    }
    /// Sets the optimizer selection.
    pub fn algorithm(mut self, v: Algorithm) -> Self {
        self.opts.algorithm = v;
        self
    }
    /// Sets the centre-frequency bounds in Hz.
    pub fn frequency_range(mut self, low: f64, high: f64) -> Self {
        self.opts.frequency_range = ParamRange::new(low, high);
        self
    }
    /// Sets the Q bounds.
    pub fn q_range(mut self, low: f64, high: f64) -> Self {
        self.opts.q_range = ParamRange::new(low, high);
        self
    }
    /// Sets the gain bounds in dB.
    pub fn gain_range(mut self, low: f64, high: f64) -> Self {
        self.opts.gain_range = ParamRange::new(low, high);
        self
    }
    /// Enables or disables perceptual-grid conversion.
    pub fn force_grid_conversion(mut self, v: bool) -> Self {
        self.opts.force_grid_conversion = v;
        self
    }
    /// Sets the auditory band growth ratio.
    pub fn avg_bandwidth(mut self, v: f64) -> Self {
        self.opts.avg_bandwidth = v;
        self
    }
    /// Sets the first-stage iteration budget.
    pub fn iterations(mut self, v: usize) -> Self {
        self.opts.iterations = v;
        self
    }
    /// Sets the Nelder-Mead iteration budget of hybrid modes.
    pub fn secondary_iterations(mut self, v: usize) -> Self {
        self.opts.secondary_iterations = v;
        self
    }
    /// Sets the population shape, K groups of N members.
    pub fn population(mut self, k: usize, n: usize) -> Self {
        self.opts.population_k = k;
        self.opts.population_n = n;
        self
    }
    /// Sets the DE crossover probability.
    pub fn de_crossover(mut self, v: f64) -> Self {
        self.opts.de_crossover = v;
        self
    }
    /// Sets the flower pollination switch probability and step.
    pub fn flower(mut self, switch_probability: f64, step: f64) -> Self {
        self.opts.flower_switch_probability = switch_probability;
        self.opts.flower_step = step;
        self
    }
    /// Sets the CHIO max age, initially infected count and spreading rate.
    pub fn chio(mut self, max_age: usize, initial_infected: usize, spreading_rate: f64) -> Self {
        self.opts.chio_max_age = max_age;
        self.opts.chio_initial_infected = initial_infected;
        self.opts.chio_spreading_rate = spreading_rate;
        self
    }
    /// Enables or disables dimension-adaptive Nelder-Mead.
    pub fn fmin_dimension_adaptive(mut self, v: bool) -> Self {
        self.opts.fmin_dimension_adaptive = v;
        self
    }
    /// Fits the negated curve.
    pub fn invert_gain(mut self, v: bool) -> Self {
        self.opts.invert_gain = v;
        self
    }
    /// Sets the model complexity percentage.
    pub fn model_complexity(mut self, v: f64) -> Self {
        self.opts.model_complexity = v;
        self
    }
    /// Fixes the band count.
    pub fn band_count(mut self, v: usize) -> Self {
        self.opts.band_count = Some(v);
        self
    }
    /// Sets the sample rate.
    pub fn sample_rate(mut self, v: f64) -> Self {
        self.opts.sample_rate = v;
        self
    }
    /// Enables or disables parallel population evaluation.
    pub fn parallel(mut self, v: bool) -> Self {
        self.opts.parallel = v;
        self
    }
    /// Validates and returns the options.
    pub fn build(self) -> Result<FitOptions> {
        self.opts.validate()?;
        Ok(self.opts)
    }
}
