//! Fit parametric peaking (bell) filters to a target frequency response.
//!
//! The pipeline runs once per request:
//!
//! 1. [`grid::normalize`] optionally negates the target and resamples it onto
//!    a perceptual grid of auditory bands.
//! 2. [`InitialGuess`] picks the band count from the curve's extrema and
//!    seeds centre frequency, Q and gain for each band, then spreads a
//!    starting population around the seeds.
//! 3. [`PeakingCost`] scores a parameter vector by the mean squared error of
//!    the combined filter response against the target.
//! 4. [`PeakingFitter`] runs the selected optimizer, or a global search
//!    followed by a Nelder-Mead polish, and reports progress through a
//!    [`FitObserver`].
//! 5. The best vector is converted into [`DeflatedBiquad`] descriptors.
//!
//! # Example
//!
//! ```rust
//! use math_audio_peq_fit::{Algorithm, FitOptionsBuilder, fit_peaking};
//!
//! let freq: Vec<f64> = (0..120).map(|i| 20.0 * 1000f64.powf(i as f64 / 119.0)).collect();
//! let gain: Vec<f64> = freq
//!     .iter()
//!     .map(|f| 4.0 * (-(f / 2000.0).log2().powi(2) * 3.0).exp())
//!     .collect();
//!
//! let options = FitOptionsBuilder::new()
//!     .algorithm(Algorithm::HybridDeNelderMead)
//!     .force_grid_conversion(false)
//!     .band_count(1)
//!     .iterations(100)
//!     .secondary_iterations(200)
//!     .build()
//!     .expect("valid options");
//!
//! let report = fit_peaking(&freq, &gain, &options).expect("fit succeeds");
//! assert_eq!(report.num_bands(), 1);
//! assert!(report.cost < 1.0);
//! ```
#![warn(missing_docs)]

pub mod error;
pub use error::{FitError, Result};

/// Auditory-band partition of a dense grid.
pub mod auditory;
/// Peaking biquad coefficients and result descriptors.
pub mod biquad;
/// Cooperative cancellation.
pub mod cancel;
/// Fit options and algorithm selection.
pub mod config;
/// Mean-squared-error objective.
pub mod cost;
/// Validated response curves.
pub mod curve;
/// Local maxima and minima detection.
pub mod extrema;
/// Pipeline orchestration.
pub mod fit;
/// Grid classification and perceptual-grid conversion.
pub mod grid;
/// Initial guess and starting population.
pub mod guess;
/// Linear interpolation helpers.
pub mod interpolation;
/// Progress events.
pub mod observer;

pub use biquad::{Coefficients, DeflatedBiquad, FilterType};
pub use cancel::CancelToken;
pub use config::{Algorithm, FitOptions, FitOptionsBuilder, ParamRange};
pub use cost::PeakingCost;
pub use curve::ResponseCurve;
pub use fit::{FitReport, PeakingFitter, StageSummary, fit_peaking};
pub use grid::GridKind;
pub use guess::InitialGuess;
pub use math_audio_optimizers::Density;
pub use observer::{ChannelObserver, FitEvent, FitObserver};
