//! Error types for the bounded optimizers.
//!
//! Every optimizer validates its bounds and starting population before the
//! first objective evaluation and reports problems through [`OptimError`].

use thiserror::Error;

/// Errors that can occur while setting up or running an optimizer.
#[derive(Debug, Error)]
pub enum OptimError {
    /// Lower and upper bounds have different lengths.
    #[error("bounds mismatch: lower has {lower_len} elements, upper has {upper_len}")]
    BoundsMismatch {
        /// Length of the lower bounds array
        lower_len: usize,
        /// Length of the upper bounds array
        upper_len: usize,
    },

    /// A lower bound exceeds its corresponding upper bound, or a bound is NaN.
    #[error("invalid bounds at index {index}: lower ({lower}) > upper ({upper})")]
    InvalidBounds {
        /// Index of the invalid bound pair
        index: usize,
        /// The lower bound value
        lower: f64,
        /// The upper bound value
        upper: f64,
    },

    /// Starting population does not match the problem dimension.
    #[error("population dimension mismatch: expected {expected} columns, got {got}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension provided
        got: usize,
    },

    /// Starting population has fewer members than the algorithm needs.
    #[error("population size ({pop_size}) must be >= {min}")]
    PopulationTooSmall {
        /// The population size provided
        pop_size: usize,
        /// Minimum population size for the algorithm
        min: usize,
    },

    /// An algorithm parameter is outside its valid range.
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// The rejected value
        value: f64,
    },
}

/// A specialized `Result` type for optimizer operations.
pub type Result<T> = std::result::Result<T, OptimError>;

impl OptimError {
    /// Returns `true` if this is a bounds-related error.
    pub fn is_bounds_error(&self) -> bool {
        matches!(
            self,
            OptimError::BoundsMismatch { .. } | OptimError::InvalidBounds { .. }
        )
    }

    /// Returns `true` if this is a configuration-related error.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            OptimError::PopulationTooSmall { .. } | OptimError::InvalidParameter { .. }
        )
    }

    /// Returns `true` if this is a dimension mismatch error.
    pub fn is_dimension_error(&self) -> bool {
        matches!(self, OptimError::DimensionMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OptimError::BoundsMismatch {
            lower_len: 3,
            upper_len: 5,
        };
        assert_eq!(
            err.to_string(),
            "bounds mismatch: lower has 3 elements, upper has 5"
        );
    }

    #[test]
    fn test_population_error_display() {
        let err = OptimError::PopulationTooSmall {
            pop_size: 2,
            min: 4,
        };
        assert_eq!(err.to_string(), "population size (2) must be >= 4");
    }

    #[test]
    fn test_error_categories() {
        let bounds_err = OptimError::InvalidBounds {
            index: 0,
            lower: 5.0,
            upper: 3.0,
        };
        let config_err = OptimError::InvalidParameter {
            name: "crossover",
            value: 1.5,
        };
        let dim_err = OptimError::DimensionMismatch {
            expected: 9,
            got: 6,
        };

        assert!(bounds_err.is_bounds_error());
        assert!(!bounds_err.is_config_error());
        assert!(config_err.is_config_error());
        assert!(!config_err.is_dimension_error());
        assert!(dim_err.is_dimension_error());
        assert!(!dim_err.is_bounds_error());
    }
}
