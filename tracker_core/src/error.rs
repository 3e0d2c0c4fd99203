//! Error type shared by every estimator operation.

/// Failures reported synchronously by the estimator. No operation returns a
/// partial result alongside an error.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("{what} contains a non-finite value")]
    NonFinite { what: &'static str },

    #[error("measurement height must be positive, got {height}")]
    NonPositiveHeight { height: f64 },

    #[error("{what} has {actual} values, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{what} is not symmetric")]
    NotSymmetric { what: &'static str },

    /// Cholesky factorization failed.
    #[error("{what} is not positive definite")]
    NotPositiveDefinite { what: &'static str },

    #[error("{what} has invalid variance {value} at index {index}")]
    NegativeVariance {
        what: &'static str,
        index: usize,
        value: f64,
    },
}

pub type Result<T> = std::result::Result<T, FilterError>;
