//! Error type shared by network construction and checked forward passes.

use std::fmt;

/// Returned when a configuration is invalid or an input tensor does not fit
/// the network it is fed to.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// A configured dimension (state_dim, mid_dim, ...) must be positive.
    InvalidDim {
        field: &'static str,
        value: usize,
    },
    /// A numeric parameter is outside its valid range.
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// An input's feature width disagrees with the configured dimension.
    ShapeMismatch {
        input: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Two inputs that are processed row by row have different batch sizes.
    BatchMismatch {
        left: usize,
        right: usize,
    },
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::InvalidDim { field, value } => {
                write!(f, "{} must be > 0, got {}", field, value)
            }
            NetworkError::OutOfRange { field, value, min, max } => {
                write!(f, "{} must be in [{}, {}], got {}", field, min, max, value)
            }
            NetworkError::ShapeMismatch { input, expected, actual } => {
                write!(
                    f,
                    "{} has {} features, network expects {}",
                    input, actual, expected
                )
            }
            NetworkError::BatchMismatch { left, right } => {
                write!(f, "batch sizes differ: {} vs {}", left, right)
            }
        }
    }
}

impl std::error::Error for NetworkError {}

/// Reject a zero dimension.
pub(crate) fn ensure_positive(field: &'static str, value: usize) -> Result<(), NetworkError> {
    if value == 0 {
        return Err(NetworkError::InvalidDim { field, value });
    }
    Ok(())
}

/// Reject a negative or non-finite noise standard deviation.
pub(crate) fn ensure_noise_std(noise_std: f32) -> Result<(), NetworkError> {
    if !(noise_std >= 0.0) || !noise_std.is_finite() {
        return Err(NetworkError::OutOfRange {
            field: "noise_std",
            value: noise_std as f64,
            min: 0.0,
            max: f64::INFINITY,
        });
    }
    Ok(())
}

/// Check the feature width of a `[batch, features]` input.
pub(crate) fn ensure_features(
    input: &'static str,
    dims: [usize; 2],
    expected: usize,
) -> Result<(), NetworkError> {
    if dims[1] != expected {
        return Err(NetworkError::ShapeMismatch {
            input,
            expected,
            actual: dims[1],
        });
    }
    Ok(())
}

/// Check that two `[batch, _]` inputs share the batch dimension.
pub(crate) fn ensure_same_batch(left: [usize; 2], right: [usize; 2]) -> Result<(), NetworkError> {
    if left[0] != right[0] {
        return Err(NetworkError::BatchMismatch {
            left: left[0],
            right: right[0],
        });
    }
    Ok(())
}
