use crate::analysis::Floor;

/// The Toeplitz-plus-Hankel solver met a (near-)singular 2x2 pivot.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("determinant of the normal matrix is too small ({determinant:e})")]
pub struct SingularMatrix {
    /// Determinant of the offending pivot block.
    pub determinant: f64,
}

/// Errors of the analysis engine.
///
/// Configuration problems are reported before any numeric work; numerical
/// failures are reported for the frame being analyzed. Running out of
/// iterations is not an error, see [`Status`](crate::analysis::Status).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    /// FFT length is not a power of two, or is too short for the transform.
    #[error("FFT length must be a power of 2 and at least 4 (8 for real input); got {0}")]
    InvalidFftLength(usize),
    /// The frame handed to the estimator is shorter than its configuration requires.
    #[error("Frame length is invalid; expected {expected}, got {actual}")]
    InvalidFrameLength { expected: usize, actual: usize },
    /// The order does not fit in the frame (the normal equations need `2m` lags).
    #[error("Order {order} is too large for frame length {frame_length}")]
    OrderTooLarge { order: usize, frame_length: usize },
    /// Absolute floor must be non-negative, relative floor must be negative.
    #[error("Invalid periodogram floor {0:?}")]
    InvalidFloor(Floor),
    /// Unknown input type code.
    #[error("Input type {0} is not supported")]
    InvalidInputType(u8),
    /// Unknown output format code.
    #[error("Output format {0} is not supported")]
    InvalidOutputFormat(u8),
    /// Recursion order of the all-pass expansion must satisfy `2m <= n < flng`.
    #[error("Recursion order {n} is out of range for order {order} and frame length {frame_length}")]
    InvalidRecursionOrder {
        n: usize,
        order: usize,
        frame_length: usize,
    },
    /// A periodogram bin is zero or negative and cannot be log-transformed.
    #[error("Periodogram has non-positive value at bin {index}; configure a floor")]
    NonPositivePeriodogram { index: usize },
    /// Toeplitz-plus-Hankel solve failed inside the Newton-Raphson loop.
    #[error("Error in theq() at iteration {iteration}: {source}")]
    SingularSystem {
        iteration: usize,
        #[source]
        source: SingularMatrix,
    },
    /// Levinson-Durbin residual energy vanished (or became NaN).
    #[error("Levinson-Durbin residual {residual} is too small at order {order}")]
    ResidualTooSmall { order: usize, residual: f64 },
}

impl AnalysisError {
    /// Whether the error concerns the numbers of one frame rather than the configuration.
    ///
    /// Stream drivers may skip such frames and keep going.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            Self::NonPositivePeriodogram { .. }
                | Self::SingularSystem { .. }
                | Self::ResidualTooSmall { .. }
        )
    }
}
