//! Error types for the correlation and risk engine.

use thiserror::Error;

/// Result type alias using `EngineError`.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by the numerical core. Every variant is an invalid-input
/// condition; the core performs no I/O.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Two series passed to a pairwise computation have different lengths.
    #[error("Series length mismatch: {left} vs {right} samples")]
    LengthMismatch {
        /// Length of the first series.
        left: usize,
        /// Length of the second series.
        right: usize,
    },

    /// A series (or window) is too short for a correlation.
    #[error("Too few samples: got {got}, need at least {min}")]
    TooFewSamples {
        /// Samples supplied.
        got: usize,
        /// Minimum required.
        min: usize,
    },

    /// Every allocation in the portfolio is zero, so the score is undefined.
    #[error("Total allocation is zero; portfolio risk is undefined")]
    ZeroAllocation,

    /// Asset ordering does not match the matrix dimension.
    #[error("Dimension mismatch: matrix is {matrix}x{matrix}, asset order has {order} entries")]
    DimensionMismatch {
        /// Matrix dimension.
        matrix: usize,
        /// Length of the supplied asset order.
        order: usize,
    },

    /// Asset ordering names the right number of ids but not the matrix's ids
    /// in the matrix's order.
    #[error("Asset order mismatch at position {position}: expected '{expected}', found '{found}'")]
    OrderMismatch {
        /// First position that differs.
        position: usize,
        /// Id the matrix has at that position.
        expected: String,
        /// Id the supplied order has at that position.
        found: String,
    },
}

impl EngineError {
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::LengthMismatch { .. }
                | Self::TooFewSamples { .. }
                | Self::ZeroAllocation
                | Self::DimensionMismatch { .. }
                | Self::OrderMismatch { .. }
        )
    }
}
