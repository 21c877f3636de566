use thiserror::Error;

/// Errors surfaced at construction time or when combining incompatible
/// sketches. Insertion and counting never fail.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum Error {
    /// Requested precision is outside the supported `4..=25` range.
    #[error("precision {0} is outside the supported range 4..=25")]
    InvalidPrecision(u8),
    /// Requested error rate cannot be met by any supported precision.
    #[error("error rate {0} is outside the achievable range [0.00025390625, 0.26]")]
    ErrorRateOutOfBounds(f64),
    /// The two sketches were built with different precisions.
    #[error("precision mismatch: expected {expected}, got {actual}")]
    PrecisionMismatch {
        /// Precision of the receiving sketch.
        expected: u8,
        /// Precision of the other sketch.
        actual: u8,
    },
}
