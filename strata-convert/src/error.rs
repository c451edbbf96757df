//! Error types for conversions.

use thiserror::Error;

use crate::TypeKey;

/// Result alias for converter operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Errors produced while converting a raw string.
///
/// Converters signal "this input is not mine" with `Ok(None)`; an error means
/// the converter recognised the input but failed to produce a value.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The converter failed.
    #[error("converter `{converter}` failed: {reason}")]
    Failed {
        /// Name of the failing converter.
        converter: String,
        /// Human-readable reason.
        reason: String,
    },

    /// A type-erased converter produced a value of an unexpected type.
    #[error("converter `{converter}` did not produce a `{expected}`")]
    TypeMismatch {
        /// Name of the converter.
        converter: String,
        /// Type the caller asked for.
        expected: TypeKey,
    },
}

impl ConvertError {
    /// Creates a failure for the named converter.
    #[must_use]
    pub fn failed(converter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            converter: converter.into(),
            reason: reason.into(),
        }
    }
}
