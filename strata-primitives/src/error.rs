//! Shared error definitions for property sources and transactions.

use thiserror::Error;
use uuid::Error as UuidError;

use crate::TransactionId;

/// Result alias used by property source implementations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by property sources while reading or staging values.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided transaction identifier could not be parsed.
    #[error("invalid transaction id: {source}")]
    InvalidTransactionId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// A property source failed to read its backing data.
    #[error("property source `{source_name}` failed: {reason}")]
    SourceRead {
        /// Name of the failing source.
        source_name: String,
        /// Human-readable reason for the failure.
        reason: String,
    },

    /// The source was asked to operate on a transaction it never started.
    #[error("property source `{source_name}` has no open transaction {transaction}")]
    UnknownTransaction {
        /// Name of the source.
        source_name: String,
        /// Identifier that was not recognised.
        transaction: TransactionId,
    },

    /// The source already staged changes for this transaction.
    #[error("property source `{source_name}` already started transaction {transaction}")]
    TransactionExists {
        /// Name of the source.
        source_name: String,
        /// Identifier that was started twice.
        transaction: TransactionId,
    },

    /// The key may not be written or removed through this source.
    #[error("key `{key}` is read-only in property source `{source_name}`")]
    ReadOnly {
        /// Name of the source.
        source_name: String,
        /// Offending key.
        key: String,
    },
}

impl Error {
    /// Creates a read failure for the named source.
    #[must_use]
    pub fn source_read(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceRead {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}
