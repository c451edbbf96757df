//! Error types for configuration writes.

use strata_primitives::{Error as SourceError, TransactionId};
use thiserror::Error;

use crate::{TransactionEvent, TransactionState};

/// Result alias for write operations.
pub type MutationResult<T> = Result<T, MutationError>;

/// Errors raised while staging, committing or rolling back writes.
#[derive(Debug, Error)]
pub enum MutationError {
    /// The operation is not allowed in the current state.
    #[error("illegal state: {reason}")]
    IllegalState {
        /// Human-readable reason.
        reason: String,
    },

    /// The transaction lifecycle rejected an event.
    #[error("invalid transaction transition from {from:?} via {event:?}")]
    InvalidTransition {
        /// State prior to the attempted transition.
        from: TransactionState,
        /// Event that triggered the failure.
        event: TransactionEvent,
    },

    /// A source failed to open its staging area. The transaction was rolled back.
    #[error("source `{source_name}` failed to begin transaction {transaction}")]
    Begin {
        /// Name of the failing source.
        source_name: String,
        /// Transaction being started.
        transaction: TransactionId,
        /// Underlying source error.
        source: SourceError,
    },

    /// A source failed to stage a change. The transaction stays open.
    #[error("source `{source_name}` failed to stage a change in transaction {transaction}")]
    Staging {
        /// Name of the failing source.
        source_name: String,
        /// Open transaction.
        transaction: TransactionId,
        /// Underlying source error.
        source: SourceError,
    },

    /// A source failed to commit. The transaction was rolled back.
    #[error("source `{source_name}` failed to commit transaction {transaction}")]
    Commit {
        /// Name of the failing source.
        source_name: String,
        /// Transaction being committed.
        transaction: TransactionId,
        /// Underlying source error.
        source: SourceError,
    },
}

impl MutationError {
    /// Creates an [`IllegalState`](Self::IllegalState) error.
    #[must_use]
    pub fn illegal_state(reason: impl Into<String>) -> Self {
        Self::IllegalState {
            reason: reason.into(),
        }
    }

    pub(crate) fn staging(source_name: &str, transaction: TransactionId, source: SourceError) -> Self {
        Self::Staging {
            source_name: source_name.to_owned(),
            transaction,
            source,
        }
    }
}
