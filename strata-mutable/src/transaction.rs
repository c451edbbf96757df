//! Lifecycle state machine for write transactions.

use chrono::{DateTime, Utc};
use strata_primitives::TransactionId;
use tracing::debug;

use crate::{MutationError, MutationResult};

/// States a transaction moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// No transaction is open.
    Idle,
    /// Writes are being staged.
    Open,
    /// Staged writes were applied.
    Committed,
    /// Staged writes were discarded.
    RolledBack,
}

impl TransactionState {
    /// Returns `true` once the transaction has finished.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack)
    }
}

/// Events that drive transaction transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionEvent {
    /// Open a transaction. Joining an open transaction is allowed.
    Begin,
    /// Apply the staged writes.
    Commit,
    /// Discard the staged writes.
    Rollback,
    /// Release a finished transaction.
    Release,
}

/// Tracks the transaction owned by one mutable configuration.
#[derive(Debug, Clone)]
pub struct TransactionLifecycle {
    state: TransactionState,
    id: Option<TransactionId>,
    started_at: Option<DateTime<Utc>>,
}

impl Default for TransactionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionLifecycle {
    /// Creates an idle lifecycle.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: TransactionState::Idle,
            id: None,
            started_at: None,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> TransactionState {
        self.state
    }

    /// Returns the open transaction id, if any.
    #[must_use]
    pub const fn id(&self) -> Option<TransactionId> {
        self.id
    }

    /// Returns when the current transaction was opened.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Opens a transaction with a fresh id, or returns the open one.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::InvalidTransition`] when a finished transaction
    /// has not been released.
    pub fn begin(&mut self) -> MutationResult<TransactionId> {
        if let (TransactionState::Open, Some(id)) = (self.state, self.id) {
            return Ok(id);
        }
        self.transition(TransactionEvent::Begin)?;
        let id = TransactionId::random();
        self.id = Some(id);
        self.started_at = Some(Utc::now());
        Ok(id)
    }

    /// Applies an event, returning the resulting state.
    ///
    /// Releasing clears the transaction id.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::InvalidTransition`] when the event is not
    /// allowed from the current state.
    pub fn transition(&mut self, event: TransactionEvent) -> MutationResult<TransactionState> {
        let next = match (self.state, event) {
            (TransactionState::Idle | TransactionState::Open, TransactionEvent::Begin) => {
                Some(TransactionState::Open)
            }
            (TransactionState::Open, TransactionEvent::Commit) => Some(TransactionState::Committed),
            (TransactionState::Open, TransactionEvent::Rollback) => {
                Some(TransactionState::RolledBack)
            }
            (TransactionState::Committed | TransactionState::RolledBack, TransactionEvent::Release) => {
                Some(TransactionState::Idle)
            }
            _ => None,
        };

        let Some(next_state) = next else {
            return Err(MutationError::InvalidTransition {
                from: self.state,
                event,
            });
        };

        if next_state != self.state {
            debug!(
                transaction = ?self.id,
                ?self.state,
                ?next_state,
                ?event,
                "transaction lifecycle transition"
            );
            self.state = next_state;
        }
        if next_state == TransactionState::Idle {
            self.id = None;
            self.started_at = None;
        }

        Ok(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_commit_release() {
        let mut lifecycle = TransactionLifecycle::new();
        assert_eq!(lifecycle.state(), TransactionState::Idle);

        let id = lifecycle.begin().unwrap();
        assert_eq!(lifecycle.begin().unwrap(), id);
        assert!(lifecycle.started_at().is_some());

        lifecycle.transition(TransactionEvent::Commit).unwrap();
        assert!(lifecycle.state().is_terminal());
        assert_eq!(lifecycle.id(), Some(id));

        lifecycle.transition(TransactionEvent::Release).unwrap();
        assert_eq!(lifecycle.state(), TransactionState::Idle);
        assert_eq!(lifecycle.id(), None);
        assert_ne!(lifecycle.begin().unwrap(), id);
    }

    #[test]
    fn terminal_transaction_rejects_operations() {
        let mut lifecycle = TransactionLifecycle::new();
        lifecycle.begin().unwrap();
        lifecycle.transition(TransactionEvent::Rollback).unwrap();

        let err = lifecycle
            .transition(TransactionEvent::Commit)
            .expect_err("commit after rollback");
        assert!(matches!(
            err,
            MutationError::InvalidTransition {
                from: TransactionState::RolledBack,
                event: TransactionEvent::Commit,
            }
        ));
        assert!(lifecycle.begin().is_err());
    }

    #[test]
    fn idle_rejects_commit() {
        let mut lifecycle = TransactionLifecycle::new();
        assert!(lifecycle.transition(TransactionEvent::Commit).is_err());
        assert!(lifecycle.transition(TransactionEvent::Release).is_err());
    }
}
