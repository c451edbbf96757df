//! Transactional writes over layered configuration.
//!
//! [`MutableConfiguration`] stages writes on the writable property sources of a
//! configuration under one [`TransactionId`](strata_primitives::TransactionId)
//! and commits or rolls them back together. Which sources receive a write is
//! decided by a [`ChangePropagationPolicy`].

#![warn(missing_docs, clippy::pedantic)]

mod configuration;
mod error;
mod memory;
mod policy;
mod transaction;

/// Writable configuration view.
pub use configuration::MutableConfiguration;
/// Error type and result alias for write operations.
pub use error::{MutationError, MutationResult};
/// In-memory mutable property source.
pub use memory::InMemoryPropertySource;
/// Change propagation policies.
pub use policy::{
    ApplyAll, ApplyMostSignificantOnly, ApplyNone, ApplySelective, ChangePropagationPolicy,
};
/// Transaction lifecycle state machine.
pub use transaction::{TransactionEvent, TransactionLifecycle, TransactionState};
