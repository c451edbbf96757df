//! Shared types and traits for layered configuration access.
//!
//! Everything else in the workspace builds on the contracts defined here: a
//! ranked, named [`PropertySource`], its writable counterpart
//! [`MutablePropertySource`], and the [`PropertyValue`] produced when a key is
//! looked up.

#![warn(missing_docs, clippy::pedantic)]

mod change;
mod env;
mod error;
mod ids;
mod property;
mod source;

/// Per-transaction staging record for mutable sources.
pub use change::ConfigChangeContext;
/// Property source backed by the process environment.
pub use env::EnvironmentPropertySource;
/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Identifier for a configuration write transaction.
pub use ids::TransactionId;
/// Resolved value with provenance.
pub use property::PropertyValue;
/// Property source contracts and the map-backed implementation.
pub use source::{
    DEFAULT_ORDINAL, MapPropertySource, MutablePropertySource, ORDINAL_KEY, PropertySource,
    SharedSource,
};
