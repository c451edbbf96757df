//! Layered configuration resolution.
//!
//! A [`Configuration`] reads through a [`ConfigurationContext`]: the property
//! sources ranked by ordinal, the [`ValueCombinationPolicy`] that reduces the
//! per-source values of a key to one, the [`PropertyFilter`] chain, and the
//! converter registry used for typed access. Default contexts are assembled
//! from a [`ServiceContext`] by the [`ConfigurationProvider`].

#![warn(missing_docs, clippy::pedantic)]

mod combination;
mod configuration;
mod context;
mod error;
mod filter;
mod provider;
mod service;

/// Value combination policies.
pub use combination::{AppendingPolicy, OverridingPolicy, ValueCombinationPolicy};
/// Resolver entry point plus operator and query extension points.
pub use configuration::{ConfigOperator, ConfigQuery, Configuration};
/// Immutable resolution context and its builder.
pub use context::{ConfigurationContext, ConfigurationContextBuilder};
/// Error type and result alias for configuration access.
pub use error::{ConfigError, ConfigResult};
/// Filter chain contract and built-in filters.
pub use filter::{FilterContext, MaskingFilter, PropertyFilter};
/// Process-wide and injectable configuration provider.
pub use provider::ConfigurationProvider;
/// Priority-ranked service registry.
pub use service::{DEFAULT_PRIORITY, ServiceContext, ServicePlugin};
