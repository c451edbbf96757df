//! Layered, typed and transactional configuration access.
//!
//! Depend on this crate via `cargo add strata`. It bundles the workspace crates
//! behind feature flags so applications can leave out the parts they do not
//! need.
//!
//! ```
//! use strata::config::{Configuration, ConfigurationContext};
//! use strata::primitives::MapPropertySource;
//!
//! let config: Configuration = ConfigurationContext::builder()
//!     .with_source(MapPropertySource::new("defaults", [("port", "8080")]))
//!     .with_source(MapPropertySource::new("overrides", [("port", "9090")]).with_ordinal(10))
//!     .build()
//!     .into();
//!
//! assert_eq!(config.get_as::<u16>("port").unwrap(), Some(9090));
//! assert_eq!(config.get("_port.source").as_deref(), Some("overrides"));
//! ```

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use strata_primitives as primitives;

/// Type conversion (enabled by `convert` feature).
#[cfg(feature = "convert")]
pub use strata_convert as convert;

/// Configuration resolution (enabled by `core` feature).
#[cfg(feature = "core")]
pub use strata_core as config;

/// Transactional writes (enabled by `mutable` feature).
#[cfg(feature = "mutable")]
pub use strata_mutable as mutable;

/// Logging bootstrap (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use strata_telemetry as telemetry;
