//! Conversion of raw configuration strings into typed values.
//!
//! The [`ConverterRegistry`] holds [`Converter`] implementations keyed by
//! target type and resolves, for any requested type, the ordered list of
//! converters that can produce it: direct registrations first, then a declared
//! factory method, then converters registered for declared subtypes.

#![warn(missing_docs, clippy::pedantic)]

mod builtin;
mod context;
mod converter;
mod discovery;
mod error;
mod factory;
mod hierarchy;
mod registry;
mod type_key;

/// Built-in converters for primitive types.
pub use builtin::{EnumConverter, register_builtin_converters};
/// Per-call conversion metadata.
pub use context::ConversionContext;
/// Converter contract and typed handles returned by the registry.
pub use converter::{Converter, ConverterHandle, ConverterId, ConverterOrigin, ErasedValue};
/// Discovery plugins applied by [`ConverterRegistry::add_discovered_converters`].
pub use discovery::ConverterPlugin;
/// Error type and result alias for conversions.
pub use error::{ConvertError, ConvertResult};
/// Declared single-string factory methods.
pub use factory::{FactoryMethod, FactoryName};
/// Explicit supertype and interface declarations.
pub use hierarchy::TypeDescriptor;
/// Registry resolving converters per target type.
pub use registry::ConverterRegistry;
/// Runtime type identity.
pub use type_key::TypeKey;

#[doc(hidden)]
pub use inventory;
