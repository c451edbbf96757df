//! Converter discovery through link-time registration.

use std::fmt;

use crate::ConverterRegistry;

/// A named bundle of converter registrations.
///
/// Plugins are submitted with `inventory::submit!` and applied by
/// [`ConverterRegistry::add_discovered_converters`], at most once per registry.
///
/// ```
/// use strata_convert::{ConverterPlugin, ConverterRegistry};
///
/// fn register(registry: &ConverterRegistry) {
///     registry.register_fn::<u16, _>("port", |raw, _ctx| {
///         Ok(raw.trim().parse().ok())
///     });
/// }
///
/// strata_convert::inventory::submit! {
///     ConverterPlugin::new("docs.port", register)
/// }
///
/// fn main() {
///     let registry = ConverterRegistry::new();
///     registry.add_discovered_converters();
///     assert!(!registry.converters::<u16>().is_empty());
/// }
/// ```
pub struct ConverterPlugin {
    name: &'static str,
    register: fn(&ConverterRegistry),
}

impl ConverterPlugin {
    /// Creates a plugin with a unique name and a registration function.
    #[must_use]
    pub const fn new(name: &'static str, register: fn(&ConverterRegistry)) -> Self {
        Self { name, register }
    }

    /// Returns the plugin name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn apply(&self, registry: &ConverterRegistry) {
        (self.register)(registry);
    }

    pub(crate) fn all() -> impl Iterator<Item = &'static ConverterPlugin> {
        inventory::iter::<ConverterPlugin>.into_iter()
    }
}

impl fmt::Debug for ConverterPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterPlugin")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

inventory::collect!(ConverterPlugin);

inventory::submit! {
    ConverterPlugin::new("strata.builtin", crate::register_builtin_converters)
}
