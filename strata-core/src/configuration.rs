//! The resolver: single-key, typed and bulk access over a context.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use strata_convert::{ConversionContext, TypeKey};
use strata_primitives::PropertyValue;
use tracing::{debug, warn};

use crate::{ConfigError, ConfigResult, ConfigurationContext, FilterContext};

/// Derives a new configuration from an existing one.
pub trait ConfigOperator {
    /// Returns the derived configuration.
    fn apply(&self, config: &Configuration) -> Configuration;
}

impl<F> ConfigOperator for F
where
    F: Fn(&Configuration) -> Configuration,
{
    fn apply(&self, config: &Configuration) -> Configuration {
        (self)(config)
    }
}

/// Computes a value from a configuration without changing it.
pub trait ConfigQuery<R> {
    /// Runs the query.
    fn query(&self, config: &Configuration) -> R;
}

impl<R, F> ConfigQuery<R> for F
where
    F: Fn(&Configuration) -> R,
{
    fn query(&self, config: &Configuration) -> R {
        (self)(config)
    }
}

/// Read access to layered configuration.
///
/// Cheap to clone; clones share the same [`ConfigurationContext`].
#[derive(Clone)]
pub struct Configuration {
    context: Arc<ConfigurationContext>,
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("context", &self.context)
            .finish()
    }
}

impl From<ConfigurationContext> for Configuration {
    fn from(context: ConfigurationContext) -> Self {
        Self::new(Arc::new(context))
    }
}

impl Configuration {
    /// Creates a configuration reading through `context`.
    #[must_use]
    pub fn new(context: Arc<ConfigurationContext>) -> Self {
        Self { context }
    }

    /// Returns the underlying context.
    #[must_use]
    pub fn context(&self) -> &Arc<ConfigurationContext> {
        &self.context
    }

    /// Returns the filtered value of `key`, if any source knows it.
    ///
    /// Meta keys of the form `_<key>.<name>` that no source defines resolve
    /// against the winning value of `<key>`: `_<key>.source` yields the name of
    /// the source that supplied it.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_value(key).map(PropertyValue::into_value)
    }

    /// Returns the filtered value of `key` with its provenance.
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<PropertyValue> {
        if let Some(value) = self.collect(key) {
            return self.apply_filters(value, &FilterContext::single(key));
        }

        let (described, name) = PropertyValue::parse_meta_key(key)?;
        let winner = self.get_value(described)?;
        let meta = winner.meta_entries().remove(key)?;
        debug!(key, described, name, "resolved meta key");
        self.apply_filters(
            PropertyValue::new(key, meta, winner.source()),
            &FilterContext::single(key),
        )
    }

    /// Returns the value of `key` or `default` when no source knows it.
    #[must_use]
    pub fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_owned())
    }

    /// Returns the value of `key` converted to `T`.
    ///
    /// Converters are tried in the registry's resolution order and the first
    /// value produced wins. For `String` the raw value is returned when no
    /// converter produces one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Conversion`] when the key has a value but no
    /// converter produced a `T`; the error lists every supported format the
    /// tried converters announced.
    pub fn get_as<T: 'static>(&self, key: &str) -> ConfigResult<Option<T>> {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        self.convert(key, raw).map(Some)
    }

    /// Returns the value of `key` converted to `T`, or `default` when no source
    /// knows the key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Conversion`] when the present value cannot be
    /// converted.
    pub fn get_as_or_default<T: 'static>(&self, key: &str, default: T) -> ConfigResult<T> {
        Ok(self.get_as(key)?.unwrap_or(default))
    }

    /// Returns every property, higher-ordinal sources overriding lower ones.
    ///
    /// Sources whose bulk read fails are skipped. Filters run on every entry
    /// and vetoed entries are dropped.
    #[must_use]
    pub fn properties(&self) -> HashMap<String, String> {
        let mut merged: HashMap<String, PropertyValue> = HashMap::new();
        for source in self.context.property_sources().iter().rev() {
            match source.properties() {
                Ok(properties) => {
                    for (key, value) in properties {
                        let value = PropertyValue::new(key.as_str(), value, source.name());
                        merged.insert(key, value);
                    }
                }
                Err(err) => {
                    warn!(source = source.name(), error = %err, "skipping source in bulk read");
                }
            }
        }

        merged
            .into_iter()
            .filter_map(|(key, value)| {
                let filtered = self.apply_filters(value, &FilterContext::bulk(&key))?;
                Some((key, filtered.into_value()))
            })
            .collect()
    }

    /// Applies an operator and returns the configuration it produces.
    #[must_use]
    pub fn with<O: ConfigOperator + ?Sized>(&self, operator: &O) -> Configuration {
        operator.apply(self)
    }

    /// Runs a query against this configuration.
    pub fn query<R, Q: ConfigQuery<R> + ?Sized>(&self, query: &Q) -> R {
        query.query(self)
    }

    fn collect(&self, key: &str) -> Option<PropertyValue> {
        let policy = self.context.combination_policy();
        let mut current = None;
        for source in self.context.property_sources() {
            let previous = current.clone();
            current = match policy.collect(current, key, source.as_ref()) {
                Ok(value) => value,
                Err(err) => {
                    warn!(key, source = source.name(), error = %err, "property lookup failed");
                    previous
                }
            };
        }
        current
    }

    fn apply_filters(&self, value: PropertyValue, ctx: &FilterContext<'_>) -> Option<PropertyValue> {
        let mut current = value;
        for filter in self.context.filters() {
            match filter.filter(&current, ctx) {
                Ok(Some(next)) => current = next,
                Ok(None) => {
                    debug!(key = ctx.key(), filter = filter.name(), "value vetoed by filter");
                    return None;
                }
                Err(err) => {
                    warn!(key = ctx.key(), filter = filter.name(), error = %err, "filter failed");
                }
            }
        }
        Some(current)
    }

    fn convert<T: 'static>(&self, key: &str, raw: String) -> ConfigResult<T> {
        let target = TypeKey::of::<T>();
        let mut ctx = ConversionContext::new(key, target)
            .with_property_sources(self.context.property_source_names());

        for converter in self.context.converters().converters::<T>() {
            match converter.convert(&raw, &mut ctx) {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(err) => {
                    debug!(key, converter = converter.name(), error = %err, "converter failed");
                }
            }
        }

        if target.is::<String>() {
            let boxed: Box<dyn Any> = Box::new(raw.clone());
            if let Ok(value) = boxed.downcast::<T>() {
                return Ok(*value);
            }
        }

        Err(ConfigError::Conversion {
            key: key.to_owned(),
            value: raw,
            target: target.name().to_owned(),
            supported_formats: ctx.supported_formats().to_vec(),
        })
    }
}
