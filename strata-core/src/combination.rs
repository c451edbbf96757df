//! Policies reducing the per-source values of a key to one.

use strata_primitives::{PropertySource, PropertyValue, Result};

/// Decides how the value a source offers for a key combines with what has been
/// collected so far.
///
/// The resolver calls [`collect`](Self::collect) once per source, highest
/// ordinal first, threading the returned value into the next call as
/// `previous`.
pub trait ValueCombinationPolicy: Send + Sync {
    /// Returns the combined value after consulting `source`.
    ///
    /// # Errors
    ///
    /// Propagates the source's read failure. The resolver logs it and keeps
    /// `previous`.
    fn collect(
        &self,
        previous: Option<PropertyValue>,
        key: &str,
        source: &dyn PropertySource,
    ) -> Result<Option<PropertyValue>>;
}

/// The highest-precedence source that knows a key wins; lower sources are not
/// consulted once a value is found.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverridingPolicy;

impl ValueCombinationPolicy for OverridingPolicy {
    fn collect(
        &self,
        previous: Option<PropertyValue>,
        key: &str,
        source: &dyn PropertySource,
    ) -> Result<Option<PropertyValue>> {
        match previous {
            Some(value) => Ok(Some(value)),
            None => source.get(key),
        }
    }
}

/// Joins the values of every source that knows a key, highest precedence
/// first. Provenance stays with the highest-precedence source.
#[derive(Debug, Clone)]
pub struct AppendingPolicy {
    separator: String,
}

impl AppendingPolicy {
    /// Metadata entry listing every contributing source.
    pub const SOURCES_META: &'static str = "sources";

    /// Creates a policy joining values with `separator`.
    #[must_use]
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    /// Returns the separator.
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }
}

impl Default for AppendingPolicy {
    fn default() -> Self {
        Self::new(",")
    }
}

impl ValueCombinationPolicy for AppendingPolicy {
    fn collect(
        &self,
        previous: Option<PropertyValue>,
        key: &str,
        source: &dyn PropertySource,
    ) -> Result<Option<PropertyValue>> {
        let Some(found) = source.get(key)? else {
            return Ok(previous);
        };
        let Some(previous) = previous else {
            let sources = found.source().to_owned();
            return Ok(Some(found.with_metadata(Self::SOURCES_META, sources)));
        };

        let sources = match previous.metadata().get(Self::SOURCES_META) {
            Some(list) => format!("{list}{}{}", self.separator, found.source()),
            None => format!("{}{}{}", previous.source(), self.separator, found.source()),
        };
        let joined = format!("{}{}{}", previous.value(), self.separator, found.value());
        Ok(Some(
            previous
                .with_value(joined)
                .with_metadata(Self::SOURCES_META, sources),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use strata_primitives::{Error, MapPropertySource};
    use std::collections::HashMap;

    struct Broken;

    impl PropertySource for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn get(&self, _key: &str) -> Result<Option<PropertyValue>> {
            Err(Error::source_read("broken", "disk gone"))
        }

        fn properties(&self) -> Result<HashMap<String, String>> {
            Err(Error::source_read("broken", "disk gone"))
        }
    }

    #[test]
    fn overriding_keeps_first_value_without_consulting_source() {
        let previous = PropertyValue::new("a", "1", "high");
        let kept = OverridingPolicy
            .collect(Some(previous.clone()), "a", &Broken)
            .unwrap();
        assert_eq!(kept, Some(previous));

        let low = MapPropertySource::new("low", [("a", "2")]);
        let found = OverridingPolicy.collect(None, "a", &low).unwrap().unwrap();
        assert_eq!(found.value(), "2");
        assert_eq!(found.source(), "low");
    }

    #[test]
    fn appending_joins_in_precedence_order() {
        let policy = AppendingPolicy::new(";");
        let high = MapPropertySource::new("high", [("path", "/opt")]);
        let low = MapPropertySource::new("low", [("path", "/usr")]);
        let none = MapPropertySource::new("none", [("other", "x")]);

        let value = policy.collect(None, "path", &high).unwrap();
        let value = policy.collect(value, "path", &none).unwrap();
        let value = policy.collect(value, "path", &low).unwrap().unwrap();

        assert_eq!(value.value(), "/opt;/usr");
        assert_eq!(value.source(), "high");
        assert_eq!(
            value.metadata().get(AppendingPolicy::SOURCES_META).map(String::as_str),
            Some("high;low")
        );
    }

    #[test]
    fn appending_propagates_read_failures() {
        assert!(AppendingPolicy::default().collect(None, "a", &Broken).is_err());
    }
}
