//! Values resolved from property sources.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single value together with the name of the source that supplied it.
///
/// Absence of a key is modelled as `Option<PropertyValue>::None`; an empty
/// string is a present value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValue {
    key: String,
    value: String,
    source: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, String>,
}

impl PropertyValue {
    /// Creates a value for `key` supplied by the named source.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            source: source.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attaches a metadata entry, replacing any previous entry with the same name.
    #[must_use]
    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }

    /// Returns a copy carrying `value` while keeping key, provenance and metadata.
    #[must_use]
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..self.clone()
        }
    }

    /// Returns the key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the raw string value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the name of the source that supplied the value.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the per-key metadata.
    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Consumes the value and returns the raw string.
    #[must_use]
    pub fn into_value(self) -> String {
        self.value
    }

    /// Renders provenance and metadata as `_<key>.<name>` entries.
    #[must_use]
    pub fn meta_entries(&self) -> BTreeMap<String, String> {
        let mut entries = BTreeMap::new();
        entries.insert(Self::meta_key(&self.key, "source"), self.source.clone());
        for (name, value) in &self.metadata {
            entries.insert(Self::meta_key(&self.key, name), value.clone());
        }
        entries
    }

    /// Builds the meta key `_<key>.<name>`.
    #[must_use]
    pub fn meta_key(key: &str, name: &str) -> String {
        format!("_{key}.{name}")
    }

    /// Splits a meta key into the described key and the meta entry name.
    ///
    /// Returns `None` for keys that do not start with `_` or carry no `.`.
    #[must_use]
    pub fn parse_meta_key(meta_key: &str) -> Option<(&str, &str)> {
        let rest = meta_key.strip_prefix('_')?;
        let (key, name) = rest.rsplit_once('.')?;
        if key.is_empty() || name.is_empty() {
            return None;
        }
        Some((key, name))
    }
}
