//! Property source contracts.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::{ConfigChangeContext, PropertyValue, Result, TransactionId};

/// Ordinal used when a source does not declare one.
pub const DEFAULT_ORDINAL: i32 = 0;

/// Property key a source may carry to declare its own ordinal.
pub const ORDINAL_KEY: &str = "strata.ordinal";

/// Shared, thread-safe handle to a property source.
pub type SharedSource = Arc<dyn PropertySource>;

/// Named, ranked provider of string-valued properties.
///
/// Implementations are expected to have loaded their data before they are
/// queried; lookups must not block on I/O and must be safe for unsynchronised
/// concurrent reads.
pub trait PropertySource: Send + Sync {
    /// Stable name used for provenance metadata.
    fn name(&self) -> &str;

    /// Precedence rank; higher ordinals override lower ones.
    fn ordinal(&self) -> i32 {
        DEFAULT_ORDINAL
    }

    /// Looks up a single key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceRead`](crate::Error::SourceRead) when the backing
    /// data cannot be read. Callers treat this as "key not found" for this
    /// source only.
    fn get(&self, key: &str) -> Result<Option<PropertyValue>>;

    /// Returns every property this source knows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceRead`](crate::Error::SourceRead) when the backing
    /// data cannot be read.
    fn properties(&self) -> Result<HashMap<String, String>>;

    /// Whether [`properties`](PropertySource::properties) returns the complete key set.
    fn is_scannable(&self) -> bool {
        true
    }

    /// Returns the writable view of this source, if it has one.
    fn as_mutable(&self) -> Option<&dyn MutablePropertySource> {
        None
    }
}

/// Property source that can stage writes under a transaction id.
///
/// Staged changes become visible through [`PropertySource::get`] only after
/// [`commit_transaction`](MutablePropertySource::commit_transaction).
pub trait MutablePropertySource: PropertySource {
    /// Whether `key` may be written through this source.
    fn is_writable(&self, key: &str) -> bool;

    /// Whether `key` may be removed through this source.
    fn is_removable(&self, key: &str) -> bool;

    /// Opens a staging area for `transaction`.
    ///
    /// # Errors
    ///
    /// Returns an error when staging cannot be started.
    fn start_transaction(&self, transaction: &TransactionId) -> Result<()>;

    /// Stages a write.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown transactions or read-only keys.
    fn put(&self, transaction: &TransactionId, key: &str, value: &str) -> Result<()>;

    /// Stages several writes.
    ///
    /// # Errors
    ///
    /// Stops at the first failing write and returns its error.
    fn put_all(&self, transaction: &TransactionId, properties: &BTreeMap<String, String>) -> Result<()> {
        for (key, value) in properties {
            self.put(transaction, key, value)?;
        }
        Ok(())
    }

    /// Stages a removal.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown transactions or read-only keys.
    fn remove(&self, transaction: &TransactionId, key: &str) -> Result<()>;

    /// Applies every change staged under `transaction`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown transactions or when applying fails.
    fn commit_transaction(&self, transaction: &TransactionId) -> Result<()>;

    /// Discards every change staged under `transaction`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown transactions.
    fn rollback_transaction(&self, transaction: &TransactionId) -> Result<()>;

    /// Returns a snapshot of the changes staged under `transaction`.
    fn config_change_context(&self, transaction: &TransactionId) -> Option<ConfigChangeContext>;
}

/// Immutable source over an in-memory map.
#[derive(Debug, Clone)]
pub struct MapPropertySource {
    name: String,
    ordinal: i32,
    properties: HashMap<String, String>,
}

impl MapPropertySource {
    /// Creates a source from a map.
    ///
    /// The ordinal is read from the [`ORDINAL_KEY`] entry when present and
    /// numeric, otherwise [`DEFAULT_ORDINAL`] applies.
    #[must_use]
    pub fn new<I, K, V>(name: impl Into<String>, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let properties: HashMap<String, String> = properties
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let ordinal = properties
            .get(ORDINAL_KEY)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(DEFAULT_ORDINAL);
        Self {
            name: name.into(),
            ordinal,
            properties,
        }
    }

    /// Overrides the ordinal.
    #[must_use]
    pub fn with_ordinal(mut self, ordinal: i32) -> Self {
        self.ordinal = ordinal;
        self
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordinal(&self) -> i32 {
        self.ordinal
    }

    fn get(&self, key: &str) -> Result<Option<PropertyValue>> {
        Ok(self
            .properties
            .get(key)
            .map(|value| PropertyValue::new(key, value.as_str(), self.name.as_str())))
    }

    fn properties(&self) -> Result<HashMap<String, String>> {
        Ok(self.properties.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_from_properties() {
        let source = MapPropertySource::new("defaults", [(ORDINAL_KEY, "250"), ("a", "1")]);
        assert_eq!(source.ordinal(), 250);

        let source = MapPropertySource::new("defaults", [(ORDINAL_KEY, "high")]);
        assert_eq!(source.ordinal(), DEFAULT_ORDINAL);
    }

    #[test]
    fn lookup_reports_source_name() {
        let source = MapPropertySource::new("defaults", [("a", "1")]).with_ordinal(7);
        let value = source.get("a").unwrap().expect("present");
        assert_eq!(value.value(), "1");
        assert_eq!(value.source(), "defaults");
        assert!(source.get("missing").unwrap().is_none());
        assert_eq!(source.ordinal(), 7);
        assert!(source.as_mutable().is_none());
    }

    #[test]
    fn empty_string_is_present() {
        let source = MapPropertySource::new("defaults", [("blank", "")]);
        let value = source.get("blank").unwrap().expect("present");
        assert_eq!(value.value(), "");
    }
}
