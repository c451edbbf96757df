//! Mutable property source held in memory.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, RwLock};

use strata_primitives::{
    ConfigChangeContext, DEFAULT_ORDINAL, Error, MutablePropertySource, PropertySource,
    PropertyValue, Result, TransactionId,
};
use tracing::debug;

/// A writable source keeping committed properties and one staging area per
/// open transaction.
///
/// Staged changes become visible only on commit, which applies additions and
/// then removals under a single write lock. Keys starting with a read-only
/// prefix can be neither written nor removed.
pub struct InMemoryPropertySource {
    name: String,
    ordinal: i32,
    read_only_prefixes: Vec<String>,
    committed: RwLock<HashMap<String, String>>,
    staged: Mutex<HashMap<TransactionId, ConfigChangeContext>>,
}

impl fmt::Debug for InMemoryPropertySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryPropertySource")
            .field("name", &self.name)
            .field("ordinal", &self.ordinal)
            .field("read_only_prefixes", &self.read_only_prefixes)
            .finish_non_exhaustive()
    }
}

impl InMemoryPropertySource {
    /// Creates an empty source.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ordinal: DEFAULT_ORDINAL,
            read_only_prefixes: Vec::new(),
            committed: RwLock::new(HashMap::new()),
            staged: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the ordinal.
    #[must_use]
    pub fn with_ordinal(mut self, ordinal: i32) -> Self {
        self.ordinal = ordinal;
        self
    }

    /// Seeds committed properties.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_properties<I, K, V>(self, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.committed
            .write()
            .expect("in-memory source poisoned")
            .extend(properties.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Marks every key starting with `prefix` as read-only.
    #[must_use]
    pub fn with_read_only_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.read_only_prefixes.push(prefix.into());
        self
    }

    /// Returns the ids of transactions with staged changes.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn open_transactions(&self) -> Vec<TransactionId> {
        self.staged
            .lock()
            .expect("in-memory source poisoned")
            .keys()
            .copied()
            .collect()
    }

    fn is_read_only(&self, key: &str) -> bool {
        self.read_only_prefixes
            .iter()
            .any(|prefix| key.starts_with(prefix.as_str()))
    }

    fn check_writable(&self, key: &str) -> Result<()> {
        if self.is_read_only(key) {
            return Err(Error::ReadOnly {
                source_name: self.name.clone(),
                key: key.to_owned(),
            });
        }
        Ok(())
    }

    fn unknown(&self, transaction: &TransactionId) -> Error {
        Error::UnknownTransaction {
            source_name: self.name.clone(),
            transaction: *transaction,
        }
    }

    fn with_staged<R>(
        &self,
        transaction: &TransactionId,
        apply: impl FnOnce(&mut ConfigChangeContext) -> R,
    ) -> Result<R> {
        let mut staged = self.staged.lock().expect("in-memory source poisoned");
        let ctx = staged
            .get_mut(transaction)
            .ok_or_else(|| self.unknown(transaction))?;
        Ok(apply(ctx))
    }
}

impl PropertySource for InMemoryPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordinal(&self) -> i32 {
        self.ordinal
    }

    fn get(&self, key: &str) -> Result<Option<PropertyValue>> {
        let committed = self.committed.read().expect("in-memory source poisoned");
        Ok(committed
            .get(key)
            .map(|value| PropertyValue::new(key, value.as_str(), self.name.as_str())))
    }

    fn properties(&self) -> Result<HashMap<String, String>> {
        Ok(self.committed.read().expect("in-memory source poisoned").clone())
    }

    fn as_mutable(&self) -> Option<&dyn MutablePropertySource> {
        Some(self)
    }
}

impl MutablePropertySource for InMemoryPropertySource {
    fn is_writable(&self, key: &str) -> bool {
        !self.is_read_only(key)
    }

    fn is_removable(&self, key: &str) -> bool {
        !self.is_read_only(key)
    }

    fn start_transaction(&self, transaction: &TransactionId) -> Result<()> {
        let mut staged = self.staged.lock().expect("in-memory source poisoned");
        if staged.contains_key(transaction) {
            return Err(Error::TransactionExists {
                source_name: self.name.clone(),
                transaction: *transaction,
            });
        }
        staged.insert(*transaction, ConfigChangeContext::new(*transaction));
        debug!(source = %self.name, %transaction, "opened staging area");
        Ok(())
    }

    fn put(&self, transaction: &TransactionId, key: &str, value: &str) -> Result<()> {
        self.check_writable(key)?;
        self.with_staged(transaction, |ctx| ctx.put(key, value))
    }

    fn remove(&self, transaction: &TransactionId, key: &str) -> Result<()> {
        self.check_writable(key)?;
        self.with_staged(transaction, |ctx| ctx.remove(key))
    }

    fn commit_transaction(&self, transaction: &TransactionId) -> Result<()> {
        let ctx = self
            .staged
            .lock()
            .expect("in-memory source poisoned")
            .remove(transaction)
            .ok_or_else(|| self.unknown(transaction))?;

        let mut committed = self.committed.write().expect("in-memory source poisoned");
        for (key, value) in ctx.added_properties() {
            committed.insert(key.clone(), value.clone());
        }
        for key in ctx.removed_properties() {
            committed.remove(key);
        }
        debug!(
            source = %self.name,
            %transaction,
            added = ctx.added_properties().len(),
            removed = ctx.removed_properties().len(),
            "committed transaction"
        );
        Ok(())
    }

    fn rollback_transaction(&self, transaction: &TransactionId) -> Result<()> {
        let discarded = self
            .staged
            .lock()
            .expect("in-memory source poisoned")
            .remove(transaction);
        if discarded.is_none() {
            return Err(self.unknown(transaction));
        }
        debug!(source = %self.name, %transaction, "discarded staging area");
        Ok(())
    }

    fn config_change_context(&self, transaction: &TransactionId) -> Option<ConfigChangeContext> {
        self.staged
            .lock()
            .expect("in-memory source poisoned")
            .get(transaction)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_changes_visible_after_commit() {
        let source = InMemoryPropertySource::new("mem").with_properties([("old", "1")]);
        let tx = TransactionId::random();
        source.start_transaction(&tx).unwrap();
        source.put(&tx, "new", "2").unwrap();
        source.remove(&tx, "old").unwrap();

        assert!(source.get("new").unwrap().is_none());
        assert_eq!(source.open_transactions(), [tx]);

        source.commit_transaction(&tx).unwrap();
        assert_eq!(source.get("new").unwrap().unwrap().value(), "2");
        assert!(source.get("old").unwrap().is_none());
        assert!(source.open_transactions().is_empty());
    }

    #[test]
    fn rollback_discards_changes() {
        let source = InMemoryPropertySource::new("mem");
        let tx = TransactionId::random();
        source.start_transaction(&tx).unwrap();
        source.put(&tx, "a", "1").unwrap();
        source.rollback_transaction(&tx).unwrap();

        assert!(source.properties().unwrap().is_empty());
        assert!(source.config_change_context(&tx).is_none());
    }

    #[test]
    fn unknown_and_duplicate_transactions_fail() {
        let source = InMemoryPropertySource::new("mem");
        let tx = TransactionId::random();
        assert!(matches!(
            source.put(&tx, "a", "1"),
            Err(Error::UnknownTransaction { .. })
        ));
        assert!(source.commit_transaction(&tx).is_err());

        source.start_transaction(&tx).unwrap();
        assert!(matches!(
            source.start_transaction(&tx),
            Err(Error::TransactionExists { .. })
        ));
    }

    #[test]
    fn read_only_prefix_is_enforced() {
        let source = InMemoryPropertySource::new("mem").with_read_only_prefix("sys.");
        let tx = TransactionId::random();
        source.start_transaction(&tx).unwrap();

        assert!(!source.is_writable("sys.home"));
        assert!(!source.is_removable("sys.home"));
        assert!(source.is_writable("app.name"));
        assert!(matches!(
            source.put(&tx, "sys.home", "/"),
            Err(Error::ReadOnly { .. })
        ));
    }
}
