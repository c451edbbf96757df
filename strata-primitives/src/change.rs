//! Staged changes belonging to one write transaction.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::TransactionId;

/// Keys added and removed under one transaction.
///
/// A key is never both added and removed: the latest operation wins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigChangeContext {
    transaction_id: TransactionId,
    started_at: DateTime<Utc>,
    #[serde(default)]
    added: BTreeMap<String, String>,
    #[serde(default)]
    removed: BTreeSet<String>,
}

impl ConfigChangeContext {
    /// Creates an empty context started now.
    #[must_use]
    pub fn new(transaction_id: TransactionId) -> Self {
        Self::started_at(transaction_id, Utc::now())
    }

    /// Creates an empty context with an explicit start time.
    #[must_use]
    pub fn started_at(transaction_id: TransactionId, started_at: DateTime<Utc>) -> Self {
        Self {
            transaction_id,
            started_at,
            added: BTreeMap::new(),
            removed: BTreeSet::new(),
        }
    }

    /// Returns the owning transaction.
    #[must_use]
    pub const fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// Returns when staging started.
    #[must_use]
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Overrides the start time.
    pub fn set_start_time(&mut self, started_at: DateTime<Utc>) {
        self.started_at = started_at;
    }

    /// Returns the staged additions.
    #[must_use]
    pub fn added_properties(&self) -> &BTreeMap<String, String> {
        &self.added
    }

    /// Returns the staged removals.
    #[must_use]
    pub fn removed_properties(&self) -> &BTreeSet<String> {
        &self.removed
    }

    /// Stages a write.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.removed.remove(&key);
        self.added.insert(key, value.into());
    }

    /// Stages several writes.
    pub fn put_all<'a, I>(&mut self, properties: I)
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (key, value) in properties {
            self.put(key.as_str(), value.as_str());
        }
    }

    /// Stages a removal.
    pub fn remove(&mut self, key: impl Into<String>) {
        let key = key.into();
        self.added.remove(&key);
        self.removed.insert(key);
    }

    /// Stages several removals.
    pub fn remove_all<'a, I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for key in keys {
            self.remove(key.as_str());
        }
    }

    /// Whether nothing has been staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
