//! Writable view over a configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use strata_core::Configuration;
use strata_primitives::{ConfigChangeContext, MutablePropertySource, SharedSource, TransactionId};
use tracing::{debug, warn};

use crate::{
    ApplyAll, ChangePropagationPolicy, MutationError, MutationResult, TransactionEvent,
    TransactionLifecycle,
};

/// Stages writes on the mutable sources of a [`Configuration`] and commits or
/// rolls them back as one transaction.
///
/// A view owns at most one open transaction. It is not meant to be shared
/// between threads; use one view per writer.
pub struct MutableConfiguration {
    config: Configuration,
    policy: Arc<dyn ChangePropagationPolicy>,
    auto_commit: bool,
    lifecycle: TransactionLifecycle,
}

impl fmt::Debug for MutableConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableConfiguration")
            .field("config", &self.config)
            .field("policy", &self.policy.name())
            .field("auto_commit", &self.auto_commit)
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}

impl MutableConfiguration {
    /// Creates a view with auto-commit off and the [`ApplyAll`] policy.
    #[must_use]
    pub fn new(config: Configuration) -> Self {
        Self {
            config,
            policy: Arc::new(ApplyAll),
            auto_commit: false,
            lifecycle: TransactionLifecycle::new(),
        }
    }

    /// Replaces the change propagation policy.
    #[must_use]
    pub fn with_propagation_policy(mut self, policy: Arc<dyn ChangePropagationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the read side.
    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Returns the committed value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key)
    }

    /// Returns the committed value of `key` or `default`.
    #[must_use]
    pub fn get_or_default(&self, key: &str, default: &str) -> String {
        self.config.get_or_default(key, default)
    }

    /// Returns the change propagation policy.
    #[must_use]
    pub fn propagation_policy(&self) -> &Arc<dyn ChangePropagationPolicy> {
        &self.policy
    }

    /// Replaces the change propagation policy.
    pub fn set_propagation_policy(&mut self, policy: Arc<dyn ChangePropagationPolicy>) {
        self.policy = policy;
    }

    /// Whether every write is committed immediately.
    #[must_use]
    pub const fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    /// Enables or disables auto-commit.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::IllegalState`] while a transaction is open.
    pub fn set_auto_commit(&mut self, auto_commit: bool) -> MutationResult<()> {
        if self.lifecycle.id().is_some() {
            return Err(MutationError::illegal_state(
                "cannot change auto-commit within a transaction; commit or roll back first",
            ));
        }
        self.auto_commit = auto_commit;
        Ok(())
    }

    /// Returns the open transaction id, if any.
    #[must_use]
    pub const fn transaction_id(&self) -> Option<TransactionId> {
        self.lifecycle.id()
    }

    /// Returns the sources that accept writes, highest precedence first.
    #[must_use]
    pub fn mutable_property_sources(&self) -> Vec<SharedSource> {
        self.sources_where(|_| true)
    }

    /// Returns the mutable sources that accept a write of `key`.
    #[must_use]
    pub fn sources_that_can_write(&self, key: &str) -> Vec<SharedSource> {
        self.sources_where(|source| source.is_writable(key))
    }

    /// Returns the mutable sources that accept a removal of `key`.
    #[must_use]
    pub fn sources_that_can_remove(&self, key: &str) -> Vec<SharedSource> {
        self.sources_where(|source| source.is_removable(key))
    }

    /// Returns the mutable sources that currently hold `key`.
    #[must_use]
    pub fn sources_that_know(&self, key: &str) -> Vec<SharedSource> {
        self.sources_where(|source| matches!(source.get(key), Ok(Some(_))))
    }

    /// Whether any mutable source accepts a write of `key`.
    #[must_use]
    pub fn is_writable(&self, key: &str) -> bool {
        self.mutable().any(|source| source.is_writable(key))
    }

    /// Whether any mutable source accepts a removal of `key`.
    #[must_use]
    pub fn is_removable(&self, key: &str) -> bool {
        self.mutable().any(|source| source.is_removable(key))
    }

    /// Whether `key` currently resolves to a value.
    #[must_use]
    pub fn is_existing(&self, key: &str) -> bool {
        self.config.get(key).is_some()
    }

    /// Opens a transaction on every mutable source, or returns the open one.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::Begin`] when a source cannot open its staging
    /// area. Every source is rolled back and no transaction stays open.
    pub fn start_transaction(&mut self) -> MutationResult<TransactionId> {
        if let Some(id) = self.lifecycle.id() {
            return Ok(id);
        }
        let id = self.lifecycle.begin()?;

        let failure = self
            .mutable()
            .find_map(|source| source.start_transaction(&id).err().map(|err| (source.name().to_owned(), err)));
        if let Some((source_name, source)) = failure {
            warn!(%id, source = %source_name, error = %source, "failed to begin transaction");
            self.abort(id);
            return Err(MutationError::Begin {
                source_name,
                transaction: id,
                source,
            });
        }

        debug!(%id, "transaction started");
        Ok(id)
    }

    /// Stages `key = value` and commits when auto-commit is on.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::Staging`] when a source rejects the write; the
    /// transaction stays open. Errors from starting or committing the
    /// transaction are propagated as well.
    pub fn put(&mut self, key: &str, value: &str) -> MutationResult<()> {
        let id = self.start_transaction()?;
        self.policy
            .apply_change(&id, self.config.context().property_sources(), key, value)?;
        self.finish_write()
    }

    /// Stages every entry of `properties`.
    ///
    /// # Errors
    ///
    /// Same as [`put`](Self::put).
    pub fn put_all(&mut self, properties: &BTreeMap<String, String>) -> MutationResult<()> {
        let id = self.start_transaction()?;
        self.policy
            .apply_changes(&id, self.config.context().property_sources(), properties)?;
        self.finish_write()
    }

    /// Stages the removal of `keys`.
    ///
    /// # Errors
    ///
    /// Same as [`put`](Self::put).
    pub fn remove<I, S>(&mut self, keys: I) -> MutationResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        let id = self.start_transaction()?;
        self.policy
            .apply_remove(&id, self.config.context().property_sources(), &keys)?;
        self.finish_write()
    }

    /// Commits the open transaction on every mutable source.
    ///
    /// Without an open transaction this only logs a warning.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::Commit`] when a source fails; every source is
    /// rolled back and the transaction is released.
    pub fn commit_transaction(&mut self) -> MutationResult<()> {
        let Some(id) = self.lifecycle.id() else {
            warn!("no open transaction, ignoring commit");
            return Ok(());
        };

        let failure = self
            .mutable()
            .find_map(|source| source.commit_transaction(&id).err().map(|err| (source.name().to_owned(), err)));
        if let Some((source_name, source)) = failure {
            warn!(%id, source = %source_name, error = %source, "commit failed, rolling back");
            self.abort(id);
            return Err(MutationError::Commit {
                source_name,
                transaction: id,
                source,
            });
        }

        self.lifecycle.transition(TransactionEvent::Commit)?;
        self.lifecycle.transition(TransactionEvent::Release)?;
        debug!(%id, "transaction committed");
        Ok(())
    }

    /// Discards the open transaction on every mutable source.
    ///
    /// Without an open transaction this only logs a warning. Source failures
    /// are logged; the transaction is always released.
    pub fn rollback_transaction(&mut self) {
        match self.lifecycle.id() {
            Some(id) => self.abort(id),
            None => warn!("no open transaction, ignoring rollback"),
        }
    }

    /// Returns the changes staged under the open transaction, merged across
    /// sources and stamped with the earliest start time.
    #[must_use]
    pub fn config_change_context(&self) -> Option<ConfigChangeContext> {
        let id = self.lifecycle.id()?;
        let mut merged = ConfigChangeContext::new(id);
        let mut started_at = None;
        for sub in self.mutable().filter_map(|source| source.config_change_context(&id)) {
            merged.put_all(sub.added_properties());
            merged.remove_all(sub.removed_properties());
            started_at = Some(started_at.map_or(sub.start_time(), |t: DateTime<Utc>| t.min(sub.start_time())));
        }
        if let Some(started_at) = started_at.or(self.lifecycle.started_at()) {
            merged.set_start_time(started_at);
        }
        Some(merged)
    }

    fn finish_write(&mut self) -> MutationResult<()> {
        if self.auto_commit {
            self.commit_transaction()
        } else {
            Ok(())
        }
    }

    fn abort(&mut self, id: TransactionId) {
        for source in self.mutable() {
            if let Err(err) = source.rollback_transaction(&id) {
                warn!(%id, source = source.name(), error = %err, "rollback failed");
            }
        }
        if let Err(err) = self
            .lifecycle
            .transition(TransactionEvent::Rollback)
            .and_then(|_| self.lifecycle.transition(TransactionEvent::Release))
        {
            warn!(%id, error = %err, "transaction release failed");
        }
        debug!(%id, "transaction rolled back");
    }

    fn mutable(&self) -> impl Iterator<Item = &dyn MutablePropertySource> {
        self.config
            .context()
            .property_sources()
            .iter()
            .filter_map(|source| source.as_mutable())
    }

    fn sources_where<F>(&self, predicate: F) -> Vec<SharedSource>
    where
        F: Fn(&dyn MutablePropertySource) -> bool,
    {
        self.config
            .context()
            .property_sources()
            .iter()
            .filter(|source| source.as_mutable().is_some_and(&predicate))
            .cloned()
            .collect()
    }
}
