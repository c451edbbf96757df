//! Policies deciding which writable sources receive a change.

use std::collections::{BTreeMap, BTreeSet};

use strata_primitives::{MutablePropertySource, SharedSource, TransactionId};
use tracing::debug;

use crate::{MutationError, MutationResult};

/// Routes staged writes and removals to mutable property sources.
///
/// `sources` is the full source list of the configuration, highest precedence
/// first; policies pick the mutable ones they want.
pub trait ChangePropagationPolicy: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Stages a single write.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::Staging`] for the first source that fails.
    fn apply_change(
        &self,
        transaction: &TransactionId,
        sources: &[SharedSource],
        key: &str,
        value: &str,
    ) -> MutationResult<()>;

    /// Stages several writes.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::Staging`] for the first source that fails.
    fn apply_changes(
        &self,
        transaction: &TransactionId,
        sources: &[SharedSource],
        changes: &BTreeMap<String, String>,
    ) -> MutationResult<()> {
        for (key, value) in changes {
            self.apply_change(transaction, sources, key, value)?;
        }
        Ok(())
    }

    /// Stages removals.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::Staging`] for the first source that fails.
    fn apply_remove(
        &self,
        transaction: &TransactionId,
        sources: &[SharedSource],
        keys: &[String],
    ) -> MutationResult<()>;
}

fn mutable(sources: &[SharedSource]) -> impl Iterator<Item = &dyn MutablePropertySource> {
    sources.iter().filter_map(|source| source.as_mutable())
}

fn stage_put(
    target: &dyn MutablePropertySource,
    transaction: &TransactionId,
    key: &str,
    value: &str,
) -> MutationResult<()> {
    debug!(source = target.name(), key, %transaction, "staging write");
    target
        .put(transaction, key, value)
        .map_err(|err| MutationError::staging(target.name(), *transaction, err))
}

fn stage_put_all(
    target: &dyn MutablePropertySource,
    transaction: &TransactionId,
    changes: &BTreeMap<String, String>,
) -> MutationResult<()> {
    let accepted: BTreeMap<String, String> = changes
        .iter()
        .filter(|(key, _)| target.is_writable(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    if accepted.is_empty() {
        return Ok(());
    }
    debug!(source = target.name(), keys = accepted.len(), %transaction, "staging writes");
    target
        .put_all(transaction, &accepted)
        .map_err(|err| MutationError::staging(target.name(), *transaction, err))
}

fn stage_remove(target: &dyn MutablePropertySource, transaction: &TransactionId, key: &str) -> MutationResult<()> {
    debug!(source = target.name(), key, %transaction, "staging removal");
    target
        .remove(transaction, key)
        .map_err(|err| MutationError::staging(target.name(), *transaction, err))
}

/// Writes to every mutable source that accepts the key.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyAll;

impl ChangePropagationPolicy for ApplyAll {
    fn name(&self) -> &str {
        "apply-all"
    }

    fn apply_change(
        &self,
        transaction: &TransactionId,
        sources: &[SharedSource],
        key: &str,
        value: &str,
    ) -> MutationResult<()> {
        for target in mutable(sources).filter(|t| t.is_writable(key)) {
            stage_put(target, transaction, key, value)?;
        }
        Ok(())
    }

    fn apply_changes(
        &self,
        transaction: &TransactionId,
        sources: &[SharedSource],
        changes: &BTreeMap<String, String>,
    ) -> MutationResult<()> {
        for target in mutable(sources) {
            stage_put_all(target, transaction, changes)?;
        }
        Ok(())
    }

    fn apply_remove(
        &self,
        transaction: &TransactionId,
        sources: &[SharedSource],
        keys: &[String],
    ) -> MutationResult<()> {
        for target in mutable(sources) {
            for key in keys.iter().filter(|key| target.is_removable(key)) {
                stage_remove(target, transaction, key)?;
            }
        }
        Ok(())
    }
}

/// Writes only to the highest-precedence mutable source that accepts the key.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyMostSignificantOnly;

impl ChangePropagationPolicy for ApplyMostSignificantOnly {
    fn name(&self) -> &str {
        "apply-most-significant-only"
    }

    fn apply_change(
        &self,
        transaction: &TransactionId,
        sources: &[SharedSource],
        key: &str,
        value: &str,
    ) -> MutationResult<()> {
        match mutable(sources).find(|t| t.is_writable(key)) {
            Some(target) => stage_put(target, transaction, key, value),
            None => Ok(()),
        }
    }

    fn apply_remove(
        &self,
        transaction: &TransactionId,
        sources: &[SharedSource],
        keys: &[String],
    ) -> MutationResult<()> {
        for key in keys {
            if let Some(target) = mutable(sources).find(|t| t.is_removable(key)) {
                stage_remove(target, transaction, key)?;
            }
        }
        Ok(())
    }
}

/// Writes to every accepting mutable source whose name is selected.
#[derive(Debug, Clone, Default)]
pub struct ApplySelective {
    names: BTreeSet<String>,
}

impl ApplySelective {
    /// Creates a policy targeting the named sources.
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the selected source names.
    #[must_use]
    pub fn names(&self) -> &BTreeSet<String> {
        &self.names
    }

    fn selected<'a>(&'a self, sources: &'a [SharedSource]) -> impl Iterator<Item = &'a dyn MutablePropertySource> {
        mutable(sources).filter(|t| self.names.contains(t.name()))
    }
}

impl ChangePropagationPolicy for ApplySelective {
    fn name(&self) -> &str {
        "apply-selective"
    }

    fn apply_change(
        &self,
        transaction: &TransactionId,
        sources: &[SharedSource],
        key: &str,
        value: &str,
    ) -> MutationResult<()> {
        for target in self.selected(sources).filter(|t| t.is_writable(key)) {
            stage_put(target, transaction, key, value)?;
        }
        Ok(())
    }

    fn apply_changes(
        &self,
        transaction: &TransactionId,
        sources: &[SharedSource],
        changes: &BTreeMap<String, String>,
    ) -> MutationResult<()> {
        for target in self.selected(sources) {
            stage_put_all(target, transaction, changes)?;
        }
        Ok(())
    }

    fn apply_remove(
        &self,
        transaction: &TransactionId,
        sources: &[SharedSource],
        keys: &[String],
    ) -> MutationResult<()> {
        for target in self.selected(sources) {
            for key in keys.iter().filter(|key| target.is_removable(key)) {
                stage_remove(target, transaction, key)?;
            }
        }
        Ok(())
    }
}

/// Discards every change.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyNone;

impl ChangePropagationPolicy for ApplyNone {
    fn name(&self) -> &str {
        "apply-none"
    }

    fn apply_change(
        &self,
        _transaction: &TransactionId,
        _sources: &[SharedSource],
        key: &str,
        _value: &str,
    ) -> MutationResult<()> {
        debug!(key, "change dropped by policy");
        Ok(())
    }

    fn apply_remove(
        &self,
        _transaction: &TransactionId,
        _sources: &[SharedSource],
        keys: &[String],
    ) -> MutationResult<()> {
        debug!(?keys, "removal dropped by policy");
        Ok(())
    }
}
