//! Immutable resolution context.

use std::fmt;
use std::sync::Arc;

use strata_convert::ConverterRegistry;
use strata_primitives::{PropertySource, SharedSource};
use tracing::debug;

use crate::{OverridingPolicy, PropertyFilter, ValueCombinationPolicy};

/// Everything a [`Configuration`](crate::Configuration) resolves through.
///
/// Sources are kept sorted by descending ordinal; sources sharing an ordinal
/// keep the order in which they were added.
#[derive(Clone)]
pub struct ConfigurationContext {
    sources: Vec<SharedSource>,
    filters: Vec<Arc<dyn PropertyFilter>>,
    policy: Arc<dyn ValueCombinationPolicy>,
    converters: Arc<ConverterRegistry>,
}

impl ConfigurationContext {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> ConfigurationContextBuilder {
        ConfigurationContextBuilder::new()
    }

    /// Returns a builder seeded with this context's contents.
    #[must_use]
    pub fn to_builder(&self) -> ConfigurationContextBuilder {
        ConfigurationContextBuilder {
            sources: self.sources.clone(),
            filters: self.filters.clone(),
            policy: Some(Arc::clone(&self.policy)),
            converters: Some(Arc::clone(&self.converters)),
            load_discovered: false,
        }
    }

    /// Returns the sources, highest precedence first.
    #[must_use]
    pub fn property_sources(&self) -> &[SharedSource] {
        &self.sources
    }

    /// Returns the source with the given name.
    #[must_use]
    pub fn property_source(&self, name: &str) -> Option<&SharedSource> {
        self.sources.iter().find(|source| source.name() == name)
    }

    /// Returns the source names, highest precedence first.
    #[must_use]
    pub fn property_source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_owned()).collect()
    }

    /// Returns the filters in application order.
    #[must_use]
    pub fn filters(&self) -> &[Arc<dyn PropertyFilter>] {
        &self.filters
    }

    /// Returns the combination policy.
    #[must_use]
    pub fn combination_policy(&self) -> &Arc<dyn ValueCombinationPolicy> {
        &self.policy
    }

    /// Returns the converter registry.
    #[must_use]
    pub fn converters(&self) -> &Arc<ConverterRegistry> {
        &self.converters
    }
}

impl fmt::Debug for ConfigurationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<_> = self
            .sources
            .iter()
            .map(|s| format!("{} ({})", s.name(), s.ordinal()))
            .collect();
        let filters: Vec<_> = self.filters.iter().map(|f| f.name().to_owned()).collect();
        f.debug_struct("ConfigurationContext")
            .field("sources", &sources)
            .field("filters", &filters)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ConfigurationContext`].
pub struct ConfigurationContextBuilder {
    sources: Vec<SharedSource>,
    filters: Vec<Arc<dyn PropertyFilter>>,
    policy: Option<Arc<dyn ValueCombinationPolicy>>,
    converters: Option<Arc<ConverterRegistry>>,
    load_discovered: bool,
}

impl Default for ConfigurationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationContextBuilder {
    /// Starts an empty builder that loads discovered converters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            filters: Vec::new(),
            policy: None,
            converters: None,
            load_discovered: true,
        }
    }

    /// Adds a property source.
    #[must_use]
    pub fn with_source(self, source: impl PropertySource + 'static) -> Self {
        self.with_shared_source(Arc::new(source))
    }

    /// Adds a shared property source.
    #[must_use]
    pub fn with_shared_source(mut self, source: SharedSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Adds several shared property sources.
    #[must_use]
    pub fn with_sources<I>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = SharedSource>,
    {
        self.sources.extend(sources);
        self
    }

    /// Removes every source with the given name.
    #[must_use]
    pub fn without_source(mut self, name: &str) -> Self {
        self.sources.retain(|source| source.name() != name);
        self
    }

    /// Appends a filter to the chain.
    #[must_use]
    pub fn with_filter(self, filter: impl PropertyFilter + 'static) -> Self {
        self.with_shared_filter(Arc::new(filter))
    }

    /// Appends a shared filter to the chain.
    #[must_use]
    pub fn with_shared_filter(mut self, filter: Arc<dyn PropertyFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Installs the combination policy. [`OverridingPolicy`] applies otherwise.
    #[must_use]
    pub fn with_combination_policy(mut self, policy: Arc<dyn ValueCombinationPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Installs the converter registry. A fresh one is created otherwise.
    #[must_use]
    pub fn with_converters(mut self, converters: Arc<ConverterRegistry>) -> Self {
        self.converters = Some(converters);
        self
    }

    /// Controls whether discovered converters are loaded into the registry on build.
    #[must_use]
    pub fn load_discovered_converters(mut self, load: bool) -> Self {
        self.load_discovered = load;
        self
    }

    /// Finalises the context, sorting sources by descending ordinal.
    #[must_use]
    pub fn build(self) -> ConfigurationContext {
        let mut sources = self.sources;
        sources.sort_by_key(|source| std::cmp::Reverse(source.ordinal()));

        let converters = self.converters.unwrap_or_default();
        if self.load_discovered {
            let applied = converters.add_discovered_converters();
            debug!(plugins = applied, "loaded discovered converters");
        }

        debug!(
            sources = sources.len(),
            filters = self.filters.len(),
            "built configuration context"
        );
        ConfigurationContext {
            sources,
            filters: self.filters,
            policy: self.policy.unwrap_or_else(|| Arc::new(OverridingPolicy)),
            converters,
        }
    }
}
