//! Access point for the default configuration.

use std::sync::{Arc, OnceLock, RwLock};

use strata_convert::ConverterRegistry;
use strata_primitives::PropertySource;
use tracing::info;

use crate::{
    ConfigResult, Configuration, ConfigurationContext, ConfigurationContextBuilder,
    OverridingPolicy, PropertyFilter, ServiceContext, ValueCombinationPolicy,
};

/// Builds, caches and replaces the default [`Configuration`].
///
/// The default context is assembled from a [`ServiceContext`]: every
/// registered `dyn PropertySource` and `dyn PropertyFilter`, the
/// highest-priority `dyn ValueCombinationPolicy` (or [`OverridingPolicy`]),
/// and a converter registry with discovered converters loaded.
#[derive(Debug)]
pub struct ConfigurationProvider {
    services: Arc<ServiceContext>,
    current: RwLock<Option<Configuration>>,
}

impl ConfigurationProvider {
    /// Creates a provider reading defaults from `services`.
    #[must_use]
    pub fn new(services: Arc<ServiceContext>) -> Self {
        Self {
            services,
            current: RwLock::new(None),
        }
    }

    /// Returns the process-wide provider backed by [`ServiceContext::global`].
    #[must_use]
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<ConfigurationProvider> = OnceLock::new();
        GLOBAL.get_or_init(|| Self::new(ServiceContext::global()))
    }

    /// Returns the service context defaults are read from.
    #[must_use]
    pub fn services(&self) -> &Arc<ServiceContext> {
        &self.services
    }

    /// Returns the current configuration, building the default on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AmbiguousService`](crate::ConfigError::AmbiguousService)
    /// when several combination policies tie at the highest priority.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn configuration(&self) -> ConfigResult<Configuration> {
        if let Some(config) = self.current.read().expect("configuration provider poisoned").as_ref() {
            return Ok(config.clone());
        }

        let built = Configuration::from(self.default_context()?);
        let mut current = self.current.write().expect("configuration provider poisoned");
        Ok(current.get_or_insert(built).clone())
    }

    /// Returns the context of the current configuration.
    ///
    /// # Errors
    ///
    /// Same as [`configuration`](Self::configuration).
    pub fn configuration_context(&self) -> ConfigResult<Arc<ConfigurationContext>> {
        Ok(Arc::clone(self.configuration()?.context()))
    }

    /// Replaces the current configuration context.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set_configuration_context(&self, context: ConfigurationContext) {
        info!(?context, "replacing configuration context");
        *self.current.write().expect("configuration provider poisoned") =
            Some(Configuration::from(context));
    }

    /// Returns an empty context builder.
    #[must_use]
    pub fn context_builder(&self) -> ConfigurationContextBuilder {
        ConfigurationContextBuilder::new()
    }

    fn default_context(&self) -> ConfigResult<ConfigurationContext> {
        let policy = self
            .services
            .service::<dyn ValueCombinationPolicy>()?
            .unwrap_or_else(|| Arc::new(OverridingPolicy));

        let context = ConfigurationContextBuilder::new()
            .with_sources(self.services.services::<dyn PropertySource>())
            .with_combination_policy(policy);
        let context = self
            .services
            .services::<dyn PropertyFilter>()
            .into_iter()
            .fold(context, ConfigurationContextBuilder::with_shared_filter)
            .with_converters(Arc::new(ConverterRegistry::new()))
            .load_discovered_converters(true)
            .build();
        info!(?context, "built default configuration context");
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use strata_primitives::MapPropertySource;

    use crate::{AppendingPolicy, ConfigError, MaskingFilter};

    fn services() -> Arc<ServiceContext> {
        let services = ServiceContext::new();
        let low: Arc<dyn PropertySource> =
            Arc::new(MapPropertySource::new("low", [("a", "1"), ("db.password", "pw")]).with_ordinal(1));
        let high: Arc<dyn PropertySource> =
            Arc::new(MapPropertySource::new("high", [("a", "2")]).with_ordinal(2));
        services.register("low", low);
        services.register("high", high);
        let filter: Arc<dyn PropertyFilter> = Arc::new(MaskingFilter::default());
        services.register("masking", filter);
        Arc::new(services)
    }

    #[test]
    fn default_configuration_uses_registered_services() {
        let provider = ConfigurationProvider::new(services());
        let config = provider.configuration().unwrap();
        assert_eq!(config.get("a").as_deref(), Some("2"));
        assert_eq!(config.get("db.password").as_deref(), Some(MaskingFilter::DEFAULT_MASK));
        assert_eq!(config.get_as::<i32>("a").unwrap(), Some(2));

        let again = provider.configuration_context().unwrap();
        assert!(Arc::ptr_eq(config.context(), &again));
    }

    #[test]
    fn set_context_replaces_configuration() {
        let provider = ConfigurationProvider::new(services());
        let custom = provider
            .context_builder()
            .with_source(MapPropertySource::new("only", [("a", "9")]))
            .build();
        provider.set_configuration_context(custom);
        assert_eq!(provider.configuration().unwrap().get("a").as_deref(), Some("9"));
    }

    #[test]
    fn tied_policies_fail() {
        let services = services();
        let first: Arc<dyn ValueCombinationPolicy> = Arc::new(OverridingPolicy);
        let second: Arc<dyn ValueCombinationPolicy> = Arc::new(AppendingPolicy::default());
        services.register("overriding", first);
        services.register("appending", second);

        let provider = ConfigurationProvider::new(services);
        assert!(matches!(
            provider.configuration(),
            Err(ConfigError::AmbiguousService { .. })
        ));
    }

    #[test]
    fn highest_priority_policy_is_used() {
        let services = services();
        let appending: Arc<dyn ValueCombinationPolicy> = Arc::new(AppendingPolicy::new("|"));
        services.register_with_priority("appending", 10, appending);

        let config = ConfigurationProvider::new(services).configuration().unwrap();
        assert_eq!(config.get("a").as_deref(), Some("2|1"));
    }
}
