//! Priority-ranked service registry keyed by capability type.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use strata_convert::TypeKey;
use strata_primitives::{EnvironmentPropertySource, PropertySource};
use tracing::debug;

use crate::{ConfigError, ConfigResult};

/// Priority assigned when none is given.
pub const DEFAULT_PRIORITY: i32 = 1;

type Erased = Arc<dyn Any + Send + Sync>;

struct ServiceEntry {
    name: String,
    priority: i32,
    instance: Erased,
}

/// Registry of implementations per capability type, ranked by priority.
///
/// A capability is any `'static` type, typically a trait object such as
/// `dyn PropertySource`. Ordered lists and singleton lookups are cached until
/// the next registration for the same capability.
#[derive(Default)]
pub struct ServiceContext {
    entries: RwLock<HashMap<TypeKey, Vec<ServiceEntry>>>,
    ordered: RwLock<HashMap<TypeKey, Erased>>,
    singletons: RwLock<HashMap<TypeKey, Erased>>,
    applied_plugins: Mutex<HashSet<&'static str>>,
}

impl fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read().expect("service registry poisoned");
        let registered: Vec<_> = entries
            .iter()
            .map(|(key, list)| format!("{}: {}", key.short_name(), list.len()))
            .collect();
        f.debug_struct("ServiceContext")
            .field("registered", &registered)
            .finish_non_exhaustive()
    }
}

impl ServiceContext {
    /// Creates an empty context. Plugins are not applied.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide context, bootstrapped on first access.
    #[must_use]
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<ServiceContext>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| {
            let context = Arc::new(Self::new());
            context.bootstrap();
            context
        }))
    }

    /// Applies every [`ServicePlugin`] not yet applied to this context and
    /// returns how many were applied.
    ///
    /// # Panics
    ///
    /// Panics if the internal plugin lock is poisoned.
    pub fn bootstrap(&self) -> usize {
        let pending: Vec<_> = {
            let mut applied = self.applied_plugins.lock().expect("service plugins poisoned");
            inventory::iter::<ServicePlugin>
                .into_iter()
                .filter(|plugin| applied.insert(plugin.name))
                .collect()
        };
        for plugin in &pending {
            debug!(plugin = plugin.name, "applying service plugin");
            (plugin.register)(self);
        }
        pending.len()
    }

    /// Registers an implementation of `T` with [`DEFAULT_PRIORITY`].
    pub fn register<T>(&self, name: impl Into<String>, service: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.register_with_priority(name, DEFAULT_PRIORITY, service);
    }

    /// Registers an implementation of `T` with an explicit priority.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned.
    pub fn register_with_priority<T>(&self, name: impl Into<String>, priority: i32, service: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        let name = name.into();
        debug!(capability = key.name(), service = %name, priority, "registered service");
        self.entries
            .write()
            .expect("service registry poisoned")
            .entry(key)
            .or_default()
            .push(ServiceEntry {
                name,
                priority,
                instance: Arc::new(service),
            });
        self.ordered.write().expect("service cache poisoned").remove(&key);
        self.singletons.write().expect("service cache poisoned").remove(&key);
    }

    /// Returns every implementation of `T`, highest priority first. Ties keep
    /// registration order.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned.
    #[must_use]
    pub fn services<T>(&self) -> Vec<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        let cached = self
            .ordered
            .read()
            .expect("service cache poisoned")
            .get(&key)
            .and_then(|erased| Arc::clone(erased).downcast::<Vec<Arc<T>>>().ok());
        if let Some(list) = cached {
            return list.as_ref().clone();
        }

        // Held until the insert so a concurrent registration clears the cache
        // only after the list below is stored.
        let entries = self.entries.read().expect("service registry poisoned");
        let list: Vec<Arc<T>> = ranked(&entries, key)
            .into_iter()
            .filter_map(|(_, _, instance)| instance.downcast_ref::<Arc<T>>().cloned())
            .collect();
        self.ordered
            .write()
            .expect("service cache poisoned")
            .entry(key)
            .or_insert_with(|| Arc::new(list.clone()) as Erased);
        list
    }

    /// Returns the single highest-priority implementation of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AmbiguousService`] when two or more
    /// implementations share the highest priority.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned.
    pub fn service<T>(&self) -> ConfigResult<Option<Arc<T>>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        let cached = self
            .singletons
            .read()
            .expect("service cache poisoned")
            .get(&key)
            .and_then(|erased| erased.downcast_ref::<Arc<T>>().cloned());
        if cached.is_some() {
            return Ok(cached);
        }

        let entries = self.entries.read().expect("service registry poisoned");
        let ranked = ranked(&entries, key);
        let Some((top_name, top_priority, instance)) = ranked.first() else {
            return Ok(None);
        };
        let tied: Vec<_> = ranked
            .iter()
            .filter(|(_, priority, _)| priority == top_priority)
            .map(|(name, _, _)| name.clone())
            .collect();
        if tied.len() > 1 {
            return Err(ConfigError::AmbiguousService {
                capability: key.name().to_owned(),
                priority: *top_priority,
                candidates: tied,
            });
        }

        let Some(service) = instance.downcast_ref::<Arc<T>>().cloned() else {
            return Ok(None);
        };
        debug!(capability = key.name(), service = %top_name, "resolved singleton service");
        self.singletons
            .write()
            .expect("service cache poisoned")
            .entry(key)
            .or_insert_with(|| Arc::clone(instance));
        Ok(Some(service))
    }
}

fn ranked(entries: &HashMap<TypeKey, Vec<ServiceEntry>>, key: TypeKey) -> Vec<(String, i32, Erased)> {
    let mut ranked: Vec<_> = entries
        .get(&key)
        .map(|list| {
            list.iter()
                .map(|e| (e.name.clone(), e.priority, Arc::clone(&e.instance)))
                .collect()
        })
        .unwrap_or_default();
    ranked.sort_by_key(|(_, priority, _)| std::cmp::Reverse(*priority));
    ranked
}

/// A named bundle of service registrations applied by
/// [`ServiceContext::bootstrap`].
pub struct ServicePlugin {
    name: &'static str,
    register: fn(&ServiceContext),
}

impl ServicePlugin {
    /// Creates a plugin with a unique name and a registration function.
    #[must_use]
    pub const fn new(name: &'static str, register: fn(&ServiceContext)) -> Self {
        Self { name, register }
    }

    /// Returns the plugin name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ServicePlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServicePlugin")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

inventory::collect!(ServicePlugin);

fn register_environment(services: &ServiceContext) {
    let source: Arc<dyn PropertySource> = Arc::new(EnvironmentPropertySource::new());
    services.register(EnvironmentPropertySource::NAME, source);
}

inventory::submit! {
    ServicePlugin::new("strata.environment", register_environment)
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync + std::fmt::Debug {
        fn greet(&self) -> String;
    }

    #[derive(Debug)]
    struct Fixed(&'static str);

    impl Greeter for Fixed {
        fn greet(&self) -> String {
            self.0.to_owned()
        }
    }

    fn greeter(text: &'static str) -> Arc<dyn Greeter> {
        Arc::new(Fixed(text))
    }

    #[test]
    fn services_ordered_by_priority_then_registration() {
        let services = ServiceContext::new();
        services.register("first", greeter("first"));
        services.register_with_priority("high", 10, greeter("high"));
        services.register("second", greeter("second"));

        let names: Vec<_> = services.services::<dyn Greeter>().iter().map(|g| g.greet()).collect();
        assert_eq!(names, ["high", "first", "second"]);
        assert_eq!(
            services.service::<dyn Greeter>().unwrap().map(|g| g.greet()).as_deref(),
            Some("high")
        );
    }

    #[test]
    fn tie_at_top_is_ambiguous() {
        let services = ServiceContext::new();
        services.register("a", greeter("a"));
        services.register("b", greeter("b"));

        let err = services.service::<dyn Greeter>().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::AmbiguousService { priority: DEFAULT_PRIORITY, ref candidates, .. }
                if candidates.len() == 2
        ));
    }

    #[test]
    fn registration_invalidates_cached_order() {
        let services = ServiceContext::new();
        services.register("a", greeter("a"));
        assert_eq!(services.services::<dyn Greeter>().len(), 1);
        assert!(services.service::<dyn Greeter>().unwrap().is_some());

        services.register_with_priority("b", 5, greeter("b"));
        assert_eq!(services.services::<dyn Greeter>().len(), 2);
        assert_eq!(
            services.service::<dyn Greeter>().unwrap().map(|g| g.greet()).as_deref(),
            Some("b")
        );
    }

    #[test]
    fn unknown_capability_is_empty() {
        let services = ServiceContext::new();
        assert!(services.services::<dyn Greeter>().is_empty());
        assert!(services.service::<dyn Greeter>().unwrap().is_none());
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let services = ServiceContext::new();
        assert!(services.bootstrap() >= 1);
        assert_eq!(services.bootstrap(), 0);
        assert_eq!(services.services::<dyn PropertySource>().len(), 1);
    }

    #[test]
    fn concurrent_lookups_never_cache_a_stale_list() {
        for _ in 0..200 {
            let services = ServiceContext::new();
            std::thread::scope(|scope| {
                scope.spawn(|| {
                    for _ in 0..20 {
                        let _ = services.services::<dyn Greeter>();
                        let _ = services.service::<dyn Greeter>();
                    }
                });
                services.register("late", greeter("late"));
            });
            assert_eq!(services.services::<dyn Greeter>().len(), 1);
            assert!(services.service::<dyn Greeter>().unwrap().is_some());
        }
    }
}
