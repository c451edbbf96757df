//! Registry resolving the ordered converters for a target type.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::converter::{ConverterEntry, ErasedFn};
use crate::hierarchy::{AncestorKind, Hierarchy};
use crate::{
    ConversionContext, ConvertResult, Converter, ConverterHandle, ConverterId, ConverterOrigin, ConverterPlugin,
    FactoryMethod, TypeDescriptor, TypeKey,
};

#[derive(Default)]
struct RegistryInner {
    registrations: Vec<(TypeKey, ConverterEntry)>,
    hierarchy: Hierarchy,
    applied_plugins: HashSet<&'static str>,
}

/// Holds converters keyed by target type and resolves candidates per type.
///
/// Resolution for a type `T` yields, in order:
///
/// 1. converters registered for `T`, in registration order;
/// 2. when there are none, the factory method declared for `T`;
/// 3. converters registered for the nearest declared subtypes whose superclass
///    chain reaches `T`;
/// 4. converters registered for declared types implementing `T`, breadth first,
///    skipping converters already listed.
///
/// Results are cached per type until the next registration or declaration.
#[derive(Default)]
pub struct ConverterRegistry {
    inner: RwLock<RegistryInner>,
    cache: RwLock<HashMap<TypeKey, Arc<[ConverterEntry]>>>,
    next_id: AtomicU64,
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read().expect("converter registry poisoned");
        let registered: Vec<_> = inner
            .registrations
            .iter()
            .map(|(key, entry)| format!("{}: {}", key.short_name(), entry.name))
            .collect();
        let mut plugins: Vec<_> = inner.applied_plugins.iter().copied().collect();
        plugins.sort_unstable();
        f.debug_struct("ConverterRegistry")
            .field("registered", &registered)
            .field("plugins", &plugins)
            .finish_non_exhaustive()
    }
}

impl ConverterRegistry {
    /// Creates an empty registry. Discovered converters are not loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every discovered plugin applied.
    #[must_use]
    pub fn with_discovered() -> Self {
        let registry = Self::new();
        registry.add_discovered_converters();
        registry
    }

    /// Registers a converter for `T` and returns its id.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn register<T, C>(&self, name: impl Into<Arc<str>>, converter: C) -> ConverterId
    where
        T: Send + 'static,
        C: Converter<T> + 'static,
    {
        let id = self.allocate_id();
        let entry = ConverterEntry::erase::<T, C>(id, name.into(), converter);
        let key = TypeKey::of::<T>();
        debug!(target_type = key.name(), converter = %entry.name, "registered converter");
        self.inner
            .write()
            .expect("converter registry poisoned")
            .registrations
            .push((key, entry));
        self.clear_cache();
        id
    }

    /// Registers a closure as a converter for `T`.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn register_fn<T, F>(&self, name: impl Into<Arc<str>>, convert: F) -> ConverterId
    where
        T: Send + 'static,
        F: Fn(&str, &mut ConversionContext) -> ConvertResult<Option<T>> + Send + Sync + 'static,
    {
        self.register::<T, F>(name, convert)
    }

    /// Declares the supertypes of `T`, replacing any earlier declaration for it.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn declare_type<T: Send + 'static>(&self, descriptor: TypeDescriptor<T>) {
        self.inner
            .write()
            .expect("converter registry poisoned")
            .hierarchy
            .declare(descriptor.into_declared());
        self.clear_cache();
    }

    /// Returns the converters able to produce `T`, in resolution order.
    ///
    /// An empty list means no converter is known.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned.
    #[must_use]
    pub fn converters<T: 'static>(&self) -> Vec<ConverterHandle<T>> {
        self.resolve(TypeKey::of::<T>())
            .iter()
            .cloned()
            .map(ConverterHandle::new)
            .collect()
    }

    /// Whether at least one converter, registered or derived, can produce `target`.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned.
    #[must_use]
    pub fn is_target_type_supported(&self, target: TypeKey) -> bool {
        !self.resolve(target).is_empty()
    }

    /// Applies every discovered [`ConverterPlugin`] not yet applied to this
    /// registry and returns how many were applied.
    ///
    /// # Panics
    ///
    /// Panics if the internal registry lock is poisoned.
    pub fn add_discovered_converters(&self) -> usize {
        let pending: Vec<_> = {
            let mut inner = self.inner.write().expect("converter registry poisoned");
            ConverterPlugin::all()
                .filter(|plugin| inner.applied_plugins.insert(plugin.name()))
                .collect()
        };
        for plugin in &pending {
            debug!(plugin = plugin.name(), "applying converter plugin");
            plugin.apply(self);
        }
        pending.len()
    }

    /// Drops every cached resolution.
    ///
    /// # Panics
    ///
    /// Panics if the cache lock is poisoned.
    pub fn clear_cache(&self) {
        self.cache.write().expect("converter cache poisoned").clear();
    }

    fn allocate_id(&self) -> ConverterId {
        ConverterId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn resolve(&self, target: TypeKey) -> Arc<[ConverterEntry]> {
        if let Some(cached) = self
            .cache
            .read()
            .expect("converter cache poisoned")
            .get(&target)
        {
            return Arc::clone(cached);
        }

        // Registrations clear the cache after releasing `inner`, so holding the
        // read guard until the insert keeps a stale list out of the cache.
        let inner = self.inner.read().expect("converter registry poisoned");
        let resolved: Arc<[ConverterEntry]> = self.compute(&inner, target).into();
        let mut cache = self.cache.write().expect("converter cache poisoned");
        Arc::clone(cache.entry(target).or_insert(resolved))
    }

    fn compute(&self, inner: &RegistryInner, target: TypeKey) -> Vec<ConverterEntry> {
        let mut resolved: Vec<ConverterEntry> = inner
            .registrations
            .iter()
            .filter(|(key, _)| *key == target)
            .map(|(_, entry)| entry.clone())
            .collect();

        if resolved.is_empty() {
            if let Some(method) = FactoryMethod::lookup(target) {
                resolved.push(self.factory_entry(method));
            }
        }

        let mut by_superclass = Vec::new();
        let mut by_interface = Vec::new();
        for (key, entry) in &inner.registrations {
            if *key == target {
                continue;
            }
            let Some(ancestor) = inner
                .hierarchy
                .ancestors(*key)
                .into_iter()
                .find(|ancestor| ancestor.key == target)
            else {
                continue;
            };
            match ancestor.kind {
                AncestorKind::Superclass { depth } => {
                    let origin = ConverterOrigin::Superclass {
                        declared_for: *key,
                        depth,
                    };
                    by_superclass.push((depth, entry.derive(origin, ancestor.upcast, target)));
                }
                AncestorKind::Interface { rank } => {
                    let origin = ConverterOrigin::Interface {
                        declared_for: *key,
                        rank,
                    };
                    by_interface.push((rank, entry.derive(origin, ancestor.upcast, target)));
                }
            }
        }

        if let Some(nearest) = by_superclass.iter().map(|(depth, _)| *depth).min() {
            resolved.extend(
                by_superclass
                    .into_iter()
                    .filter(|(depth, _)| *depth == nearest)
                    .map(|(_, entry)| entry),
            );
        }

        by_interface.sort_by_key(|(rank, _)| *rank);
        let mut seen: HashSet<ConverterId> = resolved.iter().map(|entry| entry.id).collect();
        resolved.extend(
            by_interface
                .into_iter()
                .map(|(_, entry)| entry)
                .filter(|entry| seen.insert(entry.id)),
        );

        debug!(
            target_type = target.name(),
            converters = resolved.len(),
            "resolved converters"
        );
        resolved
    }

    fn factory_entry(&self, method: &'static FactoryMethod) -> ConverterEntry {
        let target = method.target();
        let label = format!("{}::{}", target.short_name(), method.name());
        let format = format!("{}(String)", method.name());
        let name: Arc<str> = label.clone().into();
        let convert: ErasedFn = Arc::new(move |value: &str, ctx: &mut ConversionContext| {
            ctx.add_supported_formats(&label, [format.as_str()]);
            match method.invoke(value) {
                Ok(produced) => Ok(Some(produced)),
                Err(reason) => {
                    debug!(factory = %label, %reason, "factory method rejected value");
                    Ok(None)
                }
            }
        });
        ConverterEntry {
            id: self.allocate_id(),
            name,
            origin: ConverterOrigin::FactoryMethod(method.name()),
            convert,
        }
    }
}
