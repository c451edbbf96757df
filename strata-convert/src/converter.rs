//! Converter contract and the type-erased form stored by the registry.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::{ConversionContext, ConvertError, ConvertResult, FactoryName, TypeKey};

/// Value produced by a type-erased converter.
pub type ErasedValue = Box<dyn Any + Send>;

/// Converts a raw string into a `T`.
///
/// Returning `Ok(None)` means the input is not understood by this converter and
/// the next candidate should be tried.
pub trait Converter<T>: Send + Sync {
    /// Attempts the conversion.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError`] when the input was recognised but could not be
    /// turned into a value. Callers treat errors like `Ok(None)` and move on.
    fn convert(&self, value: &str, ctx: &mut ConversionContext) -> ConvertResult<Option<T>>;
}

impl<T, F> Converter<T> for F
where
    F: Fn(&str, &mut ConversionContext) -> ConvertResult<Option<T>> + Send + Sync,
{
    fn convert(&self, value: &str, ctx: &mut ConversionContext) -> ConvertResult<Option<T>> {
        (self)(value, ctx)
    }
}

/// Identifier assigned to each registration.
///
/// Converters derived for supertypes keep the id of the registration they
/// wrap, which is how duplicates are detected during resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConverterId(pub(crate) u64);

/// How a resolved converter relates to the requested type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConverterOrigin {
    /// Registered for exactly the requested type.
    Direct,
    /// Synthesised from a declared factory method of the requested type.
    FactoryMethod(FactoryName),
    /// Registered for a type whose superclass chain reaches the requested type.
    Superclass {
        /// Type the converter was registered for.
        declared_for: TypeKey,
        /// Number of superclass links between the two types.
        depth: usize,
    },
    /// Registered for a type implementing the requested interface.
    Interface {
        /// Type the converter was registered for.
        declared_for: TypeKey,
        /// Breadth-first position of the interface among that type's interfaces.
        rank: usize,
    },
}

pub(crate) type ErasedFn =
    Arc<dyn Fn(&str, &mut ConversionContext) -> ConvertResult<Option<ErasedValue>> + Send + Sync>;

pub(crate) type Upcast = Arc<dyn Fn(ErasedValue) -> Option<ErasedValue> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct ConverterEntry {
    pub(crate) id: ConverterId,
    pub(crate) name: Arc<str>,
    pub(crate) origin: ConverterOrigin,
    pub(crate) convert: ErasedFn,
}

impl ConverterEntry {
    pub(crate) fn erase<T, C>(id: ConverterId, name: Arc<str>, converter: C) -> Self
    where
        T: Send + 'static,
        C: Converter<T> + 'static,
    {
        let convert: ErasedFn = Arc::new(move |value: &str, ctx: &mut ConversionContext| {
            Ok(converter
                .convert(value, ctx)?
                .map(|v| Box::new(v) as ErasedValue))
        });
        Self {
            id,
            name,
            origin: ConverterOrigin::Direct,
            convert,
        }
    }

    /// Wraps this entry so that its output is lifted to a supertype.
    pub(crate) fn derive(&self, origin: ConverterOrigin, upcast: Upcast, target: TypeKey) -> Self {
        let inner = Arc::clone(&self.convert);
        let name = Arc::clone(&self.name);
        let convert: ErasedFn = Arc::new(move |value: &str, ctx: &mut ConversionContext| {
            match inner(value, ctx)? {
                None => Ok(None),
                Some(produced) => {
                    upcast(produced)
                        .map(Some)
                        .ok_or_else(|| ConvertError::TypeMismatch {
                            converter: name.to_string(),
                            expected: target,
                        })
                }
            }
        });
        Self {
            id: self.id,
            name: Arc::clone(&self.name),
            origin,
            convert,
        }
    }
}

/// Typed view over a resolved converter.
pub struct ConverterHandle<T> {
    entry: ConverterEntry,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ConverterHandle<T> {
    fn clone(&self) -> Self {
        Self {
            entry: self.entry.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ConverterHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterHandle")
            .field("id", &self.entry.id)
            .field("name", &self.entry.name)
            .field("origin", &self.entry.origin)
            .finish()
    }
}

impl<T: 'static> ConverterHandle<T> {
    pub(crate) fn new(entry: ConverterEntry) -> Self {
        Self {
            entry,
            _marker: PhantomData,
        }
    }

    /// Returns the registration id.
    #[must_use]
    pub fn id(&self) -> ConverterId {
        self.entry.id
    }

    /// Returns the name given at registration.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    /// Returns how this converter was found.
    #[must_use]
    pub fn origin(&self) -> ConverterOrigin {
        self.entry.origin
    }

    /// Runs the converter.
    ///
    /// # Errors
    ///
    /// Propagates the converter's own error, or returns
    /// [`ConvertError::TypeMismatch`] if it produced something other than `T`.
    pub fn convert(&self, value: &str, ctx: &mut ConversionContext) -> ConvertResult<Option<T>> {
        match (self.entry.convert)(value, ctx)? {
            None => Ok(None),
            Some(produced) => produced
                .downcast::<T>()
                .map(|typed| Some(*typed))
                .map_err(|_| ConvertError::TypeMismatch {
                    converter: self.entry.name.to_string(),
                    expected: TypeKey::of::<T>(),
                }),
        }
    }
}
