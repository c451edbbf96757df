//! Single-string factory methods declared for target types.
//!
//! Declarations are process-wide and always consulted, independently of
//! converter discovery. Only the fixed names in [`FactoryName`] are recognised.

use std::fmt::{self, Display, Formatter};

use crate::{ErasedValue, TypeKey};

/// Recognised factory method names, in lookup order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FactoryName {
    /// `of(String)`
    Of,
    /// `valueOf(String)`
    ValueOf,
    /// `parse(String)`
    Parse,
    /// `instance(String)`
    Instance,
}

impl FactoryName {
    /// Returns the method name as it appears in diagnostics.
    #[must_use]
    pub const fn method_name(self) -> &'static str {
        match self {
            Self::Of => "of",
            Self::ValueOf => "valueOf",
            Self::Parse => "parse",
            Self::Instance => "instance",
        }
    }
}

impl Display for FactoryName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// A factory method registered with [`factory_method!`](crate::factory_method).
pub struct FactoryMethod {
    name: FactoryName,
    target: fn() -> TypeKey,
    invoke: fn(&str) -> Result<ErasedValue, String>,
}

impl FactoryMethod {
    /// Creates a declaration. Prefer the [`factory_method!`](crate::factory_method) macro.
    #[must_use]
    pub const fn new(
        name: FactoryName,
        target: fn() -> TypeKey,
        invoke: fn(&str) -> Result<ErasedValue, String>,
    ) -> Self {
        Self {
            name,
            target,
            invoke,
        }
    }

    /// Returns the declared method name.
    #[must_use]
    pub const fn name(&self) -> FactoryName {
        self.name
    }

    /// Returns the type the method produces.
    #[must_use]
    pub fn target(&self) -> TypeKey {
        (self.target)()
    }

    /// Invokes the method.
    ///
    /// # Errors
    ///
    /// Returns the method's own failure rendered as a string.
    pub fn invoke(&self, raw: &str) -> Result<ErasedValue, String> {
        (self.invoke)(raw)
    }

    /// Returns the declared factory method for `target` with the lowest
    /// [`FactoryName`], if any.
    #[must_use]
    pub fn lookup(target: TypeKey) -> Option<&'static FactoryMethod> {
        inventory::iter::<FactoryMethod>
            .into_iter()
            .filter(|method| method.target() == target)
            .min_by_key(|method| method.name)
    }
}

impl fmt::Debug for FactoryMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryMethod")
            .field("name", &self.name)
            .field("target", &self.target())
            .finish()
    }
}

inventory::collect!(FactoryMethod);

/// Declares a single-string factory method for a type.
///
/// The function must accept `&str` and return `Result<T, E>` where `E: Display`.
///
/// ```
/// use strata_convert::{factory_method, FactoryMethod, TypeKey};
///
/// #[derive(Debug, PartialEq)]
/// pub struct Hostname(String);
///
/// impl Hostname {
///     pub fn of(raw: &str) -> Result<Self, String> {
///         if raw.is_empty() {
///             return Err("empty hostname".into());
///         }
///         Ok(Self(raw.to_owned()))
///     }
/// }
///
/// factory_method!(Hostname, Of, Hostname::of);
///
/// fn main() {
///     assert!(FactoryMethod::lookup(TypeKey::of::<Hostname>()).is_some());
/// }
/// ```
#[macro_export]
macro_rules! factory_method {
    ($ty:ty, $name:ident, $func:expr) => {
        const _: () = {
            fn __strata_factory_target() -> $crate::TypeKey {
                $crate::TypeKey::of::<$ty>()
            }

            fn __strata_factory_invoke(
                raw: &str,
            ) -> ::core::result::Result<$crate::ErasedValue, ::std::string::String> {
                let produce: fn(&str) -> ::core::result::Result<$ty, _> = $func;
                match produce(raw) {
                    ::core::result::Result::Ok(value) => ::core::result::Result::Ok(
                        ::std::boxed::Box::new(value) as $crate::ErasedValue,
                    ),
                    ::core::result::Result::Err(err) => {
                        ::core::result::Result::Err(::std::string::ToString::to_string(&err))
                    }
                }
            }

            $crate::inventory::submit! {
                $crate::FactoryMethod::new(
                    $crate::FactoryName::$name,
                    __strata_factory_target,
                    __strata_factory_invoke,
                )
            }
        };
    };
}
