//! Explicit supertype declarations.
//!
//! Rust has no class inheritance, so the relationships that drive inherited
//! converter resolution are declared up front: a type names at most one
//! superclass and any number of interfaces, each with the function that lifts a
//! value of the type into the supertype.

use std::collections::{HashMap, HashSet, VecDeque};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::converter::{ErasedValue, Upcast};
use crate::TypeKey;

/// Builder declaring the supertypes of `T`.
///
/// ```
/// use strata_convert::TypeDescriptor;
///
/// trait Named: Send {
///     fn name(&self) -> &str;
/// }
///
/// struct Port(String);
///
/// impl Named for Port {
///     fn name(&self) -> &str {
///         &self.0
///     }
/// }
///
/// let descriptor = TypeDescriptor::<Port>::new()
///     .interface(|port: Port| Box::new(port) as Box<dyn Named>);
/// assert_eq!(descriptor.interface_count(), 1);
/// ```
pub struct TypeDescriptor<T> {
    declared: DeclaredType,
    _marker: PhantomData<fn(T)>,
}

impl<T: Send + 'static> TypeDescriptor<T> {
    /// Starts a declaration with no supertypes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            declared: DeclaredType {
                key: TypeKey::of::<T>(),
                superclass: None,
                interfaces: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    /// Declares the superclass of `T`, replacing any earlier declaration.
    #[must_use]
    pub fn superclass<P, F>(mut self, upcast: F) -> Self
    where
        P: Send + 'static,
        F: Fn(T) -> P + Send + Sync + 'static,
    {
        self.declared.superclass = Some(SuperLink::new::<T, P, F>(upcast));
        self
    }

    /// Declares an interface implemented by `T`. Declaration order is kept.
    #[must_use]
    pub fn interface<P, F>(mut self, upcast: F) -> Self
    where
        P: Send + 'static,
        F: Fn(T) -> P + Send + Sync + 'static,
    {
        let link = SuperLink::new::<T, P, F>(upcast);
        self.declared.interfaces.retain(|existing| existing.target != link.target);
        self.declared.interfaces.push(link);
        self
    }

    /// Returns the number of declared interfaces.
    #[must_use]
    pub fn interface_count(&self) -> usize {
        self.declared.interfaces.len()
    }

    pub(crate) fn into_declared(self) -> DeclaredType {
        self.declared
    }
}

impl<T: Send + 'static> Default for TypeDescriptor<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub(crate) struct SuperLink {
    target: TypeKey,
    upcast: Upcast,
}

impl SuperLink {
    fn new<T, P, F>(upcast: F) -> Self
    where
        T: Send + 'static,
        P: Send + 'static,
        F: Fn(T) -> P + Send + Sync + 'static,
    {
        let upcast: Upcast = Arc::new(move |value: ErasedValue| {
            value
                .downcast::<T>()
                .ok()
                .map(|typed| Box::new(upcast(*typed)) as ErasedValue)
        });
        Self {
            target: TypeKey::of::<P>(),
            upcast,
        }
    }
}

#[derive(Clone)]
pub(crate) struct DeclaredType {
    pub(crate) key: TypeKey,
    superclass: Option<SuperLink>,
    interfaces: Vec<SuperLink>,
}

/// Relationship between a registered type and one of its ancestors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AncestorKind {
    Superclass { depth: usize },
    Interface { rank: usize },
}

#[derive(Clone)]
pub(crate) struct Ancestor {
    pub(crate) key: TypeKey,
    pub(crate) kind: AncestorKind,
    pub(crate) upcast: Upcast,
}

/// Declared types, keyed by the type they describe.
#[derive(Clone, Default)]
pub(crate) struct Hierarchy {
    types: HashMap<TypeKey, DeclaredType>,
}

impl Hierarchy {
    pub(crate) fn declare(&mut self, declared: DeclaredType) {
        self.types.insert(declared.key, declared);
    }

    /// Lists every ancestor of `key`: the superclass chain nearest first, then
    /// the interfaces breadth first through the type, its interfaces and its
    /// superclasses. Each ancestor is reported once.
    pub(crate) fn ancestors(&self, key: TypeKey) -> Vec<Ancestor> {
        let mut result = Vec::new();
        let mut seen = HashSet::from([key]);

        let mut current = key;
        let mut path = identity();
        let mut depth = 0;
        while let Some(link) = self.types.get(&current).and_then(|t| t.superclass.as_ref()) {
            if !seen.insert(link.target) {
                break;
            }
            depth += 1;
            path = compose(&path, &link.upcast);
            result.push(Ancestor {
                key: link.target,
                kind: AncestorKind::Superclass { depth },
                upcast: Arc::clone(&path),
            });
            current = link.target;
        }

        let mut visited = HashSet::from([key]);
        let mut queue = VecDeque::from([(key, identity())]);
        let mut rank = 0;
        while let Some((current, path)) = queue.pop_front() {
            let Some(declared) = self.types.get(&current) else {
                continue;
            };
            for link in &declared.interfaces {
                if !visited.insert(link.target) {
                    continue;
                }
                let lifted = compose(&path, &link.upcast);
                if seen.insert(link.target) {
                    result.push(Ancestor {
                        key: link.target,
                        kind: AncestorKind::Interface { rank },
                        upcast: Arc::clone(&lifted),
                    });
                    rank += 1;
                }
                queue.push_back((link.target, lifted));
            }
            if let Some(link) = &declared.superclass {
                if visited.insert(link.target) {
                    queue.push_back((link.target, compose(&path, &link.upcast)));
                }
            }
        }

        result
    }
}

fn identity() -> Upcast {
    Arc::new(|value: ErasedValue| Some(value))
}

fn compose(first: &Upcast, then: &Upcast) -> Upcast {
    let first = Arc::clone(first);
    let then = Arc::clone(then);
    Arc::new(move |value: ErasedValue| first(value).and_then(|lifted| then(lifted)))
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: Send {
        fn label(&self) -> String;
    }

    trait Drawable: Send {
        fn draw(&self) -> String;
    }

    #[derive(Debug)]
    struct Square(u32);

    #[derive(Debug)]
    struct Rect(u32);

    impl Shape for Rect {
        fn label(&self) -> String {
            format!("rect {}", self.0)
        }
    }

    impl Drawable for Rect {
        fn draw(&self) -> String {
            format!("[{}]", self.0)
        }
    }

    fn hierarchy() -> Hierarchy {
        let mut hierarchy = Hierarchy::default();
        hierarchy.declare(
            TypeDescriptor::<Square>::new()
                .superclass(|sq: Square| Rect(sq.0))
                .into_declared(),
        );
        hierarchy.declare(
            TypeDescriptor::<Rect>::new()
                .interface(|r: Rect| Box::new(r) as Box<dyn Shape>)
                .interface(|r: Rect| Box::new(r) as Box<dyn Drawable>)
                .into_declared(),
        );
        hierarchy
    }

    #[test]
    fn superclass_chain_then_inherited_interfaces() {
        let ancestors = hierarchy().ancestors(TypeKey::of::<Square>());
        let kinds: Vec<_> = ancestors.iter().map(|a| (a.key, a.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (TypeKey::of::<Rect>(), AncestorKind::Superclass { depth: 1 }),
                (TypeKey::of::<Box<dyn Shape>>(), AncestorKind::Interface { rank: 0 }),
                (TypeKey::of::<Box<dyn Drawable>>(), AncestorKind::Interface { rank: 1 }),
            ]
        );
    }

    #[test]
    fn composed_upcast_lifts_through_superclass() {
        let ancestors = hierarchy().ancestors(TypeKey::of::<Square>());
        let shape = ancestors
            .iter()
            .find(|a| a.key == TypeKey::of::<Box<dyn Shape>>())
            .expect("shape ancestor");
        let lifted = (shape.upcast)(Box::new(Square(4))).expect("lift");
        let shape = lifted.downcast::<Box<dyn Shape>>().expect("shape");
        assert_eq!(shape.label(), "rect 4");
    }

    #[test]
    fn undeclared_type_has_no_ancestors() {
        assert!(hierarchy().ancestors(TypeKey::of::<u8>()).is_empty());
    }
}
