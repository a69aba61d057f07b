//! Static type descriptors for dispatch

use std::any::Any;
use std::fmt;

/// Identity of a declared type. Two descriptors with the same name are the
/// same type as far as dispatch is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag(&'static str);

impl TypeTag {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A declared type and its parent, if any.
///
/// Descriptors are meant to live in `static`s so the ancestor chain is
/// fixed at compile time:
///
/// ```
/// use procmirror_common::dispatch::TypeInfo;
///
/// static OBJECT: TypeInfo = TypeInfo::root("Object");
/// static BASE: TypeInfo = TypeInfo::derived("Base", &OBJECT);
/// static DERIVED: TypeInfo = TypeInfo::derived("Derived", &BASE);
///
/// let chain: Vec<&str> = DERIVED.ancestry().map(TypeInfo::name).collect();
/// assert_eq!(chain, ["Derived", "Base", "Object"]);
/// assert!(DERIVED.is_a(&OBJECT));
/// ```
#[derive(Debug)]
pub struct TypeInfo {
    name: &'static str,
    parent: Option<&'static TypeInfo>,
}

impl TypeInfo {
    /// A type with no parent.
    #[must_use]
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// A type extending `parent`.
    #[must_use]
    pub const fn derived(name: &'static str, parent: &'static TypeInfo) -> Self {
        Self { name, parent: Some(parent) }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn parent(&self) -> Option<&'static TypeInfo> {
        self.parent
    }

    #[must_use]
    pub const fn tag(&self) -> TypeTag {
        TypeTag(self.name)
    }

    /// This type, then its parent, and so on up to the root.
    pub fn ancestry(&self) -> Ancestry<'_> {
        Ancestry { next: Some(self) }
    }

    /// Number of ancestors above this type.
    pub fn depth(&self) -> usize {
        self.ancestry().count() - 1
    }

    /// Returns `true` if `other` is this type or one of its ancestors.
    pub fn is_a(&self, other: &TypeInfo) -> bool {
        self.ancestry().any(|info| info.tag() == other.tag())
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.tag() == other.tag()
    }
}

impl Eq for TypeInfo {}

/// Iterator returned by [`TypeInfo::ancestry`].
#[derive(Debug, Clone)]
pub struct Ancestry<'a> {
    next: Option<&'a TypeInfo>,
}

impl<'a> Iterator for Ancestry<'a> {
    type Item = &'a TypeInfo;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent;
        Some(current)
    }
}

/// A value that can be routed through a [`DispatchCache`](super::DispatchCache).
///
/// Usually implemented with [`impl_dispatchable!`](crate::impl_dispatchable).
pub trait Dispatchable: Any {
    /// Descriptor of the concrete type.
    fn type_info(&self) -> &'static TypeInfo;

    fn as_any(&self) -> &dyn Any;
}

impl<'a> dyn Dispatchable + 'a {
    /// Recover the concrete value inside a handler.
    pub fn downcast_ref<T: Dispatchable>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Implement [`Dispatchable`] for a type from a static [`TypeInfo`].
///
/// ```
/// use procmirror_common::dispatch::{Dispatchable, TypeInfo};
/// use procmirror_common::impl_dispatchable;
///
/// static PLAYER: TypeInfo = TypeInfo::root("Player");
/// struct Player;
/// impl_dispatchable!(Player => PLAYER);
///
/// assert_eq!(Player.type_info().name(), "Player");
/// ```
#[macro_export]
macro_rules! impl_dispatchable {
    ($ty:ty => $info:path) => {
        impl $crate::dispatch::Dispatchable for $ty {
            fn type_info(&self) -> &'static $crate::dispatch::TypeInfo {
                &$info
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
        }
    };
}
