//! Runtime type identity for registered components and services
//!
//! Rust has no runtime reflection, so the container carries a small
//! descriptor for every type it deals with: the `TypeId`, a readable name,
//! whether the type is a concrete class or an interface (trait object), and
//! how visible it is to generated proxies.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A type-erased shared value as stored by the container
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Erase an interface view (`Arc<dyn Trait>`) into an [`AnyArc`].
///
/// The view is stored as `Arc<Arc<dyn Trait>>` so it can be recovered with
/// [`downcast_view`].
pub fn erase_view<I: ?Sized + Send + Sync + 'static>(view: Arc<I>) -> AnyArc {
    Arc::new(view)
}

/// Recover an interface view previously erased with [`erase_view`].
pub fn downcast_view<I: ?Sized + Send + Sync + 'static>(value: &AnyArc) -> Option<Arc<I>> {
    value.downcast_ref::<Arc<I>>().cloned()
}

/// Whether a type is a concrete implementation or an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// A concrete type (struct or enum)
    Class,
    /// A trait object type (`dyn Trait`)
    Interface,
}

/// Visibility of a type as seen by generated proxies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Declared `pub`
    Public,
    /// Declared with a restricted `pub(..)`
    Internal,
    /// Declared without a visibility keyword
    Private,
}

impl Visibility {
    /// Parse the text of a visibility qualifier, as produced by `stringify!($vis)`.
    pub fn from_keyword(keyword: &str) -> Self {
        let compact: String = keyword.chars().filter(|c| !c.is_whitespace()).collect();
        match compact.as_str() {
            "" => Visibility::Private,
            "pub" => Visibility::Public,
            _ if compact.starts_with("pub(") => Visibility::Internal,
            _ => Visibility::Private,
        }
    }

    /// Whether generated proxies may implement or derive from a type with this visibility
    pub fn is_accessible(&self) -> bool {
        !matches!(self, Visibility::Private)
    }
}

/// Identity and static metadata of a Rust type
#[derive(Clone)]
pub struct TypeDescriptor {
    id: TypeId,
    name: Cow<'static, str>,
    kind: TypeKind,
    visibility: Visibility,
}

impl TypeDescriptor {
    /// Descriptor of a concrete type, public by default
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: Cow::Borrowed(std::any::type_name::<T>()),
            kind: TypeKind::Class,
            visibility: Visibility::Public,
        }
    }

    /// Descriptor of an interface (trait object) type
    pub fn interface<I: ?Sized + 'static>(visibility: Visibility) -> Self {
        Self {
            id: TypeId::of::<I>(),
            name: Cow::Borrowed(std::any::type_name::<I>()),
            kind: TypeKind::Interface,
            visibility,
        }
    }

    /// Descriptor of an interface implementing [`Interface`]
    pub fn of_interface<I: ?Sized + Interface>() -> Self {
        I::descriptor()
    }

    /// Descriptor of a type that only exists at runtime (e.g. a generated proxy type)
    pub fn synthesized(id: TypeId, name: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            id,
            name: Cow::Owned(name.into()),
            kind: TypeKind::Class,
            visibility,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_class(&self) -> bool {
        self.kind == TypeKind::Class
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("visibility", &self.visibility)
            .finish()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Implemented for trait object types (`dyn Trait`) that components can be
/// exposed as.
///
/// ```ignore
/// impl Interface for dyn Repository {
///     fn descriptor() -> TypeDescriptor {
///         TypeDescriptor::interface::<dyn Repository>(Visibility::Public)
///     }
/// }
/// ```
pub trait Interface: 'static {
    fn descriptor() -> TypeDescriptor;
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: Send + Sync {
        fn area(&self) -> f64;
    }

    struct Square(f64);

    impl Shape for Square {
        fn area(&self) -> f64 {
            self.0 * self.0
        }
    }

    #[test]
    fn test_visibility_from_keyword() {
        assert_eq!(Visibility::from_keyword(""), Visibility::Private);
        assert_eq!(Visibility::from_keyword("pub"), Visibility::Public);
        assert_eq!(Visibility::from_keyword("pub(crate)"), Visibility::Internal);
        assert_eq!(Visibility::from_keyword("pub (super)"), Visibility::Internal);
        assert!(Visibility::Internal.is_accessible());
        assert!(!Visibility::Private.is_accessible());
    }

    #[test]
    fn test_descriptor_equality_uses_type_id() {
        let a = TypeDescriptor::of::<Square>();
        let b = TypeDescriptor::of::<Square>().with_visibility(Visibility::Private);
        assert_eq!(a, b);
        assert_ne!(a, TypeDescriptor::interface::<dyn Shape>(Visibility::Public));
    }

    #[test]
    fn test_view_round_trip() {
        let view: Arc<dyn Shape> = Arc::new(Square(3.0));
        let erased = erase_view(view.clone());
        let recovered = downcast_view::<dyn Shape>(&erased).unwrap();
        assert_eq!(recovered.area(), 9.0);
        assert!(downcast_view::<Square>(&erased).is_none());
    }
}
