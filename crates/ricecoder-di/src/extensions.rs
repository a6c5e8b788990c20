//! Typed extension storage attached to registrations

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// A map holding at most one value per type.
///
/// Extensions use it to attach their own metadata to a registration without
/// the container knowing about it.
#[derive(Default)]
pub struct Extensions {
    values: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.values
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values.get(&TypeId::of::<T>())?.downcast_ref::<T>()
    }

    pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.values.get_mut(&TypeId::of::<T>())?.downcast_mut::<T>()
    }

    /// The value of type `T`, inserting `T::default()` first if absent
    pub fn get_or_default<T: Default + Send + Sync + 'static>(&mut self) -> &mut T {
        let value = self
            .values
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()));
        match value.downcast_mut::<T>() {
            Some(value) => value,
            None => unreachable!("extension stored under the TypeId of another type"),
        }
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions").field("len", &self.values.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Tags(Vec<&'static str>);

    #[test]
    fn test_insert_and_get() {
        let mut extensions = Extensions::new();
        assert!(extensions.insert(Tags(vec!["a"])).is_none());
        assert_eq!(extensions.get::<Tags>(), Some(&Tags(vec!["a"])));

        let old = extensions.insert(Tags(vec!["b"]));
        assert_eq!(old, Some(Tags(vec!["a"])));
        assert_eq!(extensions.len(), 1);
    }

    #[test]
    fn test_get_or_default() {
        let mut extensions = Extensions::new();
        extensions.get_or_default::<Tags>().0.push("x");
        extensions.get_or_default::<Tags>().0.push("y");
        assert_eq!(extensions.get::<Tags>(), Some(&Tags(vec!["x", "y"])));
        assert!(extensions.contains::<Tags>());
    }
}
