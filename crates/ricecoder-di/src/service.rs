//! Service identities that registrations expose and consumers request

use std::fmt;

use crate::types::{Interface, TypeDescriptor};

/// Identifies a service that can be resolved from the container.
///
/// Every service carries the type it is resolved as; keyed services add a
/// string key so several registrations of the same type can coexist.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Service {
    /// A service identified by its type alone
    Typed(TypeDescriptor),
    /// A service identified by a key and its type
    Keyed {
        key: String,
        service_type: TypeDescriptor,
    },
}

impl Service {
    /// Typed service for a concrete type
    pub fn typed<T: 'static>() -> Self {
        Service::Typed(TypeDescriptor::of::<T>())
    }

    /// Typed service for an interface
    pub fn interface<I: ?Sized + Interface>() -> Self {
        Service::Typed(I::descriptor())
    }

    /// Keyed service for a concrete type
    pub fn keyed<T: 'static>(key: impl Into<String>) -> Self {
        Service::Keyed {
            key: key.into(),
            service_type: TypeDescriptor::of::<T>(),
        }
    }

    /// Keyed service for an interface
    pub fn keyed_interface<I: ?Sized + Interface>(key: impl Into<String>) -> Self {
        Service::Keyed {
            key: key.into(),
            service_type: I::descriptor(),
        }
    }

    /// The type this service is resolved as
    pub fn service_type(&self) -> &TypeDescriptor {
        match self {
            Service::Typed(descriptor) => descriptor,
            Service::Keyed { service_type, .. } => service_type,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Service::Typed(_) => None,
            Service::Keyed { key, .. } => Some(key),
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Typed(descriptor) => write!(f, "{}", descriptor),
            Service::Keyed { key, service_type } => write!(f, "({}) {}", key, service_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Database;

    #[test]
    fn test_keyed_services_differ_by_key() {
        let primary = Service::keyed::<Database>("primary");
        let replica = Service::keyed::<Database>("replica");

        assert_ne!(primary, replica);
        assert_eq!(primary, Service::keyed::<Database>("primary"));
        assert_ne!(primary, Service::typed::<Database>());
        assert_eq!(primary.key(), Some("primary"));
        assert_eq!(primary.service_type(), &TypeDescriptor::of::<Database>());
    }

    #[test]
    fn test_display() {
        let service = Service::keyed::<Database>("primary");
        assert!(service.to_string().starts_with("(primary) "));
        assert!(service.to_string().ends_with("Database"));
    }
}
