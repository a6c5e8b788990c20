//! Interceptor services attached to component registrations
//!
//! Each registration may carry two independent, ordered and de-duplicated
//! collections: services added explicitly through the fluent API, and
//! services derived from `intercept!` markers when class interception is
//! enabled. They are merged only when interceptors are resolved.

use ricecoder_di::Extensions;
use tracing::debug;

use crate::error::{InterceptionError, InterceptionResult};
use crate::service::InterceptorService;

/// Which collection a set of interceptor services belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptorKey {
    Explicit,
    AttributeDerived,
}

/// An insertion-ordered set of interceptor services
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceSet {
    services: Vec<InterceptorService>,
}

impl ServiceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `service` unless it is already present; returns whether it was added
    pub fn insert(&mut self, service: InterceptorService) -> bool {
        if self.services.contains(&service) {
            false
        } else {
            self.services.push(service);
            true
        }
    }

    pub fn contains(&self, service: &InterceptorService) -> bool {
        self.services.contains(service)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InterceptorService> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn into_vec(self) -> Vec<InterceptorService> {
        self.services
    }
}

impl Extend<InterceptorService> for ServiceSet {
    fn extend<I: IntoIterator<Item = InterceptorService>>(&mut self, iter: I) {
        for service in iter {
            self.insert(service);
        }
    }
}

impl FromIterator<InterceptorService> for ServiceSet {
    fn from_iter<I: IntoIterator<Item = InterceptorService>>(iter: I) -> Self {
        let mut set = ServiceSet::new();
        set.extend(iter);
        set
    }
}

impl<'s> IntoIterator for &'s ServiceSet {
    type Item = &'s InterceptorService;
    type IntoIter = std::slice::Iter<'s, InterceptorService>;

    fn into_iter(self) -> Self::IntoIter {
        self.services.iter()
    }
}

/// Interceptor metadata stored in a registration's extensions
#[derive(Debug, Clone, Default)]
pub struct InterceptorServices {
    explicit: ServiceSet,
    attribute_derived: Option<ServiceSet>,
}

impl InterceptorServices {
    pub fn explicit(&self) -> &ServiceSet {
        &self.explicit
    }

    /// Attribute-derived services, if they were stored
    pub fn attribute_derived(&self) -> Option<&ServiceSet> {
        self.attribute_derived.as_ref()
    }
}

/// Union `services` into the collection stored under `key`.
///
/// Fails without modifying anything if a service has a blank name.
pub fn add_interceptor_services<I>(
    extensions: &mut Extensions,
    key: InterceptorKey,
    services: I,
) -> InterceptionResult<()>
where
    I: IntoIterator<Item = InterceptorService>,
{
    let services: Vec<InterceptorService> = services.into_iter().collect();
    if let Some(blank) = services.iter().position(InterceptorService::is_blank) {
        return Err(InterceptionError::InvalidArgument {
            message: format!("Interceptor service at position {} has an empty name", blank),
        });
    }

    let stored = extensions.get_or_default::<InterceptorServices>();
    let target = match key {
        InterceptorKey::Explicit => &mut stored.explicit,
        InterceptorKey::AttributeDerived => stored.attribute_derived.get_or_insert_with(ServiceSet::new),
    };
    target.extend(services);

    debug!("{:?} interceptor services now {:?}", key, target);
    Ok(())
}

pub fn interceptor_services(extensions: &Extensions) -> Option<&InterceptorServices> {
    extensions.get::<InterceptorServices>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(set: &ServiceSet) -> Vec<String> {
        set.iter().map(|s| s.service().key().unwrap_or_default().to_string()).collect()
    }

    #[test]
    fn test_union_preserves_first_occurrence() {
        let mut extensions = Extensions::new();
        add_interceptor_services(
            &mut extensions,
            InterceptorKey::Explicit,
            ["a", "b", "a"].map(InterceptorService::from),
        )
        .unwrap();
        add_interceptor_services(
            &mut extensions,
            InterceptorKey::Explicit,
            ["c", "b"].map(InterceptorService::from),
        )
        .unwrap();

        let stored = interceptor_services(&extensions).unwrap();
        assert_eq!(names(stored.explicit()), vec!["a", "b", "c"]);
        assert!(stored.attribute_derived().is_none());
    }

    #[test]
    fn test_keys_are_tracked_separately() {
        let mut extensions = Extensions::new();
        add_interceptor_services(&mut extensions, InterceptorKey::Explicit, [InterceptorService::from("a")]).unwrap();
        add_interceptor_services(&mut extensions, InterceptorKey::AttributeDerived, [InterceptorService::from("a")])
            .unwrap();

        let stored = interceptor_services(&extensions).unwrap();
        assert_eq!(stored.explicit().len(), 1);
        assert_eq!(stored.attribute_derived().map(ServiceSet::len), Some(1));
    }

    #[test]
    fn test_empty_attribute_set_is_still_cached() {
        let mut extensions = Extensions::new();
        add_interceptor_services(&mut extensions, InterceptorKey::AttributeDerived, Vec::new()).unwrap();

        let stored = interceptor_services(&extensions).unwrap();
        assert_eq!(stored.attribute_derived(), Some(&ServiceSet::new()));
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut extensions = Extensions::new();
        let result = add_interceptor_services(
            &mut extensions,
            InterceptorKey::Explicit,
            ["ok", ""].map(InterceptorService::from),
        );

        assert!(matches!(result, Err(InterceptionError::InvalidArgument { .. })));
        assert!(interceptor_services(&extensions).is_none());
    }
}
