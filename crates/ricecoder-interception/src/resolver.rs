//! Interceptor resolution
//!
//! Merges a registration's explicit and attribute-derived interceptor
//! services, then resolves each one from the current scope.

use std::sync::Arc;

use ricecoder_di::{ComponentContext, DIError, DIResult, Extensions, TypeDescriptor};
use tracing::debug;

use crate::attributes::scan_for_interceptors;
use crate::proxy::Interceptor;
use crate::registry::{interceptor_services, ServiceSet};
use crate::service::InterceptorService;

/// The interceptor services that apply to one component: explicit services
/// in registration order, then attribute-derived ones not already present.
///
/// Attribute-derived services come from the registration when stored there,
/// otherwise from a fresh scan of `implementation` and `interfaces`.
pub fn interceptor_services_for(
    extensions: &Extensions,
    implementation: &TypeDescriptor,
    interfaces: &[TypeDescriptor],
) -> Vec<InterceptorService> {
    let stored = interceptor_services(extensions);
    let mut merged = ServiceSet::new();

    if let Some(stored) = stored {
        merged.extend(stored.explicit().iter().cloned());
    }

    match stored.and_then(|s| s.attribute_derived()) {
        Some(cached) => merged.extend(cached.iter().cloned()),
        None => merged.extend(scan_for_interceptors(implementation, interfaces)),
    }

    merged.into_vec()
}

/// Resolve `services` to interceptor instances, preserving order.
///
/// Resolution failures propagate unchanged.
pub fn resolve_interceptors(
    context: ComponentContext<'_>,
    services: &[InterceptorService],
) -> DIResult<Vec<Arc<dyn Interceptor>>> {
    let interceptors = services
        .iter()
        .map(|service| {
            let instance = context.resolve_service(service.service())?;
            instance
                .view::<dyn Interceptor>()
                .ok_or_else(|| DIError::InvalidServiceType {
                    message: format!(
                        "{} resolved for interceptor service {} does not implement Interceptor",
                        instance.descriptor(),
                        service
                    ),
                })
        })
        .collect::<DIResult<Vec<_>>>()?;

    debug!("Resolved {} interceptor(s)", interceptors.len());
    Ok(interceptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{add_interceptor_services, InterceptorKey};

    struct Marked;

    crate::intercept!(Marked => ["marked"]);

    fn keys(services: &[InterceptorService]) -> Vec<&str> {
        services.iter().filter_map(|s| s.service().key()).collect()
    }

    #[test]
    fn test_scans_markers_when_nothing_stored() {
        let extensions = Extensions::new();
        let services = interceptor_services_for(&extensions, &TypeDescriptor::of::<Marked>(), &[]);
        assert_eq!(keys(&services), vec!["marked"]);
    }

    #[test]
    fn test_stored_attribute_set_replaces_scan() {
        let mut extensions = Extensions::new();
        add_interceptor_services(
            &mut extensions,
            InterceptorKey::AttributeDerived,
            [InterceptorService::named("stored")],
        )
        .unwrap();

        let services = interceptor_services_for(&extensions, &TypeDescriptor::of::<Marked>(), &[]);
        assert_eq!(keys(&services), vec!["stored"]);
    }

    #[test]
    fn test_empty_stored_attribute_set_suppresses_scan() {
        let mut extensions = Extensions::new();
        add_interceptor_services(&mut extensions, InterceptorKey::AttributeDerived, Vec::new()).unwrap();
        add_interceptor_services(
            &mut extensions,
            InterceptorKey::Explicit,
            [InterceptorService::named("explicit")],
        )
        .unwrap();

        let services = interceptor_services_for(&extensions, &TypeDescriptor::of::<Marked>(), &[]);
        assert_eq!(keys(&services), vec!["explicit"]);
    }

    #[test]
    fn test_explicit_only_still_scans_markers() {
        let mut extensions = Extensions::new();
        add_interceptor_services(
            &mut extensions,
            InterceptorKey::Explicit,
            [InterceptorService::named("explicit"), InterceptorService::named("marked")],
        )
        .unwrap();

        let services = interceptor_services_for(&extensions, &TypeDescriptor::of::<Marked>(), &[]);
        assert_eq!(keys(&services), vec!["explicit", "marked"]);
    }
}
