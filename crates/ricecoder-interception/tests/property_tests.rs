//! Property-based tests for merging interceptor services

use proptest::prelude::*;
use ricecoder_di::{Extensions, TypeDescriptor};
use ricecoder_interception::{
    add_interceptor_services, interceptor_services_for, InterceptorKey, InterceptorService,
};

struct Component;

fn arb_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::sample::select(vec!["log", "audit", "cache", "retry", "trace", "auth"]), 0..12)
        .prop_map(|names| names.into_iter().map(str::to_string).collect())
}

fn services(names: &[String]) -> Vec<InterceptorService> {
    names.iter().map(|n| InterceptorService::named(n.as_str())).collect()
}

proptest! {
    /// Explicit services in order, then attribute-derived ones not already present
    #[test]
    fn test_explicit_then_attribute_derived(explicit in arb_names(), derived in arb_names()) {
        let mut extensions = Extensions::new();
        add_interceptor_services(&mut extensions, InterceptorKey::Explicit, services(&explicit)).unwrap();
        add_interceptor_services(&mut extensions, InterceptorKey::AttributeDerived, services(&derived)).unwrap();

        let merged = interceptor_services_for(&extensions, &TypeDescriptor::of::<Component>(), &[]);

        let mut expected: Vec<InterceptorService> = Vec::new();
        for service in services(&explicit).into_iter().chain(services(&derived)) {
            if !expected.contains(&service) {
                expected.push(service);
            }
        }
        prop_assert_eq!(merged, expected);
    }

    /// Adding the same services twice never duplicates them
    #[test]
    fn test_repeated_registration_is_idempotent(names in arb_names()) {
        let mut once = Extensions::new();
        add_interceptor_services(&mut once, InterceptorKey::Explicit, services(&names)).unwrap();

        let mut twice = Extensions::new();
        add_interceptor_services(&mut twice, InterceptorKey::Explicit, services(&names)).unwrap();
        add_interceptor_services(&mut twice, InterceptorKey::Explicit, services(&names)).unwrap();

        let component = TypeDescriptor::of::<Component>();
        prop_assert_eq!(
            interceptor_services_for(&once, &component, &[]),
            interceptor_services_for(&twice, &component, &[])
        );
    }
}
