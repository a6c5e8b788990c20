//! Declarative interception markers
//!
//! `intercept!` attaches interceptor services to a concrete type or to a
//! `dyn Trait` interface. Markers are collected across the whole binary
//! with `inventory`, the same way service factories are discovered.
//!
//! ```rust,ignore
//! intercept!(FileStorage => ["audit", InterceptorService::typed::<Timing>()]);
//! intercept!(dyn Storage => ["log"]);
//! ```

use std::any::TypeId;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use ricecoder_di::TypeDescriptor;
use tracing::debug;

use crate::service::InterceptorService;

/// One `intercept!` declaration
pub struct InterceptAttribute {
    target: fn() -> TypeId,
    services: fn() -> Vec<InterceptorService>,
    file: &'static str,
    line: u32,
}

impl InterceptAttribute {
    pub const fn new(
        target: fn() -> TypeId,
        services: fn() -> Vec<InterceptorService>,
        file: &'static str,
        line: u32,
    ) -> Self {
        Self {
            target,
            services,
            file,
            line,
        }
    }

    pub fn target(&self) -> TypeId {
        (self.target)()
    }

    pub fn services(&self) -> Vec<InterceptorService> {
        (self.services)()
    }
}

inventory::collect!(InterceptAttribute);

// Markers per type, in declaration order (by source location).
static MARKERS: Lazy<HashMap<TypeId, Vec<&'static InterceptAttribute>>> = Lazy::new(|| {
    let mut markers: HashMap<TypeId, Vec<&'static InterceptAttribute>> = HashMap::new();
    for attribute in inventory::iter::<InterceptAttribute>() {
        markers.entry(attribute.target()).or_default().push(attribute);
    }
    for declared in markers.values_mut() {
        declared.sort_by_key(|a| (a.file, a.line));
    }
    debug!("Discovered intercept markers on {} type(s)", markers.len());
    markers
});

/// Interceptor services declared directly on one type, in declaration order
pub fn markers_on(type_id: TypeId) -> Vec<InterceptorService> {
    MARKERS
        .get(&type_id)
        .map(|declared| declared.iter().flat_map(|a| a.services()).collect())
        .unwrap_or_default()
}

/// Interceptor services declared on `implementation` followed by those on
/// each of `interfaces`, in order. Duplicates are kept.
///
/// Only concrete types are scanned; an interface yields nothing.
pub fn scan_for_interceptors(
    implementation: &TypeDescriptor,
    interfaces: &[TypeDescriptor],
) -> Vec<InterceptorService> {
    if !implementation.is_class() {
        return Vec::new();
    }

    let mut services = markers_on(implementation.id());
    for interface in interfaces {
        services.extend(markers_on(interface.id()));
    }
    services
}

/// Declare interceptor services for a type or interface.
///
/// String literals name `dyn Interceptor` services registered under that
/// key; any other expression must convert into an [`InterceptorService`].
///
/// [`InterceptorService`]: crate::InterceptorService
#[macro_export]
macro_rules! intercept {
    ($target:ty => [$($service:expr),* $(,)?]) => {
        $crate::__private::inventory::submit! {
            $crate::attributes::InterceptAttribute::new(
                || ::std::any::TypeId::of::<$target>(),
                || ::std::vec![$($crate::InterceptorService::from($service)),*],
                ::std::file!(),
                ::std::line!(),
            )
        }
    };
}
