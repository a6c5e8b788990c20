//! Interceptor service references

use std::fmt;

use ricecoder_di::Service;

use crate::proxy::Interceptor;

/// Identifies where an interceptor is resolved from: a typed service or a
/// named `dyn Interceptor` service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterceptorService(Service);

impl InterceptorService {
    /// The interceptor registered as its own type `T`
    pub fn typed<T: 'static>() -> Self {
        Self(Service::typed::<T>())
    }

    /// The interceptor registered as `dyn Interceptor` under `name`
    pub fn named(name: impl Into<String>) -> Self {
        Self(Service::keyed_interface::<dyn Interceptor>(name))
    }

    pub fn service(&self) -> &Service {
        &self.0
    }

    /// A keyed reference with an empty key cannot identify anything
    pub(crate) fn is_blank(&self) -> bool {
        matches!(self.0.key(), Some(key) if key.trim().is_empty())
    }
}

impl From<Service> for InterceptorService {
    fn from(service: Service) -> Self {
        Self(service)
    }
}

impl From<&str> for InterceptorService {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for InterceptorService {
    fn from(name: String) -> Self {
        Self::named(name)
    }
}

impl fmt::Display for InterceptorService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Audit;

    #[test]
    fn test_equality() {
        assert_eq!(InterceptorService::named("log"), InterceptorService::from("log"));
        assert_ne!(InterceptorService::named("log"), InterceptorService::named("audit"));
        assert_eq!(InterceptorService::typed::<Audit>(), InterceptorService::typed::<Audit>());
        assert_ne!(InterceptorService::typed::<Audit>(), InterceptorService::named("audit"));
    }

    #[test]
    fn test_blank_names() {
        assert!(InterceptorService::named("  ").is_blank());
        assert!(!InterceptorService::named("log").is_blank());
        assert!(!InterceptorService::typed::<Audit>().is_blank());
    }
}
