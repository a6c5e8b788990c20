//! Lifetime scopes
//!
//! The container's root scope owns singleton instances; every nested scope
//! owns its own scoped instances while sharing singletons with the root.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::context::{ComponentContext, ResolveOperation, ResolveRequestContext};
use crate::instance::Instance;
use crate::parameters::Parameter;
use crate::pipeline::SharedInstances;
use crate::registration::ComponentRegistration;
use crate::service::Service;
use crate::types::{downcast_view, AnyArc, Interface};
use crate::{DIError, DIResult};

/// Rewrites an erased interface view; `None` leaves the view untouched
pub(crate) type Decorator = Arc<dyn Fn(&AnyArc) -> Option<AnyArc> + Send + Sync>;

/// Registrations and decorators of a built container
pub(crate) struct ComponentRegistry {
    registrations: Vec<Arc<ComponentRegistration>>,
    by_service: HashMap<Service, Arc<ComponentRegistration>>,
    decorators: HashMap<std::any::TypeId, Vec<Decorator>>,
}

impl ComponentRegistry {
    pub(crate) fn new(
        registrations: Vec<ComponentRegistration>,
        decorators: HashMap<std::any::TypeId, Vec<Decorator>>,
    ) -> Self {
        let registrations: Vec<Arc<ComponentRegistration>> =
            registrations.into_iter().map(Arc::new).collect();

        // Later registrations of a service override earlier ones.
        let mut by_service = HashMap::new();
        for registration in &registrations {
            for service in registration.services() {
                by_service.insert(service.clone(), registration.clone());
            }
        }

        Self {
            registrations,
            by_service,
            decorators,
        }
    }

    pub(crate) fn registration_for(&self, service: &Service) -> Option<&Arc<ComponentRegistration>> {
        self.by_service.get(service)
    }

    pub(crate) fn registrations(&self) -> &[Arc<ComponentRegistration>] {
        &self.registrations
    }

    pub(crate) fn has_decorators(&self) -> bool {
        !self.decorators.is_empty()
    }

    pub(crate) fn decorators_for(&self, interface: std::any::TypeId) -> &[Decorator] {
        self.decorators
            .get(&interface)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// A scope components are resolved from
pub struct LifetimeScope {
    registry: Arc<ComponentRegistry>,
    root: Arc<SharedInstances>,
    instances: Arc<SharedInstances>,
    depth: usize,
}

impl LifetimeScope {
    pub(crate) fn root(registry: Arc<ComponentRegistry>) -> Self {
        let root = Arc::new(SharedInstances::default());
        Self {
            registry,
            instances: root.clone(),
            root,
            depth: 0,
        }
    }

    /// Start a nested scope with its own scoped instances
    pub fn begin_lifetime_scope(&self) -> LifetimeScope {
        debug!("Beginning lifetime scope at depth {}", self.depth + 1);
        LifetimeScope {
            registry: self.registry.clone(),
            root: self.root.clone(),
            instances: Arc::new(SharedInstances::default()),
            depth: self.depth + 1,
        }
    }

    pub(crate) fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub(crate) fn root_instances(&self) -> &SharedInstances {
        &self.root
    }

    pub(crate) fn scope_instances(&self) -> &SharedInstances {
        &self.instances
    }

    pub fn is_registered(&self, service: &Service) -> bool {
        self.registry.registration_for(service).is_some()
    }

    /// The registration that serves `service`, if any
    pub fn registration_for(&self, service: &Service) -> Option<Arc<ComponentRegistration>> {
        self.registry.registration_for(service).cloned()
    }

    pub fn registrations(&self) -> impl Iterator<Item = &Arc<ComponentRegistration>> {
        self.registry.registrations().iter()
    }

    pub fn resolve_service(&self, service: &Service) -> DIResult<Instance> {
        self.resolve_service_with_parameters(service, Vec::new())
    }

    pub fn resolve_service_with_parameters(
        &self,
        service: &Service,
        parameters: Vec<Parameter>,
    ) -> DIResult<Instance> {
        let operation = ResolveOperation::new();
        self.resolve_request(service, parameters, &operation)
    }

    pub fn resolve<T: Send + Sync + 'static>(&self) -> DIResult<Arc<T>> {
        self.resolve_with_parameters::<T>(Vec::new())
    }

    pub fn resolve_with_parameters<T: Send + Sync + 'static>(
        &self,
        parameters: Vec<Parameter>,
    ) -> DIResult<Arc<T>> {
        let instance = self.resolve_service_with_parameters(&Service::typed::<T>(), parameters)?;
        concrete_of::<T>(&instance)
    }

    pub fn resolve_trait<I: ?Sized + Interface + Send + Sync>(&self) -> DIResult<Arc<I>> {
        self.resolve_trait_with_parameters::<I>(Vec::new())
    }

    pub fn resolve_trait_with_parameters<I: ?Sized + Interface + Send + Sync>(
        &self,
        parameters: Vec<Parameter>,
    ) -> DIResult<Arc<I>> {
        let service = Service::interface::<I>();
        let instance = self.resolve_service_with_parameters(&service, parameters)?;
        view_of::<I>(&instance, &service)
    }

    pub fn resolve_keyed_trait<I: ?Sized + Interface + Send + Sync>(
        &self,
        key: &str,
    ) -> DIResult<Arc<I>> {
        let service = Service::keyed_interface::<I>(key);
        let instance = self.resolve_service(&service)?;
        view_of::<I>(&instance, &service)
    }

    /// Resolve `T` if it is registered
    pub fn resolve_optional<T: Send + Sync + 'static>(&self) -> DIResult<Option<Arc<T>>> {
        if self.is_registered(&Service::typed::<T>()) {
            self.resolve::<T>().map(Some)
        } else {
            Ok(None)
        }
    }

    pub(crate) fn resolve_request(
        &self,
        service: &Service,
        parameters: Vec<Parameter>,
        operation: &ResolveOperation,
    ) -> DIResult<Instance> {
        let registration = self
            .registry
            .registration_for(service)
            .cloned()
            .ok_or_else(|| DIError::ServiceNotRegistered {
                service_type: service.to_string(),
            })?;

        let _guard = operation.enter(&registration)?;
        debug!(
            "Resolving {} (depth {}) from {}",
            service,
            operation.depth(),
            registration
        );

        let context = ComponentContext::new(self, operation);
        let mut request = ResolveRequestContext::new(context, registration.clone(), service.clone(), parameters);
        registration.pipeline().execute(&mut request)?;

        request
            .take_instance()
            .ok_or_else(|| DIError::DependencyResolutionFailed {
                message: format!("Resolve pipeline produced no instance for {}", service),
            })
    }
}

pub(crate) fn concrete_of<T: Send + Sync + 'static>(instance: &Instance) -> DIResult<Arc<T>> {
    instance
        .concrete::<T>()
        .ok_or_else(|| DIError::InvalidServiceType {
            message: format!(
                "Instance of {} is not a {}",
                instance.descriptor(),
                std::any::type_name::<T>()
            ),
        })
}

pub(crate) fn view_of<I: ?Sized + Send + Sync + 'static>(
    instance: &Instance,
    service: &Service,
) -> DIResult<Arc<I>> {
    instance
        .view_any(service.service_type().id())
        .and_then(downcast_view::<I>)
        .ok_or_else(|| DIError::InvalidServiceType {
            message: format!(
                "Instance of {} does not implement {}",
                instance.descriptor(),
                service.service_type()
            ),
        })
}
