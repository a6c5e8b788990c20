//! Resolve contexts
//!
//! A [`ComponentContext`] is handed to constructors and preparing handlers so
//! they can resolve their own dependencies within the same resolve
//! operation. A [`ResolveRequestContext`] is the state a single request
//! carries through the resolve pipeline.

use std::cell::RefCell;
use std::sync::Arc;

use crate::instance::Instance;
use crate::parameters::Parameter;
use crate::registration::{ComponentRegistration, RegistrationId};
use crate::scope::LifetimeScope;
use crate::service::Service;
use crate::types::Interface;
use crate::{DIError, DIResult};

/// Tracks the registrations currently being activated by one top-level resolve
#[derive(Default)]
pub(crate) struct ResolveOperation {
    stack: RefCell<Vec<(RegistrationId, String)>>,
}

impl ResolveOperation {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Push `registration` onto the activation stack, failing if it is already on it
    pub(crate) fn enter(&self, registration: &ComponentRegistration) -> DIResult<OperationGuard<'_>> {
        let mut stack = self.stack.borrow_mut();
        let name = registration.implementation_type().name().to_string();

        if stack.iter().any(|(id, _)| *id == registration.id()) {
            let path: Vec<&str> = stack
                .iter()
                .map(|(_, n)| n.as_str())
                .chain(std::iter::once(name.as_str()))
                .collect();
            return Err(DIError::CircularDependency {
                path: path.join(" -> "),
            });
        }

        stack.push((registration.id(), name));
        Ok(OperationGuard { operation: self })
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.borrow().len()
    }
}

pub(crate) struct OperationGuard<'o> {
    operation: &'o ResolveOperation,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.operation.stack.borrow_mut().pop();
    }
}

/// Access to the container from inside an activation
#[derive(Clone, Copy)]
pub struct ComponentContext<'a> {
    scope: &'a LifetimeScope,
    operation: &'a ResolveOperation,
}

impl<'a> ComponentContext<'a> {
    pub(crate) fn new(scope: &'a LifetimeScope, operation: &'a ResolveOperation) -> Self {
        Self { scope, operation }
    }

    /// The lifetime scope the current request is resolved in
    pub fn scope(&self) -> &'a LifetimeScope {
        self.scope
    }

    pub fn is_registered(&self, service: &Service) -> bool {
        self.scope.is_registered(service)
    }

    pub fn resolve_service(&self, service: &Service) -> DIResult<Instance> {
        self.scope
            .resolve_request(service, Vec::new(), self.operation)
    }

    pub fn resolve_service_with_parameters(
        &self,
        service: &Service,
        parameters: Vec<Parameter>,
    ) -> DIResult<Instance> {
        self.scope.resolve_request(service, parameters, self.operation)
    }

    pub fn resolve<T: Send + Sync + 'static>(&self) -> DIResult<Arc<T>> {
        let instance = self.resolve_service(&Service::typed::<T>())?;
        crate::scope::concrete_of::<T>(&instance)
    }

    pub fn resolve_trait<I: ?Sized + Interface + Send + Sync>(&self) -> DIResult<Arc<I>> {
        let service = Service::interface::<I>();
        let instance = self.resolve_service(&service)?;
        crate::scope::view_of::<I>(&instance, &service)
    }

    pub fn resolve_keyed_trait<I: ?Sized + Interface + Send + Sync>(
        &self,
        key: &str,
    ) -> DIResult<Arc<I>> {
        let service = Service::keyed_interface::<I>(key);
        let instance = self.resolve_service(&service)?;
        crate::scope::view_of::<I>(&instance, &service)
    }
}

/// State of one resolve request as it flows through the pipeline
pub struct ResolveRequestContext<'a> {
    context: ComponentContext<'a>,
    registration: Arc<ComponentRegistration>,
    service: Service,
    parameters: Vec<Parameter>,
    instance: Option<Instance>,
}

impl<'a> ResolveRequestContext<'a> {
    pub(crate) fn new(
        context: ComponentContext<'a>,
        registration: Arc<ComponentRegistration>,
        service: Service,
        parameters: Vec<Parameter>,
    ) -> Self {
        Self {
            context,
            registration,
            service,
            parameters,
            instance: None,
        }
    }

    pub fn context(&self) -> ComponentContext<'a> {
        self.context
    }

    pub fn registration(&self) -> &Arc<ComponentRegistration> {
        &self.registration
    }

    /// The service the caller asked for
    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub(crate) fn take_parameters(&mut self) -> Vec<Parameter> {
        std::mem::take(&mut self.parameters)
    }

    /// The instance produced so far, if activation has already run
    pub fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    pub fn set_instance(&mut self, instance: Instance) {
        self.instance = Some(instance);
    }

    pub(crate) fn take_instance(&mut self) -> Option<Instance> {
        self.instance.take()
    }
}
