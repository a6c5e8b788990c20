//! Component registrations
//!
//! A registration is configured through a [`RegistrationBuilder`] while the
//! container is being built, then frozen into a [`ComponentRegistration`]
//! that is shared by every resolve request for its services.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut builder = ContainerBuilder::new();
//! builder
//!     .register(|_| Ok(FileStorage::new("./data")))
//!     .implements::<dyn Storage>(|s| s)
//!     .as_service::<dyn Storage>()
//!     .single_instance();
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::component::{ComponentType, InterfaceBinding};
use crate::context::ComponentContext;
use crate::extensions::Extensions;
use crate::parameters::Parameter;
use crate::pipeline::{MiddlewareInsertionMode, PipelinePhase, ResolveMiddleware, ResolvePipeline};
use crate::service::Service;
use crate::types::{Interface, TypeDescriptor, Visibility};
use crate::{DIResult, ServiceLifetime};

/// Identifies a registration within a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(pub(crate) usize);

/// Handler invoked right before a component's constructor runs
pub type PreparingHandler = Arc<dyn Fn(&mut PreparingArgs<'_>) -> DIResult<()> + Send + Sync>;

/// State visible to preparing handlers
pub struct PreparingArgs<'a> {
    context: ComponentContext<'a>,
    registration: &'a ComponentRegistration,
    parameters: Vec<Parameter>,
}

impl<'a> PreparingArgs<'a> {
    pub(crate) fn new(
        context: ComponentContext<'a>,
        registration: &'a ComponentRegistration,
        parameters: Vec<Parameter>,
    ) -> Self {
        Self {
            context,
            registration,
            parameters,
        }
    }

    pub fn context(&self) -> ComponentContext<'a> {
        self.context
    }

    pub fn registration(&self) -> &'a ComponentRegistration {
        self.registration
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn set_parameters(&mut self, parameters: Vec<Parameter>) {
        self.parameters = parameters;
    }

    /// Put `parameters` ahead of the ones already supplied
    pub fn prepend_parameters(&mut self, parameters: Vec<Parameter>) {
        let existing = std::mem::take(&mut self.parameters);
        self.parameters = parameters.into_iter().chain(existing).collect();
    }

    pub(crate) fn into_parameters(self) -> Vec<Parameter> {
        self.parameters
    }
}

pub(crate) struct MiddlewareEntry {
    pub(crate) phase: PipelinePhase,
    pub(crate) mode: MiddlewareInsertionMode,
    pub(crate) middleware: Arc<dyn ResolveMiddleware>,
}

/// Mutable registration state held by the container builder
pub struct RegistrationData {
    component: ComponentType,
    services: Vec<Service>,
    default_service: Service,
    lifetime: ServiceLifetime,
    extensions: Extensions,
    preparing: Vec<PreparingHandler>,
    middleware: Vec<MiddlewareEntry>,
}

impl RegistrationData {
    pub(crate) fn new(component: ComponentType) -> Self {
        let default_service = Service::Typed(component.descriptor().clone());
        Self {
            component,
            services: Vec::new(),
            default_service,
            lifetime: ServiceLifetime::Transient,
            extensions: Extensions::new(),
            preparing: Vec::new(),
            middleware: Vec::new(),
        }
    }

    pub(crate) fn build(self, id: RegistrationId) -> ComponentRegistration {
        let services = if self.services.is_empty() {
            vec![self.default_service]
        } else {
            self.services
        };

        ComponentRegistration {
            id,
            component: self.component,
            services,
            lifetime: self.lifetime,
            extensions: self.extensions,
            preparing: self.preparing,
            pipeline: ResolvePipeline::build(self.middleware),
        }
    }
}

/// Fluent configuration of one registration
pub struct RegistrationBuilder<'b, T> {
    data: &'b mut RegistrationData,
    _marker: PhantomData<fn() -> T>,
}

impl<'b, T: Send + Sync + 'static> RegistrationBuilder<'b, T> {
    pub(crate) fn new(data: &'b mut RegistrationData) -> Self {
        Self {
            data,
            _marker: PhantomData,
        }
    }

    fn add_service(&mut self, service: Service) {
        if !self.data.services.contains(&service) {
            self.data.services.push(service);
        }
    }

    /// Expose the implementation type itself as a service
    pub fn as_self(mut self) -> Self {
        let service = self.data.default_service.clone();
        self.add_service(service);
        self
    }

    /// Expose the component as interface `I`
    pub fn as_service<I: ?Sized + Interface>(mut self) -> Self {
        self.add_service(Service::interface::<I>());
        self
    }

    /// Expose the component as interface `I` under `key`
    pub fn named<I: ?Sized + Interface>(mut self, key: impl Into<String>) -> Self {
        self.add_service(Service::keyed_interface::<I>(key));
        self
    }

    /// Expose the implementation type itself under `key`
    pub fn named_self(mut self, key: impl Into<String>) -> Self {
        let service = Service::Keyed {
            key: key.into(),
            service_type: self.data.default_service.service_type().clone(),
        };
        self.add_service(service);
        self
    }

    /// Declare that the implementation type implements `I`.
    ///
    /// `cast` performs the unsized coercion, usually `|c| c`.
    pub fn implements<I, F>(self, cast: F) -> Self
    where
        I: ?Sized + Interface + Send + Sync,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        self.data
            .component
            .add_interface(InterfaceBinding::new::<T, I, F>(cast));
        self
    }

    pub fn single_instance(self) -> Self {
        self.data.lifetime = ServiceLifetime::Singleton;
        self
    }

    pub fn instance_per_lifetime_scope(self) -> Self {
        self.data.lifetime = ServiceLifetime::Scoped;
        self
    }

    pub fn instance_per_dependency(self) -> Self {
        self.data.lifetime = ServiceLifetime::Transient;
        self
    }

    /// Override the visibility recorded for the implementation type
    pub fn implementation_visibility(self, visibility: Visibility) -> Self {
        self.data.component.set_visibility(visibility);
        let descriptor = self
            .data
            .default_service
            .service_type()
            .clone()
            .with_visibility(visibility);
        let previous = std::mem::replace(&mut self.data.default_service, Service::Typed(descriptor));
        for service in self.data.services.iter_mut() {
            if *service == previous {
                *service = self.data.default_service.clone();
            }
        }
        self
    }

    /// Run `handler` before the constructor is invoked; handlers run in the order added
    pub fn on_preparing<F>(self, handler: F) -> Self
    where
        F: Fn(&mut PreparingArgs<'_>) -> DIResult<()> + Send + Sync + 'static,
    {
        self.data.preparing.push(Arc::new(handler));
        self
    }

    /// Insert middleware into this registration's resolve pipeline
    pub fn configure_pipeline(
        self,
        phase: PipelinePhase,
        mode: MiddlewareInsertionMode,
        middleware: Arc<dyn ResolveMiddleware>,
    ) -> Self {
        self.data.middleware.push(MiddlewareEntry {
            phase,
            mode,
            middleware,
        });
        self
    }

    pub fn extensions(&self) -> &Extensions {
        &self.data.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.data.extensions
    }

    pub fn component_type(&self) -> &ComponentType {
        &self.data.component
    }

    /// Replace the component type; services and lifetime are unaffected
    pub fn set_component_type(&mut self, component: ComponentType) {
        self.data.component = component;
    }

    pub fn services(&self) -> &[Service] {
        &self.data.services
    }

    pub fn lifetime(&self) -> ServiceLifetime {
        self.data.lifetime
    }
}

/// A frozen registration shared by all resolve requests
pub struct ComponentRegistration {
    id: RegistrationId,
    component: ComponentType,
    services: Vec<Service>,
    lifetime: ServiceLifetime,
    extensions: Extensions,
    preparing: Vec<PreparingHandler>,
    pipeline: ResolvePipeline,
}

impl ComponentRegistration {
    pub fn id(&self) -> RegistrationId {
        self.id
    }

    pub fn component_type(&self) -> &ComponentType {
        &self.component
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn lifetime(&self) -> ServiceLifetime {
        self.lifetime
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub(crate) fn preparing_handlers(&self) -> &[PreparingHandler] {
        &self.preparing
    }

    pub(crate) fn pipeline(&self) -> &ResolvePipeline {
        &self.pipeline
    }

    pub fn exposes(&self, service: &Service) -> bool {
        self.services.contains(service)
    }

    pub fn implementation_type(&self) -> &TypeDescriptor {
        self.component.descriptor()
    }
}

impl fmt::Display for ComponentRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let services: Vec<String> = self.services.iter().map(|s| s.to_string()).collect();
        write!(
            f,
            "Activator = {} ({:?}), Services = [{}], Lifetime = {:?}",
            self.component.descriptor(),
            self.component.activator_kind(),
            services.join(", "),
            self.lifetime
        )
    }
}

impl fmt::Debug for ComponentRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistration")
            .field("id", &self.id)
            .field("component", &self.component)
            .field("services", &self.services)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}
