//! Container construction

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::component::ComponentType;
use crate::instance::Instance;
use crate::parameters::{ConstructorArgs, Parameter};
use crate::registration::{RegistrationBuilder, RegistrationData, RegistrationId};
use crate::scope::{ComponentRegistry, Decorator, LifetimeScope};
use crate::service::Service;
use crate::types::{downcast_view, erase_view, AnyArc, Interface};
use crate::{DIResult, ServiceLifetime};

/// Collects registrations and builds a [`Container`]
#[derive(Default)]
pub struct ContainerBuilder {
    registrations: Vec<RegistrationData>,
    decorators: HashMap<TypeId, Vec<Decorator>>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, data: RegistrationData) -> &mut RegistrationData {
        self.registrations.push(data);
        let index = self.registrations.len() - 1;
        &mut self.registrations[index]
    }

    /// Register a component built by `constructor` on every activation
    pub fn register<T, F>(&mut self, constructor: F) -> RegistrationBuilder<'_, T>
    where
        T: Send + Sync + 'static,
        F: Fn(&ConstructorArgs<'_>) -> DIResult<T> + Send + Sync + 'static,
    {
        debug!("Registering {}", std::any::type_name::<T>());
        let data = self.push(RegistrationData::new(ComponentType::constructed::<T, F>(constructor)));
        RegistrationBuilder::new(data)
    }

    /// Register an existing instance; it is shared by every resolve
    pub fn register_instance<T: Send + Sync + 'static>(&mut self, value: Arc<T>) -> RegistrationBuilder<'_, T> {
        debug!("Registering instance of {}", std::any::type_name::<T>());
        let data = self.push(RegistrationData::new(ComponentType::provided(value)));
        RegistrationBuilder::new(data).single_instance()
    }

    /// Wrap every resolved view of interface `I` with `decorator`, in registration order
    pub fn register_decorator<I, F>(&mut self, decorator: F) -> &mut Self
    where
        I: ?Sized + Interface + Send + Sync,
        F: Fn(Arc<I>) -> Arc<I> + Send + Sync + 'static,
    {
        let erased: Decorator = Arc::new(move |view: &AnyArc| {
            downcast_view::<I>(view).map(|inner| erase_view::<I>(decorator(inner)))
        });
        self.decorators.entry(TypeId::of::<I>()).or_default().push(erased);
        self
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    pub fn build(self) -> Container {
        let registrations: Vec<_> = self
            .registrations
            .into_iter()
            .enumerate()
            .map(|(index, data)| data.build(RegistrationId(index)))
            .collect();

        info!(
            "Built container with {} registration(s) and {} decorated interface(s)",
            registrations.len(),
            self.decorators.len()
        );

        let registry = Arc::new(ComponentRegistry::new(registrations, self.decorators));
        Container {
            root: LifetimeScope::root(registry),
        }
    }
}

/// A built container; resolves from its root lifetime scope
pub struct Container {
    root: LifetimeScope,
}

impl Container {
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub fn root_scope(&self) -> &LifetimeScope {
        &self.root
    }

    pub fn begin_lifetime_scope(&self) -> LifetimeScope {
        self.root.begin_lifetime_scope()
    }

    pub fn is_registered(&self, service: &Service) -> bool {
        self.root.is_registered(service)
    }

    pub fn resolve<T: Send + Sync + 'static>(&self) -> DIResult<Arc<T>> {
        self.root.resolve::<T>()
    }

    pub fn resolve_with_parameters<T: Send + Sync + 'static>(
        &self,
        parameters: Vec<Parameter>,
    ) -> DIResult<Arc<T>> {
        self.root.resolve_with_parameters::<T>(parameters)
    }

    pub fn resolve_trait<I: ?Sized + Interface + Send + Sync>(&self) -> DIResult<Arc<I>> {
        self.root.resolve_trait::<I>()
    }

    pub fn resolve_keyed_trait<I: ?Sized + Interface + Send + Sync>(&self, key: &str) -> DIResult<Arc<I>> {
        self.root.resolve_keyed_trait::<I>(key)
    }

    pub fn resolve_service(&self, service: &Service) -> DIResult<Instance> {
        self.root.resolve_service(service)
    }

    pub fn resolve_optional<T: Send + Sync + 'static>(&self) -> DIResult<Option<Arc<T>>> {
        self.root.resolve_optional::<T>()
    }

    /// Number of singleton instances created so far
    pub fn singleton_count(&self) -> usize {
        self.root
            .registrations()
            .filter(|r| r.lifetime() == ServiceLifetime::Singleton)
            .filter(|r| self.root.root_instances().read().contains_key(&r.id()))
            .count()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("registrations", &self.root.registrations().count())
            .finish()
    }
}
