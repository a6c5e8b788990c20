//! Component types and activators
//!
//! A [`ComponentType`] describes what a registration builds: the
//! implementation type, the interfaces it implements (in declaration order)
//! and the [`Activator`] that produces instances of it. Extensions may swap a
//! registration's component type before the container is built.

use std::fmt;
use std::sync::Arc;

use crate::instance::Instance;
use crate::parameters::ConstructorArgs;
use crate::types::{erase_view, AnyArc, Interface, TypeDescriptor, Visibility};
use crate::DIResult;

type ViewCast = Arc<dyn Fn(&AnyArc) -> Option<AnyArc> + Send + Sync>;

/// Declares that an implementation type implements an interface, together
/// with the coercion from the concrete object to the interface view.
#[derive(Clone)]
pub struct InterfaceBinding {
    descriptor: TypeDescriptor,
    cast: ViewCast,
}

impl InterfaceBinding {
    pub fn new<T, I, F>(cast: F) -> Self
    where
        T: Send + Sync + 'static,
        I: ?Sized + Interface + Send + Sync,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        Self {
            descriptor: I::descriptor(),
            cast: Arc::new(move |concrete: &AnyArc| {
                let typed = concrete.clone().downcast::<T>().ok()?;
                Some(erase_view::<I>(cast(typed)))
            }),
        }
    }

    /// An interface the type exposes without implementing it (no view can be produced)
    pub fn unimplemented(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor,
            cast: Arc::new(|_: &AnyArc| None),
        }
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// The interface view of `concrete`, if the binding can produce one
    pub fn view_of(&self, concrete: &AnyArc) -> Option<AnyArc> {
        (self.cast)(concrete)
    }
}

impl fmt::Debug for InterfaceBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InterfaceBinding").field(&self.descriptor.name()).finish()
    }
}

/// How a component's instances come into existence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivatorKind {
    /// Built by a constructor function on every activation
    Constructor,
    /// A pre-built instance handed to the container
    ProvidedInstance,
    /// A generated proxy type wrapping another component type
    ClassProxy,
}

/// Produces instances of a component type
pub trait Activator: Send + Sync {
    fn kind(&self) -> ActivatorKind;

    fn activate(&self, component: &ComponentType, args: ConstructorArgs<'_>) -> DIResult<Instance>;
}

/// The implementation side of a registration
#[derive(Clone)]
pub struct ComponentType {
    descriptor: TypeDescriptor,
    interfaces: Vec<InterfaceBinding>,
    activator: Arc<dyn Activator>,
}

impl ComponentType {
    pub fn new(descriptor: TypeDescriptor, activator: Arc<dyn Activator>) -> Self {
        Self {
            descriptor,
            interfaces: Vec::new(),
            activator,
        }
    }

    /// Component type built by `constructor`
    pub fn constructed<T, F>(constructor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ConstructorArgs<'_>) -> DIResult<T> + Send + Sync + 'static,
    {
        Self::new(
            TypeDescriptor::of::<T>(),
            Arc::new(ConstructorActivator {
                constructor: Box::new(constructor),
            }),
        )
    }

    /// Component type that always yields `value`
    pub fn provided<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self::new(
            TypeDescriptor::of::<T>(),
            Arc::new(InstanceActivator { value }),
        )
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn interfaces(&self) -> &[InterfaceBinding] {
        &self.interfaces
    }

    pub fn interface_descriptors(&self) -> Vec<TypeDescriptor> {
        self.interfaces.iter().map(|b| b.descriptor.clone()).collect()
    }

    pub fn activator(&self) -> &Arc<dyn Activator> {
        &self.activator
    }

    pub fn activator_kind(&self) -> ActivatorKind {
        self.activator.kind()
    }

    /// Add an interface binding; a second binding for the same interface replaces the first
    pub fn add_interface(&mut self, binding: InterfaceBinding) {
        match self
            .interfaces
            .iter_mut()
            .find(|b| b.descriptor == binding.descriptor)
        {
            Some(existing) => *existing = binding,
            None => self.interfaces.push(binding),
        }
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.descriptor = self.descriptor.clone().with_visibility(visibility);
    }

    pub fn activate(&self, args: ConstructorArgs<'_>) -> DIResult<Instance> {
        self.activator.activate(self, args)
    }

    /// Wrap a freshly built object, attaching every interface view this type declares
    pub fn instance_with_views(&self, concrete: AnyArc) -> Instance {
        let mut instance = Instance::new(self.descriptor.clone(), concrete.clone());
        for binding in &self.interfaces {
            if let Some(view) = binding.view_of(&concrete) {
                instance.add_view(binding.descriptor.clone(), view);
            }
        }
        instance
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentType")
            .field("type", &self.descriptor.name())
            .field("interfaces", &self.interfaces)
            .field("activator", &self.activator.kind())
            .finish()
    }
}

type Constructor<T> = Box<dyn Fn(&ConstructorArgs<'_>) -> DIResult<T> + Send + Sync>;

struct ConstructorActivator<T> {
    constructor: Constructor<T>,
}

impl<T: Send + Sync + 'static> Activator for ConstructorActivator<T> {
    fn kind(&self) -> ActivatorKind {
        ActivatorKind::Constructor
    }

    fn activate(&self, component: &ComponentType, args: ConstructorArgs<'_>) -> DIResult<Instance> {
        let value = (self.constructor)(&args)?;
        Ok(component.instance_with_views(Arc::new(value)))
    }
}

struct InstanceActivator<T> {
    value: Arc<T>,
}

impl<T: Send + Sync + 'static> Activator for InstanceActivator<T> {
    fn kind(&self) -> ActivatorKind {
        ActivatorKind::ProvidedInstance
    }

    fn activate(&self, component: &ComponentType, _args: ConstructorArgs<'_>) -> DIResult<Instance> {
        Ok(component.instance_with_views(self.value.clone()))
    }
}
