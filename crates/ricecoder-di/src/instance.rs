//! Activated component instances
//!
//! An [`Instance`] is what a resolve request produces before it is handed to
//! the caller: the concrete object plus one view per interface the component
//! is known to implement. Middleware may swap views (decorators) or replace
//! the whole instance (proxies).

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::types::{downcast_view, AnyArc, TypeDescriptor};

/// One interface view of an instance (`Arc<dyn Trait>`, erased)
#[derive(Clone)]
pub struct InstanceView {
    descriptor: TypeDescriptor,
    value: AnyArc,
}

impl InstanceView {
    pub fn new(descriptor: TypeDescriptor, value: AnyArc) -> Self {
        Self { descriptor, value }
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn value(&self) -> &AnyArc {
        &self.value
    }
}

/// A type-erased component instance
#[derive(Clone)]
pub struct Instance {
    descriptor: TypeDescriptor,
    concrete: Option<AnyArc>,
    views: Vec<InstanceView>,
}

impl Instance {
    /// Instance whose concrete object is `concrete`, with no interface views yet
    pub fn new(descriptor: TypeDescriptor, concrete: AnyArc) -> Self {
        Self {
            descriptor,
            concrete: Some(concrete),
            views: Vec::new(),
        }
    }

    pub fn of<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self::new(TypeDescriptor::of::<T>(), value)
    }

    /// Instance that only exposes interface views (e.g. an interface proxy)
    pub fn views_only(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor,
            concrete: None,
            views: Vec::new(),
        }
    }

    /// Runtime type of the object behind this instance
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn concrete_any(&self) -> Option<&AnyArc> {
        self.concrete.as_ref()
    }

    pub fn concrete<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.concrete.as_ref()?.clone().downcast::<T>().ok()
    }

    pub fn views(&self) -> &[InstanceView] {
        &self.views
    }

    /// Interfaces this instance exposes, in declaration order
    pub fn interfaces(&self) -> Vec<TypeDescriptor> {
        self.views.iter().map(|v| v.descriptor.clone()).collect()
    }

    pub fn view_any(&self, interface: TypeId) -> Option<&AnyArc> {
        self.views
            .iter()
            .find(|v| v.descriptor.id() == interface)
            .map(|v| &v.value)
    }

    pub fn view<I: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<I>> {
        downcast_view::<I>(self.view_any(TypeId::of::<I>())?)
    }

    /// Add an interface view, replacing any existing view of the same interface in place
    pub fn add_view(&mut self, descriptor: TypeDescriptor, value: AnyArc) {
        match self.views.iter_mut().find(|v| v.descriptor == descriptor) {
            Some(existing) => existing.value = value,
            None => self.views.push(InstanceView::new(descriptor, value)),
        }
    }

    /// Replace the view of `interface`; returns false when the instance has no such view
    pub fn replace_view(&mut self, interface: TypeId, value: AnyArc) -> bool {
        match self.views.iter_mut().find(|v| v.descriptor.id() == interface) {
            Some(existing) => {
                existing.value = value;
                true
            }
            None => false,
        }
    }

    /// Whether both instances wrap the same concrete object
    pub fn is_same(&self, other: &Instance) -> bool {
        match (&self.concrete, &other.concrete) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.descriptor.name())
            .field("concrete", &self.concrete.is_some())
            .field(
                "views",
                &self.views.iter().map(|v| v.descriptor.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
