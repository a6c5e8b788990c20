//! Dependency Injection Container for RiceCoder
//!
//! This crate provides the component container used across RiceCoder:
//! components are registered against the services they expose, then
//! resolved with singleton, per-scope or per-dependency lifetimes.
//! Registrations carry a middleware pipeline and typed extension data so
//! that other crates (such as `ricecoder-interception`) can hook into
//! activation without the container knowing about them.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use ricecoder_di::{ContainerBuilder, Interface, TypeDescriptor, Visibility};
//!
//! pub trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! impl Interface for dyn Greeter {
//!     fn descriptor() -> TypeDescriptor {
//!         TypeDescriptor::interface::<dyn Greeter>(Visibility::Public)
//!     }
//! }
//!
//! struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         "hello".to_string()
//!     }
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder
//!     .register(|_| Ok(English))
//!     .implements::<dyn Greeter, _>(|e| e)
//!     .as_service::<dyn Greeter>();
//!
//! let container = builder.build();
//! let greeter = container.resolve_trait::<dyn Greeter>().unwrap();
//! assert_eq!(greeter.greet(), "hello");
//! ```

pub mod component;
pub mod container;
pub mod context;
pub mod extensions;
pub mod instance;
pub mod parameters;
pub mod pipeline;
pub mod registration;
pub mod scope;
pub mod service;
pub mod types;

/// Errors that can occur during dependency injection operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum DIError {
    #[error("Service not registered: {service_type}")]
    ServiceNotRegistered { service_type: String },

    #[error("Invalid service type: {message}")]
    InvalidServiceType { message: String },

    #[error("Dependency resolution failed: {message}")]
    DependencyResolutionFailed { message: String },

    #[error("Circular dependency detected: {path}")]
    CircularDependency { path: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },
}

pub type DIResult<T> = Result<T, DIError>;

/// Service lifetime management
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceLifetime {
    /// Service is created once and reused for the entire application lifetime
    Singleton,
    /// Service is created each time it's requested
    Transient,
    /// Service is created once per lifetime scope
    Scoped,
}

pub use component::{Activator, ActivatorKind, ComponentType, InterfaceBinding};
pub use container::{Container, ContainerBuilder};
pub use context::{ComponentContext, ResolveRequestContext};
pub use extensions::Extensions;
pub use instance::{Instance, InstanceView};
pub use parameters::{ConstructorArgs, Parameter};
pub use pipeline::{MiddlewareInsertionMode, Next, PipelinePhase, ResolveMiddleware};
pub use registration::{
    ComponentRegistration, PreparingArgs, PreparingHandler, RegistrationBuilder, RegistrationId,
};
pub use scope::LifetimeScope;
pub use service::Service;
pub use types::{downcast_view, erase_view, AnyArc, Interface, TypeDescriptor, TypeKind, Visibility};
