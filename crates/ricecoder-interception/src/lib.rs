//! Interception for the RiceCoder DI container
//!
//! Components registered with `ricecoder-di` can be wrapped in proxies that
//! route every call on their interfaces through a chain of [`Interceptor`]s.
//! Interceptors are themselves components: a registration names the
//! interceptor services it wants, either explicitly with
//! [`intercepted_by`](InterceptionRegistrationExt::intercepted_by) and friends
//! or declaratively with [`intercept!`], and they are resolved from the same
//! scope every time the component is activated.
//!
//! Two strategies are available:
//!
//! - **Interface interception** wraps the fully activated instance in an
//!   interface proxy. Only registrations exposing accessible interfaces
//!   qualify.
//! - **Class interception** swaps the registration's component type for a
//!   generated class proxy type whose constructor receives the interceptors
//!   ahead of the component's own arguments.
//!
//! ## Quick Start
//!
//! ```rust
//! use ricecoder_di::ContainerBuilder;
//! use ricecoder_interception::{
//!     proxy_interface, InterceptionRegistrationExt, InterceptionResult, Interceptor, Invocation,
//! };
//!
//! proxy_interface! {
//!     pub trait Greeter {
//!         fn greet(&self, name: String) -> String;
//!     }
//! }
//!
//! struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self, name: String) -> String {
//!         format!("hello {}", name)
//!     }
//! }
//!
//! struct Shout;
//!
//! impl Interceptor for Shout {
//!     fn intercept(&self, invocation: &mut Invocation<'_>) -> InterceptionResult<()> {
//!         invocation.proceed()?;
//!         if let Some(result) = invocation.return_value_mut::<String>() {
//!             *result = result.to_uppercase();
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = ContainerBuilder::new();
//! builder.register(|_| Ok(Shout)).as_self().as_interceptor();
//! builder
//!     .register(|_| Ok(English))
//!     .implements::<dyn Greeter, _>(|e| e)
//!     .as_service::<dyn Greeter>()
//!     .enable_interface_interceptors()
//!     .intercepted_by::<Shout>()?;
//!
//! let container = builder.build();
//! let greeter = container.resolve_trait::<dyn Greeter>()?;
//! assert_eq!(greeter.greet("world".to_string()), "HELLO WORLD");
//! # Ok(())
//! # }
//! ```

pub mod attributes;
mod class_interception;
pub mod error;
pub mod interface_interception;
pub mod proxy;
pub mod registration;
pub mod registry;
pub mod resolver;
pub mod service;

pub use attributes::{scan_for_interceptors, InterceptAttribute};
pub use error::{InterceptionError, InterceptionResult};
pub use interface_interception::{apply_proxy, InterfaceInterceptionMiddleware};
pub use proxy::{
    generator, Interceptor, InterceptorSelector, Invocation, Mixin, ProxyGenerationHook,
    ProxyGenerationOptions, ProxyGenerator,
};
pub use registration::InterceptionRegistrationExt;
pub use registry::{
    add_interceptor_services, interceptor_services, InterceptorKey, InterceptorServices, ServiceSet,
};
pub use resolver::{interceptor_services_for, resolve_interceptors};
pub use service::InterceptorService;

/// Items the exported macros expand to
#[doc(hidden)]
pub mod __private {
    pub use inventory;
    pub use ricecoder_di::{erase_view, Interface, TypeDescriptor, Visibility};
}
