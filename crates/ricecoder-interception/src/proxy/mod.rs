//! Runtime proxy generation
//!
//! Rust has no runtime code emission, so proxies are assembled from pieces
//! generated at compile time: [`proxy_interface!`](crate::proxy_interface)
//! writes one forwarding implementation per trait, and the
//! [`ProxyGenerator`] combines those with interceptor chains at runtime.

mod generator;
mod interface_proxy;
mod invocation;
mod options;

pub use generator::{generator, ClassProxy, ClassProxyActivator, ClassProxyType, ProxyGenerator};
pub use interface_proxy::{shape_for, InterceptorChain, InterfaceProxy, ProxyShape};
pub use invocation::{ArgumentCursor, Arguments, Interceptor, Invocation, ReturnValue, TargetCall};
pub use options::{InterceptorSelector, Mixin, ProxyGenerationHook, ProxyGenerationOptions};
