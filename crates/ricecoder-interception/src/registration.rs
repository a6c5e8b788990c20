//! Fluent registration methods for interception

use std::sync::Arc;

use ricecoder_di::{MiddlewareInsertionMode, PipelinePhase, RegistrationBuilder, TypeDescriptor};

use crate::class_interception;
use crate::error::InterceptionResult;
use crate::interface_interception::InterfaceInterceptionMiddleware;
use crate::proxy::{Interceptor, ProxyGenerationOptions};
use crate::registry::{add_interceptor_services, InterceptorKey};
use crate::service::InterceptorService;

/// Interception configuration on a [`RegistrationBuilder`]
pub trait InterceptionRegistrationExt: Sized {
    /// The registered implementation type
    type Component;

    /// Proxy every interface the activated instance exposes
    fn enable_interface_interceptors(self) -> Self;

    fn enable_interface_interceptors_with(self, options: ProxyGenerationOptions) -> Self;

    /// Activate a generated class proxy in place of the implementation type
    fn enable_class_interceptors(self) -> InterceptionResult<Self>;

    /// Like [`enable_class_interceptors`](Self::enable_class_interceptors), with
    /// options and interfaces the proxy implements in addition to the base type's
    fn enable_class_interceptors_with(
        self,
        options: ProxyGenerationOptions,
        additional_interfaces: Vec<TypeDescriptor>,
    ) -> InterceptionResult<Self>;

    /// Intercept with the interceptor registered as its own type `S`
    fn intercepted_by<S: 'static>(self) -> InterceptionResult<Self>;

    /// Intercept with interceptors registered as named `dyn Interceptor` services
    fn intercepted_by_named<N: AsRef<str>>(self, names: &[N]) -> InterceptionResult<Self>;

    fn intercepted_by_services<I>(self, services: I) -> InterceptionResult<Self>
    where
        I: IntoIterator<Item = InterceptorService>;

    /// Expose the component as `dyn Interceptor`
    fn as_interceptor(self) -> Self
    where
        Self::Component: Interceptor;
}

impl<'b, T: Send + Sync + 'static> InterceptionRegistrationExt for RegistrationBuilder<'b, T> {
    type Component = T;

    fn enable_interface_interceptors(self) -> Self {
        install_interface_middleware(self, None)
    }

    fn enable_interface_interceptors_with(self, options: ProxyGenerationOptions) -> Self {
        install_interface_middleware(self, Some(options))
    }

    fn enable_class_interceptors(self) -> InterceptionResult<Self> {
        class_interception::enable_class_interceptors(self, ProxyGenerationOptions::default(), Vec::new())
    }

    fn enable_class_interceptors_with(
        self,
        options: ProxyGenerationOptions,
        additional_interfaces: Vec<TypeDescriptor>,
    ) -> InterceptionResult<Self> {
        class_interception::enable_class_interceptors(self, options, additional_interfaces)
    }

    fn intercepted_by<S: 'static>(self) -> InterceptionResult<Self> {
        self.intercepted_by_services([InterceptorService::typed::<S>()])
    }

    fn intercepted_by_named<N: AsRef<str>>(self, names: &[N]) -> InterceptionResult<Self> {
        self.intercepted_by_services(names.iter().map(|name| InterceptorService::named(name.as_ref())))
    }

    fn intercepted_by_services<I>(mut self, services: I) -> InterceptionResult<Self>
    where
        I: IntoIterator<Item = InterceptorService>,
    {
        add_interceptor_services(self.extensions_mut(), InterceptorKey::Explicit, services)?;
        Ok(self)
    }

    fn as_interceptor(self) -> Self
    where
        T: Interceptor,
    {
        self.implements::<dyn Interceptor, _>(|component| component)
    }
}

fn install_interface_middleware<'b, T: Send + Sync + 'static>(
    builder: RegistrationBuilder<'b, T>,
    options: Option<ProxyGenerationOptions>,
) -> RegistrationBuilder<'b, T> {
    builder.configure_pipeline(
        PipelinePhase::RegistrationPipelineStart,
        MiddlewareInsertionMode::StartOfPhase,
        Arc::new(InterfaceInterceptionMiddleware::new(options)),
    )
}
