//! Interface-level interception
//!
//! A middleware stage between sharing and decoration lets activation and
//! decoration finish, then swaps the instance for an interface proxy that
//! targets it. Calls into decorators are therefore intercepted too, and
//! shared lifetimes cache the proxy.

use ricecoder_di::{
    DIError, DIResult, Next, PipelinePhase, ResolveMiddleware, ResolveRequestContext, Service,
};
use tracing::debug;

use crate::error::{InterceptionError, InterceptionResult};
use crate::proxy::{generator, ProxyGenerationOptions};
use crate::resolver::{interceptor_services_for, resolve_interceptors};

/// Replace the request's instance with an interface proxy over it.
///
/// Fails if no instance was activated yet, or if the registration exposes a
/// service that is not an accessible interface. An instance with no
/// accessible interfaces is left as it is.
pub fn apply_proxy(
    ctx: &mut ResolveRequestContext<'_>,
    options: Option<&ProxyGenerationOptions>,
) -> InterceptionResult<()> {
    let instance = ctx
        .instance()
        .cloned()
        .ok_or_else(|| InterceptionError::InvalidArgument {
            message: format!(
                "no activated instance to proxy for {}",
                ctx.registration().implementation_type()
            ),
        })?;

    ensure_interface_interception_applies(ctx)?;

    let proxy_generator = generator();
    let interfaces: Vec<_> = instance
        .interfaces()
        .into_iter()
        .filter(|interface| proxy_generator.is_accessible(interface))
        .collect();

    let Some((primary, additional)) = interfaces.split_first() else {
        debug!(
            "{} exposes no accessible interfaces; skipping interface interception",
            instance.descriptor()
        );
        return Ok(());
    };

    let services = interceptor_services_for(
        ctx.registration().extensions(),
        instance.descriptor(),
        &instance.interfaces(),
    );
    let interceptors = resolve_interceptors(ctx.context(), &services)?;

    let proxy = proxy_generator.create_interface_proxy_with_target(
        primary,
        additional,
        &instance,
        options,
        interceptors,
    )?;
    ctx.set_instance(proxy);
    Ok(())
}

fn ensure_interface_interception_applies(ctx: &ResolveRequestContext<'_>) -> InterceptionResult<()> {
    let registration = ctx.registration();
    let offending: Vec<&Service> = registration
        .services()
        .iter()
        .filter(|service| {
            let service_type = service.service_type();
            !service_type.is_interface() || !generator().is_accessible(service_type)
        })
        .collect();

    if offending.is_empty() {
        return Ok(());
    }

    Err(InterceptionError::InapplicableTarget {
        registration: registration.to_string(),
        services: offending
            .iter()
            .map(|s| s.service_type().name().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Pipeline stage installed by `enable_interface_interceptors`
#[derive(Debug, Default)]
pub struct InterfaceInterceptionMiddleware {
    options: Option<ProxyGenerationOptions>,
}

impl InterfaceInterceptionMiddleware {
    pub fn new(options: Option<ProxyGenerationOptions>) -> Self {
        Self { options }
    }
}

impl ResolveMiddleware for InterfaceInterceptionMiddleware {
    fn phase(&self) -> PipelinePhase {
        PipelinePhase::RegistrationPipelineStart
    }

    fn execute(&self, ctx: &mut ResolveRequestContext<'_>, next: Next<'_>) -> DIResult<()> {
        next(ctx)?;
        apply_proxy(ctx, self.options.as_ref()).map_err(DIError::from)
    }
}
