//! Class-level interception
//!
//! Enabling class interception swaps a registration's component type for a
//! generated class proxy type once, at configuration time. Each activation
//! then receives the resolved interceptors (plus mixins and selector) as
//! positional constructor arguments ahead of any caller-supplied ones.

use std::sync::Arc;

use ricecoder_di::{ActivatorKind, ComponentType, Parameter, PreparingArgs, RegistrationBuilder, TypeDescriptor};
use tracing::debug;

use crate::attributes::scan_for_interceptors;
use crate::error::{InterceptionError, InterceptionResult};
use crate::proxy::{generator, ClassProxyActivator, ProxyGenerationOptions};
use crate::registry::{add_interceptor_services, InterceptorKey};
use crate::resolver::{interceptor_services_for, resolve_interceptors};

pub(crate) fn enable_class_interceptors<'b, T: Send + Sync + 'static>(
    mut builder: RegistrationBuilder<'b, T>,
    options: ProxyGenerationOptions,
    additional_interfaces: Vec<TypeDescriptor>,
) -> InterceptionResult<RegistrationBuilder<'b, T>> {
    let base = builder.component_type().clone();
    if base.activator_kind() != ActivatorKind::Constructor {
        return Err(InterceptionError::InvalidArgument {
            message: format!(
                "class interception requires a constructor-activated registration, but {} is {:?}",
                base.descriptor(),
                base.activator_kind()
            ),
        });
    }

    let proxy_type =
        generator().create_class_proxy_type::<T>(base.descriptor(), &additional_interfaces, &options)?;

    let original = base.descriptor().clone();
    let interfaces = base.interface_descriptors();
    let scanned = scan_for_interceptors(&original, &interfaces);
    debug!(
        "Class interception enabled for {} ({} attribute interceptor service(s))",
        original,
        scanned.len()
    );
    add_interceptor_services(builder.extensions_mut(), InterceptorKey::AttributeDerived, scanned)?;

    let mut proxied = ComponentType::new(
        proxy_type.descriptor().clone(),
        Arc::new(ClassProxyActivator::new(proxy_type.clone(), base.clone(), options.clone())),
    );
    for binding in base.interfaces() {
        proxied.add_interface(binding.clone());
    }
    for interface in &additional_interfaces {
        if !proxied.interfaces().iter().any(|b| b.descriptor() == interface) {
            proxied.add_interface(ricecoder_di::InterfaceBinding::unimplemented(interface.clone()));
        }
    }
    builder.set_component_type(proxied);

    Ok(builder.on_preparing(move |args| inject_proxy_arguments(args, &options, &original, &interfaces)))
}

/// Prepend mixins, the interceptor array and the selector (if any), in that order
fn inject_proxy_arguments(
    args: &mut PreparingArgs<'_>,
    options: &ProxyGenerationOptions,
    implementation: &TypeDescriptor,
    interfaces: &[TypeDescriptor],
) -> ricecoder_di::DIResult<()> {
    let services = interceptor_services_for(args.registration().extensions(), implementation, interfaces);
    let interceptors = resolve_interceptors(args.context(), &services)?;

    let mut synthetic = Vec::with_capacity(options.mixins().len() + 2);
    for mixin in options.mixins() {
        synthetic.push(Parameter::positional(synthetic.len(), mixin.clone()));
    }
    synthetic.push(Parameter::positional(synthetic.len(), interceptors));
    if let Some(selector) = options.selector() {
        synthetic.push(Parameter::positional(synthetic.len(), selector.clone()));
    }

    args.prepend_parameters(synthetic);
    Ok(())
}
