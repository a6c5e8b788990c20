//! Proxy generation
//!
//! The [`ProxyGenerator`] creates interface proxies over existing instances
//! and class proxy types that wrap a component type's activator. Class proxy
//! types are cached so every registration of the same base type with the
//! same interfaces and options shares one generated type.

use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use ricecoder_di::{
    Activator, ActivatorKind, ComponentType, ConstructorArgs, DIError, DIResult, Instance,
    Interface, Parameter, TypeDescriptor, Visibility,
};
use tracing::debug;

use super::interface_proxy::{shape_for, InterceptorChain, ProxyShape};
use super::invocation::Interceptor;
use super::options::{InterceptorSelector, Mixin, OptionsKey, ProxyGenerationOptions};
use crate::error::{InterceptionError, InterceptionResult};

/// Marker type that gives each generated class proxy its own `TypeId`
pub struct ClassProxy<T>(PhantomData<fn() -> T>);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClassProxyKey {
    base: TypeId,
    additional: Vec<TypeId>,
    options: OptionsKey,
}

/// A generated class proxy type
#[derive(Debug)]
pub struct ClassProxyType {
    descriptor: TypeDescriptor,
    base: TypeDescriptor,
    additional: Vec<TypeDescriptor>,
}

impl ClassProxyType {
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn base(&self) -> &TypeDescriptor {
        &self.base
    }

    pub fn additional_interfaces(&self) -> &[TypeDescriptor] {
        &self.additional
    }
}

/// Generates proxy types and proxy instances
#[derive(Default)]
pub struct ProxyGenerator {
    class_proxies: DashMap<ClassProxyKey, Arc<ClassProxyType>>,
    interface_proxies_created: AtomicUsize,
}

static GENERATOR: Lazy<ProxyGenerator> = Lazy::new(ProxyGenerator::new);

/// The generator shared by all registrations
pub fn generator() -> &'static ProxyGenerator {
    &GENERATOR
}

fn shape_of(interface: &TypeDescriptor) -> InterceptionResult<&'static ProxyShape> {
    shape_for(interface.id()).ok_or_else(|| InterceptionError::ProxyGeneration {
        message: format!(
            "{} cannot be proxied; declare it with proxy_interface!",
            interface
        ),
    })
}

impl ProxyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether generated proxies can implement or derive from `descriptor`
    pub fn is_accessible(&self, descriptor: &TypeDescriptor) -> bool {
        descriptor.visibility().is_accessible()
    }

    /// Number of cached class proxy types
    pub fn class_proxy_type_count(&self) -> usize {
        self.class_proxies.len()
    }

    pub fn interface_proxies_created(&self) -> usize {
        self.interface_proxies_created.load(Ordering::Relaxed)
    }

    /// Generate (or fetch from the cache) a proxy type deriving from `base`
    /// and implementing `additional` interfaces as well.
    pub fn create_class_proxy_type<T: 'static>(
        &self,
        base: &TypeDescriptor,
        additional: &[TypeDescriptor],
        options: &ProxyGenerationOptions,
    ) -> InterceptionResult<Arc<ClassProxyType>> {
        if !base.is_class() {
            return Err(InterceptionError::ProxyGeneration {
                message: format!("{} is not a class and cannot be the base of a class proxy", base),
            });
        }
        if !self.is_accessible(base) {
            return Err(InterceptionError::ProxyGeneration {
                message: format!("{} is not accessible to the proxy generator", base),
            });
        }
        for interface in additional {
            if !interface.is_interface() || !self.is_accessible(interface) {
                return Err(InterceptionError::ProxyGeneration {
                    message: format!("{} is not an accessible interface", interface),
                });
            }
            shape_of(interface)?;
        }

        let key = ClassProxyKey {
            base: base.id(),
            additional: additional.iter().map(TypeDescriptor::id).collect(),
            options: options.key(),
        };

        if let Some(cached) = self.class_proxies.get(&key) {
            debug!("Reusing class proxy type for {}", base);
            return Ok(cached.clone());
        }

        let generated = self
            .class_proxies
            .entry(key)
            .or_insert_with(|| {
                debug!(
                    "Generating class proxy type for {} with {} additional interface(s)",
                    base,
                    additional.len()
                );
                Arc::new(ClassProxyType {
                    descriptor: TypeDescriptor::synthesized(
                        TypeId::of::<ClassProxy<T>>(),
                        format!("{}Proxy", base.name()),
                        Visibility::Public,
                    ),
                    base: base.clone(),
                    additional: additional.to_vec(),
                })
            })
            .clone();
        Ok(generated)
    }

    /// Create a proxy implementing `primary` and `additional` that forwards
    /// to the views of `target`, wrapping every call with `interceptors`.
    ///
    /// An interface `target` does not implement gets a proxy without a
    /// target, as do interfaces supplied by neither `target` nor a mixin.
    pub fn create_interface_proxy_with_target(
        &self,
        primary: &TypeDescriptor,
        additional: &[TypeDescriptor],
        target: &Instance,
        options: Option<&ProxyGenerationOptions>,
        interceptors: Vec<Arc<dyn Interceptor>>,
    ) -> InterceptionResult<Instance> {
        let default_options = ProxyGenerationOptions::default();
        let options = options.unwrap_or(&default_options);
        let primary_shape = shape_of(primary)?;
        let interceptors: Arc<[Arc<dyn Interceptor>]> = interceptors.into();

        let mut proxy = Instance::views_only(TypeDescriptor::synthesized(
            primary_shape.proxy_type(),
            format!("{}Proxy", primary.name()),
            Visibility::Public,
        ));

        for interface in std::iter::once(primary).chain(additional) {
            let shape = shape_of(interface)?;
            let chain = InterceptorChain::new(interface.clone(), interceptors.clone(), options);
            let view = shape
                .create(target.view_any(interface.id()), chain)
                .ok_or_else(|| InterceptionError::ProxyGeneration {
                    message: format!("{} does not expose a usable {} view", target.descriptor(), interface),
                })?;
            proxy.add_view(interface.clone(), view);
        }

        add_mixins(&mut proxy, options.mixins(), &interceptors, options, None)?;

        self.interface_proxies_created.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Created interface proxy {} over {} with {} interceptor(s)",
            proxy.descriptor(),
            target.descriptor(),
            interceptors.len()
        );
        Ok(proxy)
    }

    /// Typed convenience over [`create_interface_proxy_with_target`](Self::create_interface_proxy_with_target)
    pub fn create_interface_proxy<I: ?Sized + Interface + Send + Sync>(
        &self,
        target: Arc<I>,
        interceptors: Vec<Arc<dyn Interceptor>>,
        options: Option<&ProxyGenerationOptions>,
    ) -> InterceptionResult<Arc<I>> {
        let primary = I::descriptor();
        let mut instance = Instance::views_only(primary.clone());
        instance.add_view(primary.clone(), ricecoder_di::erase_view::<I>(target));

        let proxy = self.create_interface_proxy_with_target(&primary, &[], &instance, options, interceptors)?;
        proxy.view::<I>().ok_or_else(|| InterceptionError::ProxyGeneration {
            message: format!("proxy for {} lost its primary view", primary),
        })
    }
}

/// Add each mixin's interface, proxied over the mixin when the interface has
/// a shape, unless the proxy already exposes it.
fn add_mixins(
    proxy: &mut Instance,
    mixins: &[Mixin],
    interceptors: &Arc<[Arc<dyn Interceptor>]>,
    options: &ProxyGenerationOptions,
    selector: Option<&Arc<dyn InterceptorSelector>>,
) -> InterceptionResult<()> {
    for mixin in mixins {
        let interface = mixin.descriptor();
        if proxy.view_any(interface.id()).is_some() {
            continue;
        }
        let view = match shape_for(interface.id()) {
            Some(shape) => {
                let mut chain = InterceptorChain::new(interface.clone(), interceptors.clone(), options);
                if let Some(selector) = selector {
                    chain = chain.with_selector(Some(selector.clone()));
                }
                shape
                    .create(Some(mixin.view()), chain)
                    .ok_or_else(|| InterceptionError::ProxyGeneration {
                        message: format!("mixin view is not a {}", interface),
                    })?
            }
            None => mixin.view().clone(),
        };
        proxy.add_view(interface.clone(), view);
    }
    Ok(())
}

/// Activates a class proxy: strips the synthetic constructor arguments,
/// activates the base component with the rest and intercepts its views.
pub struct ClassProxyActivator {
    proxy_type: Arc<ClassProxyType>,
    base: ComponentType,
    options: ProxyGenerationOptions,
}

impl ClassProxyActivator {
    pub fn new(proxy_type: Arc<ClassProxyType>, base: ComponentType, options: ProxyGenerationOptions) -> Self {
        Self {
            proxy_type,
            base,
            options,
        }
    }

    pub fn proxy_type(&self) -> &Arc<ClassProxyType> {
        &self.proxy_type
    }

    fn synthetic_argument<V: Clone + Send + Sync + 'static>(
        parameters: &mut std::vec::IntoIter<Parameter>,
        what: &str,
    ) -> DIResult<V> {
        let parameter = parameters.next().ok_or_else(|| DIError::DependencyResolutionFailed {
            message: format!("class proxy constructor is missing its {} argument", what),
        })?;
        parameter
            .value()
            .clone()
            .downcast::<V>()
            .map(|value| (*value).clone())
            .map_err(|_| DIError::InvalidServiceType {
                message: format!("class proxy {} argument has the wrong type", what),
            })
    }
}

impl Activator for ClassProxyActivator {
    fn kind(&self) -> ActivatorKind {
        ActivatorKind::ClassProxy
    }

    fn activate(&self, component: &ComponentType, args: ConstructorArgs<'_>) -> DIResult<Instance> {
        let context = args.context();
        let mut parameters = args.into_parameters().into_iter();

        // Synthetic arguments come first: mixins, the interceptors, then the selector.
        let mut mixins = Vec::with_capacity(self.options.mixins().len());
        for _ in self.options.mixins() {
            mixins.push(Self::synthetic_argument::<Mixin>(&mut parameters, "mixin")?);
        }
        let interceptors: Arc<[Arc<dyn Interceptor>]> =
            Self::synthetic_argument::<Vec<Arc<dyn Interceptor>>>(&mut parameters, "interceptor")?.into();
        let selector = match self.options.selector() {
            Some(_) => Some(Self::synthetic_argument::<Arc<dyn InterceptorSelector>>(
                &mut parameters,
                "selector",
            )?),
            None => None,
        };

        let mut target = self.base.activate(ConstructorArgs::new(context, parameters.collect()))?;
        // Bindings added to the registration after the proxy type was swapped in
        if let Some(concrete) = target.concrete_any().cloned() {
            for binding in component.interfaces() {
                if target.view_any(binding.descriptor().id()).is_some() {
                    continue;
                }
                if let Some(view) = binding.view_of(&concrete) {
                    target.add_view(binding.descriptor().clone(), view);
                }
            }
        }
        let mut proxy = match target.concrete_any() {
            Some(concrete) => Instance::new(component.descriptor().clone(), concrete.clone()),
            None => Instance::views_only(component.descriptor().clone()),
        };

        for view in target.views() {
            let interface = view.descriptor();
            let intercepted = match shape_for(interface.id()) {
                Some(shape) => {
                    let chain = InterceptorChain::new(interface.clone(), interceptors.clone(), &self.options)
                        .with_selector(selector.clone());
                    shape.create(Some(view.value()), chain)
                }
                None => None,
            };
            proxy.add_view(interface.clone(), intercepted.unwrap_or_else(|| view.value().clone()));
        }

        add_mixins(&mut proxy, &mixins, &interceptors, &self.options, selector.as_ref())
            .map_err(DIError::from)?;

        for interface in self.proxy_type.additional_interfaces() {
            if proxy.view_any(interface.id()).is_some() {
                continue;
            }
            let shape = shape_of(interface).map_err(DIError::from)?;
            let chain = InterceptorChain::new(interface.clone(), interceptors.clone(), &self.options)
                .with_selector(selector.clone());
            if let Some(view) = shape.create(None, chain) {
                proxy.add_view(interface.clone(), view);
            }
        }

        debug!(
            "Activated class proxy {} with {} interceptor(s)",
            self.proxy_type.descriptor(),
            interceptors.len()
        );
        Ok(proxy)
    }
}
