//! Interface proxies
//!
//! A proxy for `dyn Trait` is an [`InterfaceProxy<dyn Trait>`] that
//! implements the trait by routing each call through an interceptor chain
//! before reaching the target. The implementation is generated once per
//! trait by [`proxy_interface!`](crate::proxy_interface), which also
//! registers a [`ProxyShape`] so proxies can be created from erased views.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use ricecoder_di::{downcast_view, AnyArc, Interface, TypeDescriptor};
use tracing::debug;

use super::invocation::{Arguments, Interceptor, Invocation, ReturnValue};
use super::options::{InterceptorSelector, ProxyGenerationHook, ProxyGenerationOptions};
use crate::error::InterceptionResult;

/// The interceptors wrapped around every call of one proxied interface
#[derive(Clone)]
pub struct InterceptorChain {
    interface: TypeDescriptor,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    selector: Option<Arc<dyn InterceptorSelector>>,
    hook: Option<Arc<dyn ProxyGenerationHook>>,
}

impl InterceptorChain {
    pub fn new(
        interface: TypeDescriptor,
        interceptors: Arc<[Arc<dyn Interceptor>]>,
        options: &ProxyGenerationOptions,
    ) -> Self {
        Self {
            interface,
            interceptors,
            selector: options.selector().cloned(),
            hook: options.hook().cloned(),
        }
    }

    /// Replace the selector configured in the options
    pub fn with_selector(mut self, selector: Option<Arc<dyn InterceptorSelector>>) -> Self {
        self.selector = selector;
        self
    }

    pub fn interface(&self) -> &TypeDescriptor {
        &self.interface
    }

    pub fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.interceptors
    }

    /// Interceptors that apply to `method`, after the hook and selector
    pub fn interceptors_for(&self, method: &str) -> Vec<Arc<dyn Interceptor>> {
        if let Some(hook) = &self.hook {
            if !hook.should_intercept_method(&self.interface, method) {
                return Vec::new();
            }
        }
        match &self.selector {
            Some(selector) => selector.select_interceptors(&self.interface, method, &self.interceptors),
            None => self.interceptors.to_vec(),
        }
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("interface", &self.interface.name())
            .field("interceptors", &self.interceptors.len())
            .field("selector", &self.selector.is_some())
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

/// A generated implementation of interface `I` that intercepts every call
pub struct InterfaceProxy<I: ?Sized> {
    target: Option<Arc<I>>,
    chain: InterceptorChain,
}

impl<I: ?Sized + Interface + Send + Sync> InterfaceProxy<I> {
    pub fn new(target: Option<Arc<I>>, chain: InterceptorChain) -> Self {
        Self { target, chain }
    }

    /// Build a proxy over an erased `Arc<I>` view; `None` if the view has another type
    pub fn from_erased(target: Option<&AnyArc>, chain: InterceptorChain) -> Option<Self> {
        let target = match target {
            Some(view) => Some(downcast_view::<I>(view)?),
            None => None,
        };
        Some(Self::new(target, chain))
    }

    pub fn target(&self) -> Option<&Arc<I>> {
        self.target.as_ref()
    }

    pub fn chain(&self) -> &InterceptorChain {
        &self.chain
    }

    /// Route one call through the chain.
    ///
    /// `call` invokes the method on the target with the arguments as the
    /// interceptors left them.
    ///
    /// # Panics
    ///
    /// Trait methods cannot report interception failures, so an interceptor
    /// error, a call that reaches a missing target, or a return value of the
    /// wrong type panics here.
    pub fn dispatch<R, F>(&self, method: &'static str, arguments: Arguments, call: F) -> R
    where
        R: 'static,
        F: Fn(&I, &Arguments) -> InterceptionResult<ReturnValue>,
    {
        let interceptors = self.chain.interceptors_for(method);
        let target = self
            .target
            .as_ref()
            .map(|target| move |args: &Arguments| call(&**target, args));
        let target_call = target
            .as_ref()
            .map(|f| f as &dyn Fn(&Arguments) -> InterceptionResult<ReturnValue>);

        let mut invocation = Invocation::new(&self.chain.interface, method, arguments, &interceptors, target_call);
        let outcome = invocation
            .proceed()
            .and_then(|()| invocation.into_return_value::<R>());

        match outcome {
            Ok(value) => value,
            Err(error) => panic!(
                "interception of {}::{} failed: {}",
                self.chain.interface.name(),
                method,
                error
            ),
        }
    }
}

impl<I: ?Sized> fmt::Debug for InterfaceProxy<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceProxy")
            .field("chain", &self.chain)
            .field("has_target", &self.target.is_some())
            .finish()
    }
}

type ProxyFactory = fn(Option<&AnyArc>, InterceptorChain) -> Option<AnyArc>;

/// How to build a proxy for one interface from erased values
pub struct ProxyShape {
    interface: fn() -> TypeDescriptor,
    proxy_type: fn() -> TypeId,
    create: ProxyFactory,
}

impl ProxyShape {
    pub const fn new(interface: fn() -> TypeDescriptor, proxy_type: fn() -> TypeId, create: ProxyFactory) -> Self {
        Self {
            interface,
            proxy_type,
            create,
        }
    }

    pub fn interface(&self) -> TypeDescriptor {
        (self.interface)()
    }

    /// `TypeId` of the generated `InterfaceProxy<dyn Trait>`
    pub fn proxy_type(&self) -> TypeId {
        (self.proxy_type)()
    }

    /// Create an erased `Arc<dyn Trait>` proxy over `target` (if any)
    pub fn create(&self, target: Option<&AnyArc>, chain: InterceptorChain) -> Option<AnyArc> {
        (self.create)(target, chain)
    }
}

inventory::collect!(ProxyShape);

static SHAPES: Lazy<HashMap<TypeId, &'static ProxyShape>> = Lazy::new(|| {
    let shapes: HashMap<TypeId, &'static ProxyShape> = inventory::iter::<ProxyShape>()
        .map(|shape| (shape.interface().id(), shape))
        .collect();
    debug!("Discovered {} proxyable interface(s)", shapes.len());
    shapes
});

/// The proxy shape registered for `interface`, if it was declared with `proxy_interface!`
pub fn shape_for(interface: TypeId) -> Option<&'static ProxyShape> {
    SHAPES.get(&interface).copied()
}

/// Declare a trait whose trait objects can be proxied.
///
/// Methods must take `&self`; arguments must be owned `Clone + Send + 'static`
/// values and return types `Send + 'static`. The trait gets `Send + Sync`
/// supertraits.
///
/// ```rust,ignore
/// proxy_interface! {
///     pub trait Greeter {
///         fn greet(&self, name: String) -> String;
///     }
/// }
/// ```
#[macro_export]
macro_rules! proxy_interface {
    (
        $(#[$meta:meta])*
        $vis:vis trait $name:ident {
            $(
                $(#[$method_meta:meta])*
                fn $method:ident(&self $(, $arg:ident : $arg_ty:ty)* $(,)?) $(-> $ret:ty)?;
            )*
        }
    ) => {
        $(#[$meta])*
        $vis trait $name: ::std::marker::Send + ::std::marker::Sync {
            $(
                $(#[$method_meta])*
                fn $method(&self $(, $arg: $arg_ty)*) $(-> $ret)?;
            )*
        }

        impl $crate::__private::Interface for dyn $name {
            fn descriptor() -> $crate::__private::TypeDescriptor {
                $crate::__private::TypeDescriptor::interface::<dyn $name>(
                    $crate::__private::Visibility::from_keyword(::std::stringify!($vis)),
                )
            }
        }

        impl $name for $crate::proxy::InterfaceProxy<dyn $name> {
            $(
                fn $method(&self $(, $arg: $arg_ty)*) $(-> $ret)? {
                    let arguments = $crate::proxy::Arguments::new(::std::vec![
                        $(::std::boxed::Box::new($arg) as ::std::boxed::Box<dyn ::std::any::Any + ::std::marker::Send>),*
                    ]);
                    self.dispatch(::std::stringify!($method), arguments, |target, arguments| {
                        #[allow(unused_mut, unused_variables)]
                        let mut cursor = $crate::proxy::ArgumentCursor::new(arguments, ::std::stringify!($method));
                        $(let $arg: $arg_ty = cursor.next::<$arg_ty>()?;)*
                        ::std::result::Result::Ok(::std::boxed::Box::new(target.$method($($arg),*)) as $crate::proxy::ReturnValue)
                    })
                }
            )*
        }

        $crate::__private::inventory::submit! {
            $crate::proxy::ProxyShape::new(
                <dyn $name as $crate::__private::Interface>::descriptor,
                || ::std::any::TypeId::of::<$crate::proxy::InterfaceProxy<dyn $name>>(),
                |target, chain| {
                    $crate::proxy::InterfaceProxy::<dyn $name>::from_erased(target, chain)
                        .map(|proxy| $crate::__private::erase_view::<dyn $name>(::std::sync::Arc::new(proxy)))
                },
            )
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InterceptionError;
    use ricecoder_di::{erase_view, Visibility};

    crate::proxy_interface! {
        pub trait Counter {
            fn add(&self, amount: u32) -> u32;
            fn label(&self) -> String;
        }
    }

    crate::proxy_interface! {
        trait Hidden {
            fn ping(&self);
        }
    }

    struct Fixed;

    impl Counter for Fixed {
        fn add(&self, amount: u32) -> u32 {
            10 + amount
        }

        fn label(&self) -> String {
            "fixed".to_string()
        }
    }

    struct Answer;

    impl Interceptor for Answer {
        fn intercept(&self, invocation: &mut Invocation<'_>) -> InterceptionResult<()> {
            match invocation.method() {
                "label" => {
                    invocation.set_return_value("answered".to_string());
                    Ok(())
                }
                _ => invocation.proceed(),
            }
        }
    }

    struct OnlyLabels;

    impl ProxyGenerationHook for OnlyLabels {
        fn should_intercept_method(&self, _: &TypeDescriptor, method: &str) -> bool {
            method == "label"
        }
    }

    struct Failing;

    impl Interceptor for Failing {
        fn intercept(&self, _: &mut Invocation<'_>) -> InterceptionResult<()> {
            Err(InterceptionError::InvalidArgument {
                message: "rejected".to_string(),
            })
        }
    }

    fn chain(interceptors: Vec<Arc<dyn Interceptor>>, options: &ProxyGenerationOptions) -> InterceptorChain {
        InterceptorChain::new(<dyn Counter as Interface>::descriptor(), interceptors.into(), options)
    }

    #[test]
    fn test_macro_visibility() {
        assert_eq!(<dyn Counter as Interface>::descriptor().visibility(), Visibility::Public);
        assert_eq!(<dyn Hidden as Interface>::descriptor().visibility(), Visibility::Private);
        assert!(<dyn Counter as Interface>::descriptor().is_interface());
    }

    #[test]
    fn test_proxy_forwards_to_target() {
        let proxy = InterfaceProxy::<dyn Counter>::new(
            Some(Arc::new(Fixed)),
            chain(Vec::new(), &ProxyGenerationOptions::default()),
        );
        assert_eq!(proxy.add(5), 15);
        assert_eq!(proxy.label(), "fixed");
    }

    #[test]
    fn test_interceptor_answers_without_target() {
        let proxy = InterfaceProxy::<dyn Counter>::new(
            None,
            chain(vec![Arc::new(Answer)], &ProxyGenerationOptions::default()),
        );
        assert_eq!(proxy.label(), "answered");
    }

    #[test]
    #[should_panic(expected = "has no target")]
    fn test_missing_target_panics_at_boundary() {
        let proxy = InterfaceProxy::<dyn Counter>::new(
            None,
            chain(vec![Arc::new(Answer)], &ProxyGenerationOptions::default()),
        );
        proxy.add(1);
    }

    #[test]
    #[should_panic(expected = "rejected")]
    fn test_interceptor_error_panics_at_boundary() {
        let proxy = InterfaceProxy::<dyn Counter>::new(
            Some(Arc::new(Fixed)),
            chain(vec![Arc::new(Failing)], &ProxyGenerationOptions::default()),
        );
        proxy.add(1);
    }

    #[test]
    fn test_hook_limits_intercepted_methods() {
        let options = ProxyGenerationOptions::new().with_hook(Arc::new(OnlyLabels));
        let proxy = InterfaceProxy::<dyn Counter>::new(Some(Arc::new(Fixed)), chain(vec![Arc::new(Failing)], &options));

        // `add` is not intercepted, so the failing interceptor never runs
        assert_eq!(proxy.add(1), 11);
    }

    #[test]
    fn test_shape_registered_by_macro() {
        let shape = shape_for(TypeId::of::<dyn Counter>()).expect("shape");
        assert_eq!(shape.proxy_type(), TypeId::of::<InterfaceProxy<dyn Counter>>());

        let target: Arc<dyn Counter> = Arc::new(Fixed);
        let erased = erase_view::<dyn Counter>(target);
        let proxy = shape
            .create(Some(&erased), chain(Vec::new(), &ProxyGenerationOptions::default()))
            .and_then(|view| downcast_view::<dyn Counter>(&view))
            .expect("proxy");
        assert_eq!(proxy.add(2), 12);

        // A view of another interface cannot serve as the target
        let wrong = erase_view::<dyn Interceptor>(Arc::new(Answer));
        assert!(shape
            .create(Some(&wrong), chain(Vec::new(), &ProxyGenerationOptions::default()))
            .is_none());
        assert!(shape_for(TypeId::of::<Fixed>()).is_none());
    }
}
