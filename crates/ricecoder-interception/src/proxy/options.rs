//! Proxy generation options

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ricecoder_di::{erase_view, AnyArc, Interface, TypeDescriptor};

use super::invocation::Interceptor;

/// Decides which methods of a proxied interface are intercepted at all
pub trait ProxyGenerationHook: Send + Sync {
    fn should_intercept_method(&self, interface: &TypeDescriptor, method: &str) -> bool;
}

/// Picks the interceptors that apply to one method
pub trait InterceptorSelector: Send + Sync {
    fn select_interceptors(
        &self,
        interface: &TypeDescriptor,
        method: &str,
        interceptors: &[Arc<dyn Interceptor>],
    ) -> Vec<Arc<dyn Interceptor>>;
}

/// An auxiliary object whose interface is exposed by the proxy as its own
#[derive(Clone)]
pub struct Mixin {
    descriptor: TypeDescriptor,
    view: AnyArc,
}

impl Mixin {
    pub fn new<I: ?Sized + Interface + Send + Sync>(view: Arc<I>) -> Self {
        Self {
            descriptor: I::descriptor(),
            view: erase_view::<I>(view),
        }
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn view(&self) -> &AnyArc {
        &self.view
    }
}

impl fmt::Debug for Mixin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Mixin").field(&self.descriptor.name()).finish()
    }
}

/// Options that shape a generated proxy
#[derive(Clone, Default)]
pub struct ProxyGenerationOptions {
    hook: Option<Arc<dyn ProxyGenerationHook>>,
    selector: Option<Arc<dyn InterceptorSelector>>,
    mixins: Vec<Mixin>,
}

impl ProxyGenerationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(mut self, hook: Arc<dyn ProxyGenerationHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn with_selector(mut self, selector: Arc<dyn InterceptorSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn with_mixin(mut self, mixin: Mixin) -> Self {
        self.mixins.push(mixin);
        self
    }

    pub fn hook(&self) -> Option<&Arc<dyn ProxyGenerationHook>> {
        self.hook.as_ref()
    }

    pub fn selector(&self) -> Option<&Arc<dyn InterceptorSelector>> {
        self.selector.as_ref()
    }

    pub fn mixins(&self) -> &[Mixin] {
        &self.mixins
    }

    /// Identity of these options for the proxy type cache
    pub(crate) fn key(&self) -> OptionsKey {
        OptionsKey {
            hook: self.hook.clone().map(ArcIdentity),
            selector: self.selector.clone().map(ArcIdentity),
            mixins: self.mixins.iter().map(|m| m.descriptor.id()).collect(),
        }
    }
}

impl fmt::Debug for ProxyGenerationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyGenerationOptions")
            .field("hook", &self.hook.is_some())
            .field("selector", &self.selector.is_some())
            .field("mixins", &self.mixins)
            .finish()
    }
}

/// Compares and hashes an `Arc` by address. Holding the `Arc` keeps the
/// address from being reused while the key lives in the cache.
pub(crate) struct ArcIdentity<T: ?Sized>(Arc<T>);

impl<T: ?Sized> Clone for ArcIdentity<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: ?Sized> ArcIdentity<T> {
    fn address(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }
}

impl<T: ?Sized> PartialEq for ArcIdentity<T> {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl<T: ?Sized> Eq for ArcIdentity<T> {}

impl<T: ?Sized> Hash for ArcIdentity<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl<T: ?Sized> fmt::Debug for ArcIdentity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:p}", self.address())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct OptionsKey {
    hook: Option<ArcIdentity<dyn ProxyGenerationHook>>,
    selector: Option<ArcIdentity<dyn InterceptorSelector>>,
    mixins: Vec<TypeId>,
}
