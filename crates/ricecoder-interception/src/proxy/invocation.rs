//! Interceptors and the invocations they wrap

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use ricecoder_di::{Interface, TypeDescriptor, Visibility};

use crate::error::{InterceptionError, InterceptionResult};

/// A type-erased value returned from an intercepted call
pub type ReturnValue = Box<dyn Any + Send>;

/// The call into the proxied target, given the (possibly rewritten) arguments
pub type TargetCall<'a> = &'a (dyn Fn(&Arguments) -> InterceptionResult<ReturnValue> + 'a);

/// Behavior wrapped around calls on a proxied interface.
///
/// Call [`Invocation::proceed`] to run the next interceptor (or the target);
/// skip it to short-circuit the call, in which case a return value must be
/// set for methods that return one.
pub trait Interceptor: Send + Sync {
    fn intercept(&self, invocation: &mut Invocation<'_>) -> InterceptionResult<()>;
}

impl Interface for dyn Interceptor {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::interface::<dyn Interceptor>(Visibility::Public)
    }
}

/// Arguments of an intercepted call.
///
/// Interceptors may inspect and replace them before proceeding.
#[derive(Default)]
pub struct Arguments {
    values: Vec<Box<dyn Any + Send>>,
}

impl Arguments {
    pub fn new(values: Vec<Box<dyn Any + Send>>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get<T: 'static>(&self, index: usize) -> Option<&T> {
        self.values.get(index)?.downcast_ref::<T>()
    }

    pub fn get_mut<T: 'static>(&mut self, index: usize) -> Option<&mut T> {
        self.values.get_mut(index)?.downcast_mut::<T>()
    }

    /// Replace the argument at `index`; the new value must have the parameter's type
    pub fn set<T: Send + 'static>(&mut self, index: usize, value: T) -> bool {
        match self.values.get_mut(index) {
            Some(slot) if slot.is::<T>() => {
                *slot = Box::new(value);
                true
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments").field("len", &self.values.len()).finish()
    }
}

/// Reads arguments back out in parameter order
pub struct ArgumentCursor<'a> {
    arguments: &'a Arguments,
    method: &'static str,
    index: usize,
}

impl<'a> ArgumentCursor<'a> {
    pub fn new(arguments: &'a Arguments, method: &'static str) -> Self {
        Self {
            arguments,
            method,
            index: 0,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next<T: Clone + 'static>(&mut self) -> InterceptionResult<T> {
        let index = self.index;
        self.index += 1;
        self.arguments
            .get::<T>(index)
            .cloned()
            .ok_or_else(|| InterceptionError::ArgumentMismatch {
                method: self.method.to_string(),
                index,
                expected: type_name::<T>().to_string(),
            })
    }
}

/// One call travelling through an interceptor chain
pub struct Invocation<'a> {
    interface: &'a TypeDescriptor,
    method: &'static str,
    arguments: Arguments,
    return_value: Option<ReturnValue>,
    interceptors: &'a [Arc<dyn Interceptor>],
    next: usize,
    target: Option<TargetCall<'a>>,
}

impl<'a> Invocation<'a> {
    pub fn new(
        interface: &'a TypeDescriptor,
        method: &'static str,
        arguments: Arguments,
        interceptors: &'a [Arc<dyn Interceptor>],
        target: Option<TargetCall<'a>>,
    ) -> Self {
        Self {
            interface,
            method,
            arguments,
            return_value: None,
            interceptors,
            next: 0,
            target,
        }
    }

    pub fn interface(&self) -> &TypeDescriptor {
        self.interface
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    pub fn arguments_mut(&mut self) -> &mut Arguments {
        &mut self.arguments
    }

    /// Whether a real object sits behind the proxy
    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    pub fn return_value<R: 'static>(&self) -> Option<&R> {
        self.return_value.as_ref()?.downcast_ref::<R>()
    }

    pub fn return_value_mut<R: 'static>(&mut self) -> Option<&mut R> {
        self.return_value.as_mut()?.downcast_mut::<R>()
    }

    pub fn set_return_value<R: Send + 'static>(&mut self, value: R) {
        self.return_value = Some(Box::new(value));
    }

    /// Run the rest of the chain: the next interceptor, or the target once
    /// every interceptor has proceeded.
    pub fn proceed(&mut self) -> InterceptionResult<()> {
        let interceptors = self.interceptors;
        match interceptors.get(self.next) {
            Some(interceptor) => {
                self.next += 1;
                let result = interceptor.intercept(self);
                self.next -= 1;
                result
            }
            None => {
                let target = self.target.ok_or_else(|| InterceptionError::NoTarget {
                    interface: self.interface.name().to_string(),
                    method: self.method.to_string(),
                })?;
                self.return_value = Some(target(&self.arguments)?);
                Ok(())
            }
        }
    }

    /// Take the return value as `R`. Methods returning `()` need no value.
    pub fn into_return_value<R: 'static>(self) -> InterceptionResult<R> {
        let value: Box<dyn Any> = match self.return_value {
            Some(value) => value,
            None => Box::new(()),
        };
        value
            .downcast::<R>()
            .map(|value| *value)
            .map_err(|_| InterceptionError::ReturnValueMismatch {
                method: format!("{}::{}", self.interface.name(), self.method),
                expected: type_name::<R>().to_string(),
            })
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("interface", &self.interface.name())
            .field("method", &self.method)
            .field("arguments", &self.arguments)
            .field("position", &self.next)
            .finish()
    }
}
