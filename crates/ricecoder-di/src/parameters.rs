//! Constructor parameters
//!
//! Parameters are supplied with a resolve request (or injected by preparing
//! handlers) and consumed by constructors through [`ConstructorArgs`].

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::context::ComponentContext;
use crate::types::{AnyArc, Interface};
use crate::{DIError, DIResult};

/// A value supplied to a component constructor
#[derive(Clone)]
pub enum Parameter {
    /// Matched by argument position
    Positional { index: usize, value: AnyArc },
    /// Matched by argument name
    Named { name: String, value: AnyArc },
    /// Matched by the type of the dependency it replaces
    Typed { type_id: TypeId, value: AnyArc },
}

impl Parameter {
    pub fn positional<V: Send + Sync + 'static>(index: usize, value: V) -> Self {
        Parameter::Positional {
            index,
            value: Arc::new(value),
        }
    }

    pub fn named<V: Send + Sync + 'static>(name: impl Into<String>, value: V) -> Self {
        Parameter::Named {
            name: name.into(),
            value: Arc::new(value),
        }
    }

    pub fn typed<V: Send + Sync + 'static>(value: V) -> Self {
        Parameter::Typed {
            type_id: TypeId::of::<V>(),
            value: Arc::new(value),
        }
    }

    pub fn value(&self) -> &AnyArc {
        match self {
            Parameter::Positional { value, .. }
            | Parameter::Named { value, .. }
            | Parameter::Typed { value, .. } => value,
        }
    }

    /// Position of a positional parameter
    pub fn index(&self) -> Option<usize> {
        match self {
            Parameter::Positional { index, .. } => Some(*index),
            _ => None,
        }
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Positional { index, .. } => write!(f, "Positional({})", index),
            Parameter::Named { name, .. } => write!(f, "Named({})", name),
            Parameter::Typed { type_id, .. } => write!(f, "Typed({:?})", type_id),
        }
    }
}

/// Arguments available to a constructor while a component is activated
pub struct ConstructorArgs<'a> {
    context: ComponentContext<'a>,
    parameters: Vec<Parameter>,
}

impl<'a> ConstructorArgs<'a> {
    pub fn new(context: ComponentContext<'a>, parameters: Vec<Parameter>) -> Self {
        Self {
            context,
            parameters,
        }
    }

    pub fn context(&self) -> ComponentContext<'a> {
        self.context
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn into_parameters(self) -> Vec<Parameter> {
        self.parameters
    }

    /// Value of the positional parameter at `index`
    pub fn positional<V: Send + Sync + 'static>(&self, index: usize) -> DIResult<Arc<V>> {
        let value = self
            .parameters
            .iter()
            .find(|p| p.index() == Some(index))
            .map(Parameter::value)
            .ok_or_else(|| DIError::DependencyResolutionFailed {
                message: format!("No constructor argument supplied at position {}", index),
            })?;

        value
            .clone()
            .downcast::<V>()
            .map_err(|_| DIError::InvalidServiceType {
                message: format!(
                    "Constructor argument at position {} is not a {}",
                    index,
                    std::any::type_name::<V>()
                ),
            })
    }

    /// Value of the named parameter `name`
    pub fn named<V: Send + Sync + 'static>(&self, name: &str) -> DIResult<Arc<V>> {
        let value = self
            .parameters
            .iter()
            .find_map(|p| match p {
                Parameter::Named { name: n, value } if n == name => Some(value),
                _ => None,
            })
            .ok_or_else(|| DIError::DependencyResolutionFailed {
                message: format!("No constructor argument named '{}'", name),
            })?;

        value
            .clone()
            .downcast::<V>()
            .map_err(|_| DIError::InvalidServiceType {
                message: format!(
                    "Constructor argument '{}' is not a {}",
                    name,
                    std::any::type_name::<V>()
                ),
            })
    }

    /// Resolve a concrete dependency, preferring a typed parameter of the same type
    pub fn resolve<T: Send + Sync + 'static>(&self) -> DIResult<Arc<T>> {
        let supplied = self.parameters.iter().find_map(|p| match p {
            Parameter::Typed { type_id, value } if *type_id == TypeId::of::<T>() => {
                value.clone().downcast::<T>().ok()
            }
            _ => None,
        });

        match supplied {
            Some(value) => Ok(value),
            None => self.context.resolve::<T>(),
        }
    }

    /// Resolve an interface dependency from the current scope
    pub fn resolve_trait<I: ?Sized + Interface + Send + Sync>(&self) -> DIResult<Arc<I>> {
        self.context.resolve_trait::<I>()
    }
}
