//! Error types for interception

use ricecoder_di::DIError;

/// Errors raised while configuring or applying interception
#[derive(Debug, thiserror::Error)]
pub enum InterceptionError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error(
        "The component registration '{registration}' can only be configured to use interface \
         interception if it provides services only by accessible interfaces. Offending services: {services}"
    )]
    InapplicableTarget {
        registration: String,
        services: String,
    },

    #[error(transparent)]
    Resolution(#[from] DIError),

    #[error("Proxy generation failed: {message}")]
    ProxyGeneration { message: String },

    #[error("{interface}::{method} has no target; an interceptor must set the return value without proceeding")]
    NoTarget { interface: String, method: String },

    #[error("Argument {index} of {method} is not a {expected}")]
    ArgumentMismatch {
        method: String,
        index: usize,
        expected: String,
    },

    #[error("Return value of {method} is not a {expected}")]
    ReturnValueMismatch { method: String, expected: String },
}

pub type InterceptionResult<T> = Result<T, InterceptionError>;

impl From<InterceptionError> for DIError {
    fn from(error: InterceptionError) -> Self {
        match error {
            InterceptionError::Resolution(inner) => inner,
            InterceptionError::InvalidArgument { message } => DIError::InvalidArgument { message },
            inapplicable @ InterceptionError::InapplicableTarget { .. } => DIError::InvalidOperation {
                message: inapplicable.to_string(),
            },
            other => DIError::DependencyResolutionFailed {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_errors_pass_through_unchanged() {
        let original = DIError::ServiceNotRegistered {
            service_type: "Logger".to_string(),
        };
        let wrapped: InterceptionError = original.into();
        match DIError::from(wrapped) {
            DIError::ServiceNotRegistered { service_type } => assert_eq!(service_type, "Logger"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_inapplicable_target_becomes_invalid_operation() {
        let error = InterceptionError::InapplicableTarget {
            registration: "Activator = Widget".to_string(),
            services: "Widget".to_string(),
        };
        match DIError::from(error) {
            DIError::InvalidOperation { message } => {
                assert!(message.contains("Activator = Widget"));
                assert!(message.contains("Offending services: Widget"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
