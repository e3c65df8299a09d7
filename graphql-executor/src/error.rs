//! Execution errors.
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tower::BoxError;

use crate::context::ContextError;
use crate::graphql::Error;
use crate::graphql::ErrorExtension;
use crate::graphql::ResolverError;
use crate::json_ext::Object;
use crate::json_ext::Path;

/// Error types for execution.
///
/// These are not returned to the client as is, but are converted to a GraphQL
/// [`struct@Error`] at the path where they happened.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub(crate) enum ExecutionError {
    /// The request context was cancelled or timed out.
    #[error("{0}")]
    Context(#[from] ContextError),

    /// A resolver panicked.
    #[error("panic occurred: {0}")]
    Panic(String),

    /// A non-null position resolved to nothing.
    #[error("graphql: got nil for non-null \"{type_name}\"")]
    NonNullViolation {
        /// The declared type, without its non-null marker.
        type_name: String,
    },

    /// The value of an enum field is not one of the enum's values.
    #[error("Invalid value {value}.\nExpected type {type_name}, found {value}.")]
    InvalidEnumValue {
        /// The enum type.
        type_name: String,
        /// The value that was not one of the enum's values.
        value: String,
    },

    /// A field was neither resolved nor cancelled when its object was assembled.
    #[error("field resolution did not complete")]
    Incomplete,
}

impl ExecutionError {
    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        ExecutionError::Panic(panic_message(payload))
    }

    /// Convert the execution error to a GraphQL error.
    pub(crate) fn to_graphql_error(&self, path: Option<Path>, with_code: bool) -> Error {
        let mut extensions = Object::new();
        if with_code {
            extensions.insert("code", self.extension_code().into());
            if let Some(details) = self.custom_extension_details() {
                for (key, value) in details {
                    extensions.insert(key, value);
                }
            }
        }
        let mut error = Error::builder()
            .message(self.to_string())
            .extensions(extensions)
            .build();
        error.path = path;
        error
    }
}

impl ErrorExtension for ExecutionError {
    fn extension_code(&self) -> String {
        match self {
            ExecutionError::Context(ContextError::Cancelled) => "CONTEXT_CANCELLED",
            ExecutionError::Context(ContextError::DeadlineExceeded) => "DEADLINE_EXCEEDED",
            ExecutionError::Panic(_) => "RESOLVER_PANIC",
            ExecutionError::NonNullViolation { .. } => "NON_NULL_VIOLATION",
            ExecutionError::InvalidEnumValue { .. } => "INVALID_ENUM_VALUE",
            ExecutionError::Incomplete => "INCOMPLETE_FIELD",
        }
        .to_string()
    }

    fn custom_extension_details(&self) -> Option<Object> {
        let mut obj = Object::new();
        match self {
            ExecutionError::NonNullViolation { type_name } => {
                obj.insert("type", type_name.clone().into());
            }
            ExecutionError::InvalidEnumValue { type_name, value } => {
                obj.insert("type", type_name.clone().into());
                obj.insert("value", value.clone().into());
            }
            _ => (),
        }

        (!obj.is_empty()).then_some(obj)
    }
}

/// Renders a panic payload the way `{:?}`/`{}` would for the common payload types.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(error) = payload.downcast_ref::<Error>() {
        error.message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// The error a resolver returns.
///
/// Wraps the original error, which is kept on the resulting GraphQL error as
/// [`Error::resolver_error`], and optionally carries extensions to expose to
/// the client.
#[derive(Clone)]
pub struct FieldError {
    source: ResolverError,
    extensions: Option<Object>,
}

impl FieldError {
    pub fn new(error: impl Into<BoxError>) -> Self {
        let error: BoxError = error.into();
        Self {
            source: Arc::from(error),
            extensions: None,
        }
    }

    /// Attach extensions that will be copied to the GraphQL error.
    pub fn with_extensions(mut self, extensions: Object) -> Self {
        self.extensions = Some(extensions);
        self
    }

    pub fn extensions(&self) -> Option<&Object> {
        self.extensions.as_ref()
    }

    pub fn source(&self) -> &ResolverError {
        &self.source
    }

    /// Convert the resolver error to a GraphQL error at `path`, keeping the original error.
    pub(crate) fn to_graphql_error(&self, path: Path) -> Error {
        Error::builder()
            .message(self.source.to_string())
            .path(path)
            .extensions(self.extensions.clone().unwrap_or_default())
            .resolver_error(self.source.clone())
            .build()
    }
}

impl fmt::Debug for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldError")
            .field("source", &self.source.to_string())
            .field("extensions", &self.extensions)
            .finish()
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl From<BoxError> for FieldError {
    fn from(error: BoxError) -> Self {
        Self {
            source: Arc::from(error),
            extensions: None,
        }
    }
}

impl From<&str> for FieldError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for FieldError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json_bytes::json;

    use super::*;
    use crate::json_ext::PathElement;

    fn path() -> Path {
        Path(vec![PathElement::Key("user".to_string())])
    }

    #[test]
    fn messages_match_the_wire_format() {
        assert_eq!(
            ExecutionError::NonNullViolation {
                type_name: "String".to_string()
            }
            .to_string(),
            "graphql: got nil for non-null \"String\""
        );
        assert_eq!(
            ExecutionError::InvalidEnumValue {
                type_name: "Status".to_string(),
                value: "ACTIVE".to_string(),
            }
            .to_string(),
            "Invalid value ACTIVE.\nExpected type Status, found ACTIVE."
        );
        assert_eq!(
            ExecutionError::from(ContextError::DeadlineExceeded).to_string(),
            "context deadline exceeded"
        );
        assert_eq!(
            ExecutionError::Panic("boom".to_string()).to_string(),
            "panic occurred: boom"
        );
    }

    #[test]
    fn codes_are_opt_in() {
        let error = ExecutionError::InvalidEnumValue {
            type_name: "Status".to_string(),
            value: "ACTIVE".to_string(),
        };
        assert!(error.to_graphql_error(Some(path()), false).extensions.is_empty());

        let with_code = error.to_graphql_error(Some(path()), true);
        assert_eq!(
            with_code.extension_code().as_deref(),
            Some("INVALID_ENUM_VALUE")
        );
        assert_eq!(with_code.extensions.get("value"), Some(&json!("ACTIVE")));
        assert_eq!(with_code.path, Some(path()));
    }

    #[test]
    fn panic_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "Box<dyn Any>");
    }

    #[test]
    fn field_error_keeps_source_and_extensions() {
        let mut extensions = Object::new();
        extensions.insert("code", "NOT_FOUND".into());
        let error = FieldError::new("user not found").with_extensions(extensions);

        let graphql_error = error.to_graphql_error(path());
        assert_eq!(graphql_error.message, "user not found");
        assert_eq!(graphql_error.extension_code().as_deref(), Some("NOT_FOUND"));
        assert_eq!(
            graphql_error
                .resolver_error
                .as_ref()
                .map(|source| source.to_string())
                .as_deref(),
            Some("user not found")
        );
    }
}
