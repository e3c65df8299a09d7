//! Types related to GraphQL responses and errors.

use std::fmt;
use std::sync::Arc;

use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;
use derivative::Derivative;
use heck::ToShoutySnakeCase;
use parking_lot::Mutex;
use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map as JsonMap;
use serde_json_bytes::Value;

use crate::json_ext::Object;
use crate::json_ext::Path;

/// The original error returned by a resolver, kept alongside the GraphQL error built from it.
pub type ResolverError = Arc<dyn std::error::Error + Send + Sync>;

/// A [GraphQL error](https://spec.graphql.org/October2021/#sec-Errors)
/// as may be found in the `errors` field of a GraphQL [`Response`].
///
/// Converted to (or from) JSON with serde.
#[derive(Clone, Derivative, Serialize, Deserialize)]
#[derivative(Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
#[non_exhaustive]
pub struct Error {
    /// The error message.
    pub message: String,

    /// If this is a field error, the JSON path to that field in [`Response::data`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Path>,

    /// The optional GraphQL extensions for this error.
    #[serde(skip_serializing_if = "Object::is_empty")]
    pub extensions: Object,

    /// The error returned by the resolver, if this error originates from one.
    #[serde(skip)]
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    pub resolver_error: Option<ResolverError>,
}

impl Default for Error {
    fn default() -> Self {
        Self {
            message: String::new(),
            path: None,
            extensions: Object::new(),
            resolver_error: None,
        }
    }
}

#[buildstructor::buildstructor]
impl Error {
    /// Returns a builder that builds a GraphQL [`Error`] from its components.
    ///
    /// Builder methods:
    ///
    /// * `.message(impl Into<`[`String`]`>)`
    ///   Required.
    ///   Sets [`Error::message`].
    ///
    /// * `.path(impl Into<`[`Path`]`>)`
    ///   Optional.
    ///   Sets [`Error::path`].
    ///
    /// * `.extensions(impl Into<`[`serde_json_bytes::Map`]`<`[`ByteString`]`, `[`Value`]`>>)`
    ///   Optional.
    ///   Sets the entire [`Error::extensions`] map, which defaults to empty.
    ///
    /// * `.extension(impl Into<`[`ByteString`]`>, impl Into<`[`Value`]`>)`
    ///   Optional, may be called multiple times.
    ///   Adds one item to the [`Error::extensions`] map.
    ///
    /// * `.extension_code(impl Into<`[`String`]`>)`
    ///   Optional.
    ///   Sets the "code" in the extension map. Will be ignored if extension already has this key
    ///   set.
    ///
    /// * `.resolver_error(impl Into<`[`ResolverError`]`>)`
    ///   Optional.
    ///   Keeps the original resolver error.
    ///
    /// * `.build()`
    ///   Finishes the builder and returns a GraphQL [`Error`].
    #[builder(visibility = "pub")]
    fn new(
        message: String,
        path: Option<Path>,
        extension_code: Option<String>,
        // Skip the `Object` type alias in order to use buildstructor's map special-casing
        mut extensions: JsonMap<ByteString, Value>,
        resolver_error: Option<ResolverError>,
    ) -> Self {
        if let Some(code) = extension_code {
            extensions
                .entry("code")
                .or_insert(Value::String(ByteString::from(code)));
        }
        Self {
            message,
            path,
            extensions,
            resolver_error,
        }
    }

    /// Extract the error code from [`Error::extensions`] as a String if it is set.
    pub fn extension_code(&self) -> Option<String> {
        self.extensions.get("code").and_then(|c| match c {
            Value::String(s) => Some(s.as_str().to_owned()),
            Value::Number(n) => Some(n.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) | Value::Bool(_) => None,
        })
    }
}

/// Displays (only) the error message.
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Trait used to get extension type from an error
pub(crate) trait ErrorExtension
where
    Self: Sized,
{
    fn extension_code(&self) -> String {
        std::any::type_name::<Self>().to_shouty_snake_case()
    }

    fn custom_extension_details(&self) -> Option<Object> {
        None
    }
}

/// The append-only error list shared by every task of a request.
#[derive(Debug, Default)]
pub(crate) struct ErrorCollector {
    errors: Mutex<Vec<Error>>,
}

impl ErrorCollector {
    pub(crate) fn push(&self, error: Error) {
        self.errors.lock().push(error);
    }

    /// Snapshot of the errors recorded so far, in insertion order.
    pub(crate) fn snapshot(&self) -> Vec<Error> {
        self.errors.lock().clone()
    }
}

/// The result of executing an operation.
///
/// `data` holds the raw serialized JSON of the response `data` entry. It is
/// returned together with the errors even when execution was cancelled or
/// timed out, in which case it contains whatever was resolved in time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Response {
    /// Serialized `data`.
    pub data: Bytes,

    /// Errors recorded while executing, in the order they happened.
    pub errors: Vec<Error>,
}

impl Response {
    /// Parses [`Response::data`] into a JSON value.
    pub fn data_value(&self) -> Result<Value, serde_json::Error> {
        if self.data.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.data)
    }

    /// Serializes the full `{"data": …, "errors": […]}` response document.
    ///
    /// `data` is spliced in as is. `errors` is omitted when there are none.
    pub fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        let mut out = BytesMut::with_capacity(self.data.len() + 16).writer();
        out.get_mut().put_slice(b"{\"data\":");
        if self.data.is_empty() {
            out.get_mut().put_slice(b"null");
        } else {
            out.get_mut().put_slice(&self.data);
        }
        if !self.errors.is_empty() {
            out.get_mut().put_slice(b",\"errors\":");
            serde_json::to_writer(&mut out, &self.errors)?;
        }
        out.get_mut().put_u8(b'}');
        Ok(out.into_inner().freeze())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::json_ext::PathElement;

    #[test]
    fn builder_sets_code_without_overriding() {
        let error = Error::builder()
            .message("boom")
            .path(Path(vec![PathElement::Key("me".to_string())]))
            .extension("code", "ALREADY_SET")
            .extension_code("IGNORED")
            .build();

        assert_eq!(error.extension_code().as_deref(), Some("ALREADY_SET"));
        assert_eq!(error.to_string(), "boom");
    }

    #[test]
    fn serializes_without_empty_members() {
        let error = Error::builder().message("no path").build();
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({ "message": "no path" })
        );

        let error = Error::builder()
            .message("with path")
            .path(Path(vec![
                PathElement::Key("list".to_string()),
                PathElement::Index(2),
            ]))
            .extension_code("SOME_CODE")
            .build();
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({
                "message": "with path",
                "path": ["list", 2],
                "extensions": { "code": "SOME_CODE" }
            })
        );
    }

    #[test]
    fn equality_ignores_resolver_error() {
        let original: ResolverError = Arc::new(std::io::Error::other("disk"));
        let with_source = Error::builder()
            .message("disk")
            .resolver_error(original)
            .build();
        let without_source = Error::builder().message("disk").build();
        assert_eq!(with_source, without_source);
        assert!(with_source.resolver_error.is_some());
    }

    #[test]
    fn response_document() {
        let response = Response {
            data: Bytes::from_static(br#"{"a":1}"#),
            errors: vec![Error::builder().message("oops").build()],
        };
        let document: serde_json::Value =
            serde_json::from_slice(&response.to_bytes().unwrap()).unwrap();
        assert_eq!(
            document,
            json!({ "data": { "a": 1 }, "errors": [{ "message": "oops" }] })
        );

        let empty = Response::default();
        assert_eq!(&empty.to_bytes().unwrap()[..], br#"{"data":null}"#);
        assert_eq!(empty.data_value().unwrap(), Value::Null);
    }

    #[test]
    fn collector_keeps_insertion_order() {
        let collector = ErrorCollector::default();
        collector.push(Error::builder().message("first").build());
        collector.push(Error::builder().message("second").build());
        let messages: Vec<_> = collector
            .snapshot()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["first", "second"]);
        assert_eq!(collector.snapshot().len(), 2);
    }
}
