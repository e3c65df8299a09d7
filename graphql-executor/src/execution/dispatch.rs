use std::sync::Arc;

use futures::future::BoxFuture;

use super::ExecutionState;
use crate::context::Context;
use crate::error::ExecutionError;
use crate::json_ext::ResponsePath;
use crate::json_ext::Value;
use crate::spec::FieldType;
use crate::spec::Resolved;
use crate::spec::Selection;

impl ExecutionState {
    /// Serializes `value` according to its declared type.
    ///
    /// Objects recurse into their selections, lists into their elements,
    /// scalars are written as JSON and enum values are checked against the
    /// enum before being written as strings. A value that does not fit its
    /// declared type is a bug in the resolvers and panics.
    pub(crate) fn exec_selection_set<'a>(
        self: &'a Arc<Self>,
        context: &'a Context,
        selections: &'a [Selection],
        field_type: &'a FieldType,
        path: Option<&'a Arc<ResponsePath>>,
        value: Resolved,
        out: &'a mut Vec<u8>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let (field_type, non_null) = field_type.unwrap_non_null();

            if value.is_null() {
                if non_null {
                    self.add_execution_error(
                        ExecutionError::NonNullViolation {
                            type_name: field_type.to_string(),
                        },
                        Some(ResponsePath::to_path(path)),
                    );
                }
                out.extend_from_slice(b"null");
                return;
            }

            match field_type {
                FieldType::Object(_) | FieldType::Interface(_) | FieldType::Union(_) => {
                    let target = match value {
                        Resolved::Object(target) => target,
                        other => {
                            failfast_error!(expected = %field_type, got = ?other, "type mismatch");
                            panic!("expected an object of type {field_type}, got {other:?}")
                        }
                    };
                    self.exec_selections(context, selections, path, &target, false, out)
                        .await;
                }
                FieldType::List(element_type) => {
                    let elements = match value {
                        Resolved::List(elements) => elements,
                        other => {
                            failfast_error!(expected = %field_type, got = ?other, "type mismatch");
                            panic!("expected a list of type {field_type}, got {other:?}")
                        }
                    };
                    self.exec_list(context, selections, element_type, path, elements, out)
                        .await;
                }
                FieldType::Scalar(_) => {
                    let leaf = leaf_value(field_type, value);
                    if let Err(error) = serde_json::to_writer(&mut *out, &leaf) {
                        panic!("could not serialize {field_type} value {leaf}: {error}");
                    }
                }
                FieldType::Enum(enum_type) => {
                    let name = match leaf_value(field_type, value) {
                        Value::String(name) => name.as_str().to_string(),
                        other => other.to_string(),
                    };
                    if !enum_type.contains(&name) {
                        self.add_execution_error(
                            ExecutionError::InvalidEnumValue {
                                type_name: enum_type.name.clone(),
                                value: name,
                            },
                            Some(ResponsePath::to_path(path)),
                        );
                        out.extend_from_slice(b"null");
                        return;
                    }
                    out.push(b'"');
                    out.extend_from_slice(name.as_bytes());
                    out.push(b'"');
                }
                FieldType::NonNull(_) => {
                    panic!("nested non-null type {field_type}")
                }
            }
        })
    }
}

fn leaf_value(field_type: &FieldType, value: Resolved) -> Value {
    match value {
        Resolved::Value(value) => value,
        other => {
            failfast_error!(expected = %field_type, got = ?other, "type mismatch");
            panic!("expected a leaf value of type {field_type}, got {other:?}")
        }
    }
}
