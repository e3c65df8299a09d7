use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::json_ext::Object;
use crate::spec::FieldType;
use crate::spec::Resolved;

pub(crate) const TYPENAME: &str = "__typename";

/// The kind of a GraphQL operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    #[default]
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated operation with its selections already planned against the resolvers.
#[derive(Clone, Debug, Default)]
pub struct Operation {
    pub name: Option<String>,
    pub kind: OperationKind,
    pub selections: Vec<Selection>,
}

#[buildstructor::buildstructor]
impl Operation {
    #[builder(visibility = "pub")]
    fn new(name: Option<String>, kind: Option<OperationKind>, selections: Vec<Selection>) -> Self {
        Self {
            name,
            kind: kind.unwrap_or_default(),
            selections,
        }
    }
}

/// One element of a selection set.
#[derive(Clone, Debug)]
pub enum Selection {
    /// A field resolved by a resolver.
    Field(Arc<SchemaField>),
    /// A `__typename` meta field.
    Typename(Arc<TypenameField>),
    /// Selections that only apply when the current value is of a given concrete type.
    TypeAssertion(Arc<TypeAssertion>),
}

impl From<SchemaField> for Selection {
    fn from(field: SchemaField) -> Self {
        Selection::Field(Arc::new(field))
    }
}

impl From<TypenameField> for Selection {
    fn from(field: TypenameField) -> Self {
        Selection::Typename(Arc::new(field))
    }
}

impl From<TypeAssertion> for Selection {
    fn from(assertion: TypeAssertion) -> Self {
        Selection::TypeAssertion(Arc::new(assertion))
    }
}

/// A method to invoke on the parent value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Method {
    pub name: String,
    /// The method receives the request context.
    pub has_context: bool,
    /// The method receives the field arguments.
    pub has_args: bool,
    /// The method may fail. An infallible method that still returns an error is a bug
    /// in the resolver and is reported as a panic.
    pub has_error: bool,
}

impl Method {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            has_context: false,
            has_args: false,
            has_error: false,
        }
    }

    pub fn with_context(mut self) -> Self {
        self.has_context = true;
        self
    }

    pub fn with_args(mut self) -> Self {
        self.has_args = true;
        self
    }

    pub fn with_error(mut self) -> Self {
        self.has_error = true;
        self
    }

    /// Methods that only read their receiver never need their own task.
    pub fn is_trivial(&self) -> bool {
        !(self.has_context || self.has_args || self.has_error)
    }
}

/// How the value of a field is obtained from its parent.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldResolver {
    /// Read the structural field at this index.
    Field(usize),
    /// Call a method.
    Method(Method),
}

/// A field of an object type, as selected by the operation.
#[derive(Clone, Debug)]
pub struct SchemaField {
    pub name: String,
    /// Key of the field in the response object.
    pub alias: String,
    /// The object type owning the field.
    pub type_name: String,
    pub field_type: FieldType,
    pub resolver: FieldResolver,
    pub arguments: Object,
    pub trace_label: String,
    /// Worth a task of its own: the resolver may block, or something below it does.
    pub is_async: bool,
    /// Bypasses resolution entirely.
    pub fixed_result: Option<Resolved>,
    pub selections: Vec<Selection>,
}

#[buildstructor::buildstructor]
impl SchemaField {
    #[builder(visibility = "pub")]
    #[allow(clippy::too_many_arguments)]
    fn new(
        name: String,
        type_name: String,
        field_type: FieldType,
        resolver: FieldResolver,
        alias: Option<String>,
        arguments: Option<Object>,
        trace_label: Option<String>,
        is_async: Option<bool>,
        fixed_result: Option<Resolved>,
        selections: Vec<Selection>,
    ) -> Self {
        let is_async = is_async.unwrap_or_else(|| {
            let blocking = match &resolver {
                FieldResolver::Field(_) => false,
                FieldResolver::Method(method) => !method.is_trivial(),
            };
            blocking || has_async_sel(&selections)
        });
        Self {
            alias: alias.unwrap_or_else(|| name.clone()),
            trace_label: trace_label
                .unwrap_or_else(|| format!("GraphQL field: {type_name}.{name}")),
            name,
            type_name,
            field_type,
            resolver,
            arguments: arguments.unwrap_or_default(),
            is_async,
            fixed_result,
            selections,
        }
    }

    /// The field that answers `__typename` with a name already known.
    pub(crate) fn typename(alias: &str, type_name: &str, resolved: String) -> Self {
        Self {
            name: TYPENAME.to_string(),
            alias: alias.to_string(),
            type_name: type_name.to_string(),
            field_type: FieldType::scalar("String").non_null(),
            resolver: FieldResolver::Field(0),
            arguments: Object::new(),
            trace_label: format!("GraphQL field: {type_name}.{TYPENAME}"),
            is_async: false,
            fixed_result: Some(Resolved::value(resolved)),
            selections: Vec::new(),
        }
    }
}

/// The `__typename` meta field.
#[derive(Clone, Debug)]
pub struct TypenameField {
    pub alias: String,
    /// Answered when the value is none of the asserted types.
    pub name: String,
    /// Concrete types to try, in order. The first the value can be viewed as names it.
    pub type_assertions: Vec<String>,
}

impl TypenameField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            alias: TYPENAME.to_string(),
            name: name.into(),
            type_assertions: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn with_type_assertions(
        mut self,
        type_names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.type_assertions = type_names.into_iter().map(Into::into).collect();
        self
    }
}

/// Selections restricted to one concrete type, as produced by fragments on
/// interfaces and unions.
#[derive(Clone, Debug)]
pub struct TypeAssertion {
    pub type_name: String,
    pub selections: Vec<Selection>,
}

impl TypeAssertion {
    pub fn new(type_name: impl Into<String>, selections: Vec<Selection>) -> Self {
        Self {
            type_name: type_name.into(),
            selections,
        }
    }
}

/// Whether anything in `selections`, including nested type assertions, wants its own task.
pub fn has_async_sel(selections: &[Selection]) -> bool {
    selections.iter().any(|selection| match selection {
        Selection::Field(field) => field.is_async,
        Selection::Typename(_) => false,
        Selection::TypeAssertion(assertion) => has_async_sel(&assertion.selections),
    })
}
