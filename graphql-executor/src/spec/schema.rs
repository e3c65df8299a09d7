use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::FieldError;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::spec::Method;

/// What a method resolver receives.
#[derive(Clone, Debug, Default)]
pub struct MethodCall {
    /// Set when the method declares it takes the request context.
    pub context: Option<Context>,
    /// Set when the method declares it takes arguments.
    pub arguments: Option<Object>,
}

/// A value of the resolver graph.
///
/// Every object the engine walks through implements this trait: it exposes
/// the fields of its type either as methods or as plain structural reads, and
/// tells which concrete types it can be viewed as.
#[async_trait]
pub trait Resolvable: Send + Sync + 'static {
    /// Invokes a resolver method.
    async fn call(&self, method: &Method, call: MethodCall) -> Result<Resolved, FieldError>;

    /// Reads the field stored at `index`.
    fn field(&self, index: usize) -> Resolved;

    /// Views this value as the concrete type `type_name`, if it is one.
    fn assert_type(&self, _type_name: &str) -> Option<Arc<dyn Resolvable>> {
        None
    }
}

/// What a field resolved to.
#[derive(Clone, Default)]
pub enum Resolved {
    /// Nothing.
    #[default]
    Null,
    /// A leaf: a scalar, or the name of an enum value.
    Value(Value),
    /// An object to run the sub-selections against.
    Object(Arc<dyn Resolvable>),
    /// The elements of a list.
    List(Vec<Resolved>),
}

impl Resolved {
    pub fn value(value: impl Into<Value>) -> Self {
        Resolved::Value(value.into())
    }

    pub fn object(object: impl Resolvable) -> Self {
        Resolved::Object(Arc::new(object))
    }

    pub fn list(items: impl IntoIterator<Item = Resolved>) -> Self {
        Resolved::List(items.into_iter().collect())
    }

    /// Both the absent value and a JSON `null` count as nothing.
    pub fn is_null(&self) -> bool {
        matches!(self, Resolved::Null | Resolved::Value(Value::Null))
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Null => write!(f, "Null"),
            Resolved::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Resolved::Object(_) => write!(f, "Object(..)"),
            Resolved::List(items) => f.debug_tuple("List").field(items).finish(),
        }
    }
}

impl<T: Into<Resolved>> From<Option<T>> for Resolved {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

impl From<Value> for Resolved {
    fn from(value: Value) -> Self {
        Resolved::Value(value)
    }
}

impl From<Arc<dyn Resolvable>> for Resolved {
    fn from(object: Arc<dyn Resolvable>) -> Self {
        Resolved::Object(object)
    }
}

impl From<Vec<Resolved>> for Resolved {
    fn from(items: Vec<Resolved>) -> Self {
        Resolved::List(items)
    }
}

/// The executable schema: the root of the resolver graph.
#[derive(Clone)]
pub struct Schema {
    root: Arc<dyn Resolvable>,
}

impl Schema {
    pub fn new(root: impl Resolvable) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    pub fn from_arc(root: Arc<dyn Resolvable>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Arc<dyn Resolvable> {
        &self.root
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema").finish_non_exhaustive()
    }
}
