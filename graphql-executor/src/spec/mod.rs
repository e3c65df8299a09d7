//! The executable form of a schema and of an operation.
//!
//! Parsing, validation and planning happen upstream: the engine receives
//! selections already bound to the resolvers that will answer them.

mod field_type;
mod schema;
mod selection;

pub use field_type::EnumType;
pub use field_type::FieldType;
pub use schema::MethodCall;
pub use schema::Resolvable;
pub use schema::Resolved;
pub use schema::Schema;
pub use selection::has_async_sel;
pub use selection::FieldResolver;
pub use selection::Method;
pub use selection::Operation;
pub use selection::OperationKind;
pub use selection::SchemaField;
pub use selection::Selection;
pub use selection::TypeAssertion;
pub use selection::TypenameField;
