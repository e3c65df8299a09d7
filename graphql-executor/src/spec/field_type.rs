use std::fmt;
use std::sync::Arc;

/// An enum type and the names of its values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<String>,
}

impl EnumType {
    pub fn new(
        name: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

/// The declared output type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Scalar type {0}
    Scalar(String),
    /// Enum type
    Enum(Arc<EnumType>),
    /// Object type {0}
    Object(String),
    /// Interface type {0}
    Interface(String),
    /// Union type {0}
    Union(String),
    /// List type {0}
    List(Box<FieldType>),
    /// Non null type {0}
    NonNull(Box<FieldType>),
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(ty)
            | FieldType::Object(ty)
            | FieldType::Interface(ty)
            | FieldType::Union(ty) => write!(f, "{ty}"),
            FieldType::Enum(ty) => write!(f, "{}", ty.name),
            FieldType::List(ty) => write!(f, "[{ty}]"),
            FieldType::NonNull(ty) => write!(f, "{ty}!"),
        }
    }
}

impl FieldType {
    pub fn scalar(name: impl Into<String>) -> Self {
        FieldType::Scalar(name.into())
    }

    pub fn object(name: impl Into<String>) -> Self {
        FieldType::Object(name.into())
    }

    pub fn interface(name: impl Into<String>) -> Self {
        FieldType::Interface(name.into())
    }

    pub fn union(name: impl Into<String>) -> Self {
        FieldType::Union(name.into())
    }

    pub fn enumeration(ty: EnumType) -> Self {
        FieldType::Enum(Arc::new(ty))
    }

    pub fn list(of: FieldType) -> Self {
        FieldType::List(Box::new(of))
    }

    /// Wraps this type in a non-null marker.
    pub fn non_null(self) -> Self {
        FieldType::NonNull(Box::new(self))
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, FieldType::NonNull(_))
    }

    /// Removes one non-null layer, and tells whether there was one.
    pub fn unwrap_non_null(&self) -> (&FieldType, bool) {
        match self {
            FieldType::NonNull(inner) => (inner, true),
            _ => (self, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_like_sdl() {
        let ty = FieldType::list(FieldType::object("User").non_null()).non_null();
        assert_eq!(ty.to_string(), "[User!]!");

        let status = FieldType::enumeration(EnumType::new("Status", ["ON", "OFF"]));
        assert_eq!(status.to_string(), "Status");
    }

    #[test]
    fn unwraps_a_single_layer() {
        let ty = FieldType::scalar("Int").non_null();
        let (inner, non_null) = ty.unwrap_non_null();
        assert!(non_null);
        assert_eq!(inner, &FieldType::scalar("Int"));

        let (same, non_null) = inner.unwrap_non_null();
        assert!(!non_null);
        assert_eq!(same, inner);
    }

    #[test]
    fn enum_membership() {
        let status = EnumType::new("Status", ["ENABLED", "DISABLED"]);
        assert!(status.contains("ENABLED"));
        assert!(!status.contains("ACTIVE"));
    }
}
