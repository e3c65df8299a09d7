//! JSON values and response paths.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
pub use serde_json_bytes::Value;

/// A JSON object.
pub type Object = Map<ByteString, Value>;

/// A GraphQL path element that is composed of strings or numbers.
/// e.g `/book/3/name`
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    /// An index path element.
    Index(usize),

    /// A key path element.
    Key(String),
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Index(index) => write!(f, "{index}"),
            PathElement::Key(key) => write!(f, "{key}"),
        }
    }
}

impl From<&str> for PathElement {
    fn from(key: &str) -> Self {
        PathElement::Key(key.to_string())
    }
}

impl From<usize> for PathElement {
    fn from(index: usize) -> Self {
        PathElement::Index(index)
    }
}

/// A path into the response `data`, from the root to a leaf.
///
/// Serialized as the mixed string/integer array GraphQL uses for the `path`
/// of an error.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(pub Vec<PathElement>);

impl Path {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, element: PathElement) {
        self.0.push(element)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.0 {
            write!(f, "/{element}")?;
        }
        Ok(())
    }
}

/// A node of the reverse-linked chain describing where execution currently is.
///
/// Every field and list element executed below a point of the tree shares
/// the chain up to that point. The chain is only flattened into a [`Path`]
/// when an error has to be reported.
#[derive(Clone, Debug)]
pub(crate) struct ResponsePath {
    parent: Option<Arc<ResponsePath>>,
    value: PathElement,
}

impl ResponsePath {
    pub(crate) fn child(
        parent: Option<&Arc<ResponsePath>>,
        value: impl Into<PathElement>,
    ) -> Arc<ResponsePath> {
        Arc::new(ResponsePath {
            parent: parent.cloned(),
            value: value.into(),
        })
    }

    /// Flattens the chain, root first.
    pub(crate) fn to_path(path: Option<&Arc<ResponsePath>>) -> Path {
        let mut elements = Vec::new();
        let mut current = path;
        while let Some(segment) = current {
            elements.push(segment.value.clone());
            current = segment.parent.as_ref();
        }
        elements.reverse();
        Path(elements)
    }

    /// Flattens the chain and appends one more element.
    pub(crate) fn to_path_with(
        path: Option<&Arc<ResponsePath>>,
        value: impl Into<PathElement>,
    ) -> Path {
        let mut path = Self::to_path(path);
        path.push(value.into());
        path
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn flattens_root_first() {
        let root = ResponsePath::child(None, "hero");
        let friends = ResponsePath::child(Some(&root), "friends");
        let second = ResponsePath::child(Some(&friends), 1usize);
        let name = ResponsePath::child(Some(&second), "name");

        assert_eq!(
            ResponsePath::to_path(Some(&name)),
            Path(vec![
                PathElement::Key("hero".to_string()),
                PathElement::Key("friends".to_string()),
                PathElement::Index(1),
                PathElement::Key("name".to_string()),
            ])
        );
        // the parent chain is shared, not copied
        assert_eq!(ResponsePath::to_path(Some(&friends)).len(), 2);
    }

    #[test]
    fn empty_chain_is_empty_path() {
        assert!(ResponsePath::to_path(None).is_empty());
        assert_eq!(
            ResponsePath::to_path_with(None, "me"),
            Path(vec![PathElement::Key("me".to_string())])
        );
    }

    #[test]
    fn serializes_as_mixed_array() {
        let path = Path(vec![
            PathElement::Key("users".to_string()),
            PathElement::Index(3),
            PathElement::Key("email".to_string()),
        ]);
        assert_eq!(
            serde_json::to_value(&path).unwrap(),
            json!(["users", 3, "email"])
        );
        assert_eq!(path.to_string(), "/users/3/email");

        let parsed: Path = serde_json::from_value(json!(["users", 3, "email"])).unwrap();
        assert_eq!(parsed, path);
    }
}
