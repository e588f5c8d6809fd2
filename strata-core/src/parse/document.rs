use std::fmt::{self, Debug, Display};

use by_address::ByAddress;
use serde_json::{Map, Value};

use crate::error::SerdeError;

use super::error::InputError;

/// The longest chain of `$ref`s we'll follow before assuming a cycle.
const MAX_REF_DEPTH: usize = 32;

/// A parsed input tree.
///
/// Nodes that are shared, or that participate in cycles, are written
/// once and referenced elsewhere as `{"$ref": "#/json/pointer"}`.
/// Following a reference always lands on the same [`Value`], so a
/// node's identity is its address in this tree.
#[derive(Debug)]
pub struct Document {
    root: Value,
}

impl Document {
    /// Parses an input tree from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, SerdeError> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml);
        let root = serde_path_to_error::deserialize(deserializer)?;
        Ok(Self { root })
    }

    /// Parses an input tree from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SerdeError> {
        let mut deserializer = serde_json::Deserializer::from_str(json);
        let root = serde_path_to_error::deserialize(&mut deserializer)?;
        deserializer.end()?;
        Ok(Self { root })
    }

    #[inline]
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// Returns the root node of the tree.
    pub fn root(&self) -> Node<'_> {
        Node {
            doc: self,
            value: &self.root,
        }
    }

    fn pointer(&self, reference: &str) -> Result<&Value, InputError> {
        let pointer = reference
            .strip_prefix('#')
            .ok_or_else(|| InputError::DanglingRef(reference.to_owned()))?;
        self.root
            .pointer(pointer)
            .ok_or_else(|| InputError::DanglingRef(reference.to_owned()))
    }
}

/// The identity of a node in a [`Document`].
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct NodeId<'a>(ByAddress<&'a Value>);

impl Debug for NodeId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({:p})", self.0.0)
    }
}

impl Display for NodeId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {:p}", self.0.0)
    }
}

/// A resolved node in a [`Document`].
///
/// A `Node` never refers to a `$ref` object: every accessor that
/// returns a child follows references first.
#[derive(Clone, Copy)]
pub struct Node<'a> {
    doc: &'a Document,
    value: &'a Value,
}

impl<'a> Node<'a> {
    #[inline]
    pub fn id(self) -> NodeId<'a> {
        NodeId(ByAddress(self.value))
    }

    #[inline]
    pub fn value(self) -> &'a Value {
        self.value
    }

    /// Returns a short human-readable label for this node,
    /// for error messages.
    pub fn describe(self) -> String {
        let object = self.value.as_object();
        let name = object
            .and_then(|o| o.get("name"))
            .and_then(Value::as_str)
            .or_else(|| {
                object
                    .and_then(|o| o.get("className"))
                    .and_then(Value::as_str)
            });
        let kind = object
            .and_then(|o| o.get("type"))
            .and_then(Value::as_str);
        match (kind, name) {
            (Some(kind), Some(name)) => format!("{kind} `{name}`"),
            (None, Some(name)) => format!("`{name}`"),
            (Some(kind), None) => format!("anonymous {kind}"),
            (None, None) => self.id().to_string(),
        }
    }

    /// Returns the child at `key`, following references,
    /// or `None` if this node has no such field.
    pub fn get(self, key: &str) -> Result<Option<Node<'a>>, InputError> {
        match self.object()?.get(key) {
            Some(Value::Null) | None => Ok(None),
            Some(value) => self.child(value).map(Some),
        }
    }

    /// Returns the child at `key`, following references.
    pub fn field(self, key: &str) -> Result<Node<'a>, InputError> {
        self.get(key)?.ok_or_else(|| self.missing(key))
    }

    /// Returns the string at `key`, if present.
    pub fn str(self, key: &str) -> Result<Option<&'a str>, InputError> {
        self.get(key)?
            .map(|node| {
                node.value
                    .as_str()
                    .ok_or_else(|| self.wrong_type(key, "a string"))
            })
            .transpose()
    }

    pub fn required_str(self, key: &str) -> Result<&'a str, InputError> {
        self.str(key)?.ok_or_else(|| self.missing(key))
    }

    /// Returns the boolean at `key`, or `false` if absent.
    pub fn flag(self, key: &str) -> Result<bool, InputError> {
        self.get(key)?
            .map(|node| {
                node.value
                    .as_bool()
                    .ok_or_else(|| self.wrong_type(key, "a boolean"))
            })
            .transpose()
            .map(|flag| flag.unwrap_or(false))
    }

    pub fn u64(self, key: &str) -> Result<Option<u64>, InputError> {
        self.get(key)?
            .map(|node| {
                node.value
                    .as_u64()
                    .ok_or_else(|| self.wrong_type(key, "a non-negative integer"))
            })
            .transpose()
    }

    /// Returns the resolved elements of the array at `key`, or
    /// an empty list if absent.
    pub fn items(self, key: &str) -> Result<Vec<Node<'a>>, InputError> {
        let Some(node) = self.get(key)? else {
            return Ok(vec![]);
        };
        let items = node
            .value
            .as_array()
            .ok_or_else(|| self.wrong_type(key, "an array"))?;
        items.iter().map(|item| self.child(item)).collect()
    }

    /// Returns the strings in the array at `key`, or
    /// an empty list if absent.
    pub fn strings(self, key: &str) -> Result<Vec<&'a str>, InputError> {
        self.items(key)?
            .into_iter()
            .map(|item| {
                item.value
                    .as_str()
                    .ok_or_else(|| self.wrong_type(key, "an array of strings"))
            })
            .collect()
    }

    /// Returns the resolved entries of the mapping at `key`, in
    /// declaration order, or an empty list if absent.
    pub fn entries(self, key: &str) -> Result<Vec<(&'a str, Node<'a>)>, InputError> {
        let Some(node) = self.get(key)? else {
            return Ok(vec![]);
        };
        let entries = node
            .value
            .as_object()
            .ok_or_else(|| self.wrong_type(key, "a mapping"))?;
        entries
            .iter()
            .map(|(key, value)| Ok((key.as_str(), self.child(value)?)))
            .collect()
    }

    fn object(self) -> Result<&'a Map<String, Value>, InputError> {
        self.value.as_object().ok_or_else(|| InputError::WrongType {
            node: self.describe(),
            field: String::new(),
            expected: "a mapping",
        })
    }

    /// Wraps `value` as a node, following any chain of references.
    fn child(self, mut value: &'a Value) -> Result<Node<'a>, InputError> {
        for _ in 0..MAX_REF_DEPTH {
            match reference(value) {
                Some(reference) => value = self.doc.pointer(reference)?,
                None => {
                    return Ok(Node {
                        doc: self.doc,
                        value,
                    });
                }
            }
        }
        Err(InputError::RefCycle(
            reference(value).unwrap_or_default().to_owned(),
        ))
    }

    fn missing(self, key: &str) -> InputError {
        InputError::MissingField {
            node: self.describe(),
            field: key.to_owned(),
        }
    }

    fn wrong_type(self, key: &str, expected: &'static str) -> InputError {
        InputError::WrongType {
            node: self.describe(),
            field: key.to_owned(),
            expected,
        }
    }
}

impl Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Node").field(&self.describe()).finish()
    }
}

fn reference(value: &Value) -> Option<&str> {
    match value {
        Value::Object(object) if object.len() == 1 => object.get("$ref")?.as_str(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use indoc::indoc;

    use crate::tests::assert_matches;

    #[test]
    fn test_follows_references_to_the_same_node() {
        let doc = Document::from_yaml(indoc! {"
            types:
              - type: string
              - type: list
                elementType:
                  $ref: '#/types/0'
        "})
        .unwrap();
        let types = doc.root().items("types").unwrap();
        let element = types[1].field("elementType").unwrap();
        assert_eq!(element.id(), types[0].id());
    }

    #[test]
    fn test_follows_chains_of_references() {
        let doc = Document::from_yaml(indoc! {"
            a:
              $ref: '#/b'
            b:
              $ref: '#/c'
            c:
              type: string
        "})
        .unwrap();
        let root = doc.root();
        assert_eq!(root.field("a").unwrap().id(), root.field("c").unwrap().id());
    }

    #[test]
    fn test_dangling_reference() {
        let doc = Document::from_yaml(indoc! {"
            a:
              $ref: '#/nowhere'
        "})
        .unwrap();
        assert_matches!(
            doc.root().field("a"),
            Err(InputError::DanglingRef(reference)) if reference == "#/nowhere",
        );
    }

    #[test]
    fn test_reference_cycle() {
        let doc = Document::from_yaml(indoc! {"
            a:
              $ref: '#/b'
            b:
              $ref: '#/a'
        "})
        .unwrap();
        assert_matches!(doc.root().field("a"), Err(InputError::RefCycle(_)));
    }

    #[test]
    fn test_missing_field_names_the_node() {
        let doc = Document::from_yaml(indoc! {"
            name: Widget
            type: model
        "})
        .unwrap();
        let err = doc.root().required_str("description").unwrap_err();
        assert_eq!(
            err.to_string(),
            "model `Widget` is missing required field `description`",
        );
    }

    #[test]
    fn test_from_json() {
        let doc = Document::from_json(r#"{"namespace": "contoso", "types": []}"#).unwrap();
        assert_eq!(doc.root().str("namespace").unwrap(), Some("contoso"));
        assert!(doc.root().items("types").unwrap().is_empty());
    }
}
