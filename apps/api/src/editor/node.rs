//! Persistent JSON tree backing the resume document.
//!
//! Containers sit behind `Arc`, so cloning a `Node` is O(1) and a mutation
//! only has to copy the containers on the path it touches
//! (`Arc::make_mut`). Every untouched branch stays shared with the previous
//! document, which is what lets an exporter keep reading an older snapshot
//! while the session moves on.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Node {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(Arc<str>),
    Array(Arc<Vec<Node>>),
    Object(Arc<BTreeMap<String, Node>>),
}

impl Node {
    pub fn string(s: impl AsRef<str>) -> Self {
        Node::String(Arc::from(s.as_ref()))
    }

    pub fn array(items: Vec<Node>) -> Self {
        Node::Array(Arc::new(items))
    }

    pub fn object(fields: BTreeMap<String, Node>) -> Self {
        Node::Object(Arc::new(fields))
    }

    pub fn empty_array() -> Self {
        Node::array(Vec::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Node::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Object(fields) => Some(&**fields),
            _ => None,
        }
    }

    /// Looks up a field on an object node. `None` for missing fields and
    /// for non-object nodes alike.
    pub fn field(&self, name: &str) -> Option<&Node> {
        self.as_object().and_then(|fields| fields.get(name))
    }

    /// The `id` of an entry object, if it carries a string one.
    pub fn entry_id(&self) -> Option<&str> {
        self.field("id").and_then(Node::as_str)
    }

    pub fn to_value(&self) -> Value {
        Value::from(self)
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => Node::Number(n),
            Value::String(s) => Node::String(Arc::from(s)),
            Value::Array(items) => Node::array(items.into_iter().map(Node::from).collect()),
            Value::Object(fields) => Node::object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Node::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&Node> for Value {
    fn from(node: &Node) -> Self {
        match node {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Number(n) => Value::Number(n.clone()),
            Node::String(s) => Value::String(s.to_string()),
            Node::Array(items) => Value::Array(items.iter().map(Value::from).collect()),
            Node::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::string(s)
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::String(Arc::from(s))
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Null => serializer.serialize_unit(),
            Node::Bool(b) => serializer.serialize_bool(*b),
            Node::Number(n) => n.serialize(serializer),
            Node::String(s) => serializer.serialize_str(s),
            Node::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields.iter() {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Node::from)
    }
}
