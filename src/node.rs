use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Coarse classification of a node, used by the engine instead of matching on
/// concrete container variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    String,
    Int,
    Float,
    Bool,
    Map,
    Array,
    Null,
    Unknown,
}

impl Type {
    pub fn as_str(&self) -> &'static str {
        match self {
            Type::String => "string",
            Type::Int => "int",
            Type::Float => "float",
            Type::Bool => "bool",
            Type::Map => "map",
            Type::Array => "array",
            Type::Null => "null",
            Type::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A struct-like value with a fixed, named set of fields.
///
/// Fields can be read and overwritten but never added; removing a field
/// resets it to `Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: String,
    fields: IndexMap<String, Node>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder used when declaring the record's shape.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Node>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.fields.get_mut(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Node)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One owned node of a document tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Node {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    /// Integers above `i64::MAX`.
    UInt(u64),
    Float(f64),
    String(String),
    Array(Vec<Node>),
    /// Plain map, iterated in key order.
    Map(BTreeMap<String, Node>),
    /// Map that remembers insertion order.
    OrderedMap(IndexMap<String, Node>),
    Record(Record),
    /// Marks an array slot scheduled for removal by the compaction pass.
    DeletePlaceholder,
}

impl Node {
    pub fn empty_ordered_map() -> Self {
        Node::OrderedMap(IndexMap::new())
    }

    pub fn kind(&self) -> Type {
        match self {
            Node::Null => Type::Null,
            Node::Bool(_) => Type::Bool,
            Node::Int(_) | Node::UInt(_) => Type::Int,
            Node::Float(_) => Type::Float,
            Node::String(_) => Type::String,
            Node::Array(_) => Type::Array,
            Node::Map(_) | Node::OrderedMap(_) | Node::Record(_) => Type::Map,
            Node::DeletePlaceholder => Type::Unknown,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind(), Type::Map | Type::Array)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    /// Looks up a map key or record field.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Map(m) => m.get(key),
            Node::OrderedMap(m) => m.get(key),
            Node::Record(r) => r.get(key),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        match self {
            Node::Map(m) => m.get_mut(key),
            Node::OrderedMap(m) => m.get_mut(key),
            Node::Record(r) => r.get_mut(key),
            _ => None,
        }
    }

    /// Keys of a map-shaped node in iteration order.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Node::Map(m) => m.keys().cloned().collect(),
            Node::OrderedMap(m) => m.keys().cloned().collect(),
            Node::Record(r) => r.fields().map(|(k, _)| k.clone()).collect(),
            _ => Vec::new(),
        }
    }

    /// Number of entries for containers, characters for strings.
    pub fn len(&self) -> usize {
        match self {
            Node::Array(a) => a.len(),
            Node::Map(m) => m.len(),
            Node::OrderedMap(m) => m.len(),
            Node::Record(r) => r.len(),
            Node::String(s) => s.chars().count(),
            Node::Bool(b) => usize::from(*b),
            Node::Null | Node::DeletePlaceholder => 0,
            Node::Int(_) | Node::UInt(_) | Node::Float(_) => self.to_string().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every `DeletePlaceholder` from the tree, rebuilding arrays
    /// without the marked slots. Returns whether anything was removed.
    pub fn compact(&mut self) -> bool {
        match self {
            Node::Array(items) => {
                let before = items.len();
                items.retain(|n| !matches!(n, Node::DeletePlaceholder));
                let mut changed = items.len() != before;
                for item in items.iter_mut() {
                    changed |= item.compact();
                }
                changed
            }
            Node::Map(m) => {
                let before = m.len();
                m.retain(|_, n| !matches!(n, Node::DeletePlaceholder));
                let mut changed = m.len() != before;
                for item in m.values_mut() {
                    changed |= item.compact();
                }
                changed
            }
            Node::OrderedMap(m) => {
                let before = m.len();
                m.retain(|_, n| !matches!(n, Node::DeletePlaceholder));
                let mut changed = m.len() != before;
                for item in m.values_mut() {
                    changed |= item.compact();
                }
                changed
            }
            Node::Record(r) => {
                let mut changed = false;
                for item in r.fields.values_mut() {
                    changed |= item.compact();
                }
                changed
            }
            _ => false,
        }
    }

    /// Empty container of the same shape; scalars become an empty ordered map.
    pub fn emptied(&self) -> Node {
        match self {
            Node::Array(_) => Node::Array(Vec::new()),
            Node::Map(_) => Node::Map(BTreeMap::new()),
            Node::Record(r) => {
                let mut cleared = r.clone();
                for (_, v) in cleared.fields.iter_mut() {
                    *v = Node::Null;
                }
                Node::Record(cleared)
            }
            _ => Node::empty_ordered_map(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Node::Null | Node::DeletePlaceholder => Json::Null,
            Node::Bool(b) => Json::Bool(*b),
            Node::Int(i) => Json::from(*i),
            Node::UInt(u) => Json::from(*u),
            Node::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Node::String(s) => Json::String(s.clone()),
            Node::Array(a) => Json::Array(a.iter().map(Node::to_json).collect()),
            Node::Map(m) => Json::Object(m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()),
            Node::OrderedMap(m) => {
                Json::Object(m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
            Node::Record(r) => {
                Json::Object(r.fields().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
        }
    }
}

/// The string form used by every comparison: strings are written raw,
/// containers as compact JSON.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Null => f.write_str("null"),
            Node::Bool(b) => write!(f, "{b}"),
            Node::Int(i) => write!(f, "{i}"),
            Node::UInt(u) => write!(f, "{u}"),
            Node::Float(x) => write!(f, "{x}"),
            Node::String(s) => f.write_str(s),
            Node::DeletePlaceholder => f.write_str(""),
            container => write!(f, "{}", container.to_json()),
        }
    }
}

impl From<serde_json::Value> for Node {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match value {
            Json::Null => Node::Null,
            Json::Bool(b) => Node::Bool(b),
            Json::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Node::Int(i),
                (None, Some(u)) => Node::UInt(u),
                (None, None) => Node::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Node::String(s),
            Json::Array(a) => Node::Array(a.into_iter().map(Node::from).collect()),
            Json::Object(o) => Node::OrderedMap(o.into_iter().map(|(k, v)| (k, Node::from(v))).collect()),
        }
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::String(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::String(s)
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Bool(b)
    }
}

impl From<i64> for Node {
    fn from(i: i64) -> Self {
        Node::Int(i)
    }
}

impl From<usize> for Node {
    fn from(i: usize) -> Self {
        i64::try_from(i).map_or(Node::UInt(i as u64), Node::Int)
    }
}

impl From<u64> for Node {
    fn from(u: u64) -> Self {
        i64::try_from(u).map_or(Node::UInt(u), Node::Int)
    }
}

impl From<f64> for Node {
    fn from(f: f64) -> Self {
        Node::Float(f)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::Array(items)
    }
}

impl From<Record> for Node {
    fn from(r: Record) -> Self {
        Node::Record(r)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Null | Node::DeletePlaceholder => serializer.serialize_unit(),
            Node::Bool(b) => serializer.serialize_bool(*b),
            Node::Int(i) => serializer.serialize_i64(*i),
            Node::UInt(u) => serializer.serialize_u64(*u),
            Node::Float(f) => serializer.serialize_f64(*f),
            Node::String(s) => serializer.serialize_str(s),
            Node::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::Map(m) => serialize_entries(serializer, m.len(), m.iter()),
            Node::OrderedMap(m) => serialize_entries(serializer, m.len(), m.iter()),
            Node::Record(r) => serialize_entries(serializer, r.len(), r.fields()),
        }
    }
}

fn serialize_entries<'a, S, I>(serializer: S, len: usize, entries: I) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    I: Iterator<Item = (&'a String, &'a Node)>,
{
    let mut map = serializer.serialize_map(Some(len))?;
    for (k, v) in entries {
        map.serialize_entry(k, v)?;
    }
    map.end()
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Node::from)
    }
}
