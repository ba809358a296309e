use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::errors::{EvalError, Result};
use crate::node::{Node, Type};

/// How a value was reached from its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKey {
    Property(String),
    Index(usize),
    /// The slot one past the end of an array.
    NextIndex,
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Property(p) => f.write_str(p),
            PathKey::Index(i) => write!(f, "[{i}]"),
            PathKey::NextIndex => f.write_str("[]"),
        }
    }
}

struct DocumentInner {
    root: RefCell<Node>,
    metadata: RefCell<BTreeMap<String, Node>>,
}

/// Shared handle to one document tree. Cloning the handle shares the tree.
#[derive(Clone)]
pub struct Document(Rc<DocumentInner>);

impl Document {
    pub fn new(root: Node) -> Self {
        Document(Rc::new(DocumentInner {
            root: RefCell::new(root),
            metadata: RefCell::new(BTreeMap::new()),
        }))
    }

    /// Snapshot of the whole tree.
    pub fn root(&self) -> Node {
        self.0.root.borrow().clone()
    }

    pub fn root_value(&self) -> Value {
        Value {
            doc: self.clone(),
            path: Vec::new(),
        }
    }

    pub fn metadata(&self, name: &str) -> Option<Node> {
        self.0.metadata.borrow().get(name).cloned()
    }

    pub fn set_metadata(&self, name: impl Into<String>, value: impl Into<Node>) {
        self.0.metadata.borrow_mut().insert(name.into(), value.into());
    }

    pub fn same_as(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Puts back a tree taken earlier with `root`.
    pub(crate) fn restore(&self, root: Node) {
        *self.0.root.borrow_mut() = root;
    }

    /// Second phase of a delete: rebuilds arrays without marked slots.
    pub fn compact(&self) -> bool {
        self.0.root.borrow_mut().compact()
    }

    fn with_resolved<R>(&self, path: &[PathKey], f: impl FnOnce(Option<&Node>) -> R) -> R {
        let root = self.0.root.borrow();
        let Some((last, parents)) = path.split_last() else {
            return f(Some(&root));
        };
        let Some(parent) = resolve(&root, parents) else {
            return f(None);
        };
        match (parent, last) {
            (Node::String(s), PathKey::Index(i)) => match s.chars().nth(*i) {
                Some(c) => f(Some(&Node::String(c.to_string()))),
                None => f(None),
            },
            (parent, key) => f(child(parent, key)),
        }
    }

    /// Writes `node` at `path`, walking towards the root and synthesising any
    /// container that does not exist yet.
    fn propagate(&self, path: &[PathKey], node: Node) -> Result<()> {
        let mut root = self.0.root.borrow_mut();
        let mut carried = node;
        let mut depth = path.len();
        while depth > 0 {
            let key = &path[depth - 1];
            match resolve_mut(&mut root, &path[..depth - 1]) {
                Some(container) if container.is_null() => {
                    trace!(depth, %key, "replacing null container");
                    *container = wrap(key, carried)?;
                    return Ok(());
                }
                Some(container) => {
                    trace!(depth, %key, "writing into existing container");
                    return put(container, key, carried);
                }
                None => {
                    trace!(depth, %key, "container missing, carrying up");
                    carried = wrap(key, carried)?;
                    depth -= 1;
                }
            }
        }
        *root = carried;
        Ok(())
    }

    fn mark_deleted(&self, path: &[PathKey]) -> Result<bool> {
        let mut root = self.0.root.borrow_mut();
        let Some((last, parents)) = path.split_last() else {
            let emptied = root.emptied();
            *root = emptied;
            return Ok(true);
        };
        let Some(container) = resolve_mut(&mut root, parents) else {
            return Ok(false);
        };
        match (container, last) {
            (Node::Map(m), PathKey::Property(k)) => Ok(m.remove(k).is_some()),
            (Node::OrderedMap(m), PathKey::Property(k)) => Ok(m.shift_remove(k).is_some()),
            (Node::Record(r), PathKey::Property(k)) => match r.get_mut(k) {
                Some(field) => {
                    *field = Node::Null;
                    Ok(true)
                }
                None => Ok(false),
            },
            (Node::Array(items), PathKey::Index(i)) => match items.get_mut(*i) {
                Some(slot) if !matches!(slot, Node::DeletePlaceholder) => {
                    *slot = Node::DeletePlaceholder;
                    Ok(true)
                }
                _ => Ok(false),
            },
            (container, key) => Err(EvalError::unsupported(key.to_string(), container.kind())),
        }
    }
}

fn child<'a>(node: &'a Node, key: &PathKey) -> Option<&'a Node> {
    let found = match (node, key) {
        (Node::Array(items), PathKey::Index(i)) => items.get(*i),
        (_, PathKey::Property(p)) => node.get(p),
        _ => None,
    };
    found.filter(|n| !matches!(n, Node::DeletePlaceholder))
}

fn child_mut<'a>(node: &'a mut Node, key: &PathKey) -> Option<&'a mut Node> {
    let found = match (node, key) {
        (Node::Array(items), PathKey::Index(i)) => items.get_mut(*i),
        (node, PathKey::Property(p)) => node.get_mut(p),
        _ => None,
    };
    found.filter(|n| !matches!(n, Node::DeletePlaceholder))
}

fn resolve<'a>(root: &'a Node, path: &[PathKey]) -> Option<&'a Node> {
    path.iter().try_fold(root, |node, key| child(node, key))
}

fn resolve_mut<'a>(root: &'a mut Node, path: &[PathKey]) -> Option<&'a mut Node> {
    path.iter().try_fold(root, |node, key| child_mut(node, key))
}

/// Builds the smallest container holding `value` under `key`.
fn wrap(key: &PathKey, value: Node) -> Result<Node> {
    match key {
        PathKey::Property(p) => {
            let mut map = indexmap::IndexMap::new();
            map.insert(p.clone(), value);
            Ok(Node::OrderedMap(map))
        }
        PathKey::Index(0) | PathKey::NextIndex => Ok(Node::Array(vec![value])),
        PathKey::Index(i) => Err(EvalError::IndexNotFound(*i)),
    }
}

fn put(container: &mut Node, key: &PathKey, value: Node) -> Result<()> {
    match (container, key) {
        (Node::Map(m), PathKey::Property(p)) => {
            m.insert(p.clone(), value);
            Ok(())
        }
        (Node::OrderedMap(m), PathKey::Property(p)) => {
            m.insert(p.clone(), value);
            Ok(())
        }
        (Node::Record(r), PathKey::Property(p)) => match r.get_mut(p) {
            Some(field) => {
                *field = value;
                Ok(())
            }
            None => Err(EvalError::PropertyNotFound(p.clone())),
        },
        (Node::Array(items), PathKey::Index(i)) => {
            if *i < items.len() {
                items[*i] = value;
                Ok(())
            } else if *i == items.len() {
                items.push(value);
                Ok(())
            } else {
                Err(EvalError::IndexNotFound(*i))
            }
        }
        (Node::Array(items), PathKey::NextIndex) => {
            items.push(value);
            Ok(())
        }
        (Node::String(s), PathKey::Index(i)) => {
            let mut chars: Vec<String> = s.chars().map(String::from).collect();
            if *i < chars.len() {
                chars[*i] = value.to_string();
            } else if *i == chars.len() {
                chars.push(value.to_string());
            } else {
                return Err(EvalError::IndexNotFound(*i));
            }
            *s = chars.concat();
            Ok(())
        }
        (container, key) => Err(EvalError::unsupported(key.to_string(), container.kind())),
    }
}

/// A handle to one node: the document it lives in plus the path that reached
/// it. The node itself is looked up on demand, so a handle may point at a slot
/// that does not exist yet ("absent").
#[derive(Clone)]
pub struct Value {
    doc: Document,
    path: Vec<PathKey>,
}

pub type Values = Vec<Value>;

impl Value {
    /// Wraps a freshly built node in its own parentless document.
    pub fn new(node: impl Into<Node>) -> Self {
        Document::new(node.into()).root_value()
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn path(&self) -> &[PathKey] {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// True when `other` lives strictly below this slot in the same document.
    pub fn is_ancestor_of(&self, other: &Value) -> bool {
        self.doc.same_as(&other.doc)
            && other.path.len() > self.path.len()
            && other.path.starts_with(&self.path)
    }

    pub(crate) fn child(&self, key: PathKey) -> Value {
        let mut path = self.path.clone();
        path.push(key);
        Value {
            doc: self.doc.clone(),
            path,
        }
    }

    /// Borrows the current node, or `None` when the slot is absent.
    pub fn with_node<R>(&self, f: impl FnOnce(Option<&Node>) -> R) -> R {
        self.doc.with_resolved(&self.path, f)
    }

    pub fn node(&self) -> Option<Node> {
        self.with_node(|n| n.cloned())
    }

    /// Like `node`, with absent read as `Null`.
    pub fn to_node(&self) -> Node {
        self.node().unwrap_or_default()
    }

    pub fn exists(&self) -> bool {
        self.with_node(|n| n.is_some())
    }

    /// `Null` for absent slots as well as explicit nulls.
    pub fn is_nil(&self) -> bool {
        self.with_node(|n| n.map_or(true, Node::is_null))
    }

    pub fn kind(&self) -> Type {
        self.with_node(|n| n.map_or(Type::Null, Node::kind))
    }

    pub fn len(&self) -> usize {
        self.with_node(|n| n.map_or(0, Node::len))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The string form used by comparisons.
    pub fn to_string_form(&self) -> String {
        self.with_node(|n| n.map_or_else(|| "null".to_string(), Node::to_string))
    }

    /// The key this value was reached by; `None` for parentless literals.
    pub fn key(&self) -> Option<Node> {
        match self.path.last() {
            Some(PathKey::Property(p)) => Some(Node::String(p.clone())),
            Some(PathKey::Index(i)) => Some(Node::from(*i)),
            Some(PathKey::NextIndex) => Some(self.parent()?.with_node(|n| Node::from(n.map_or(0, Node::len)))),
            None => self.doc.metadata("key"),
        }
    }

    /// The container this value was reached from. Never owned: it is the same
    /// document addressed by a shorter path.
    pub fn parent(&self) -> Option<Value> {
        let (_, parents) = self.path.split_last()?;
        Some(Value {
            doc: self.doc.clone(),
            path: parents.to_vec(),
        })
    }

    /// Named metadata lookup: `key`, `parent`, `type`, or any document-level
    /// entry when this is a document root.
    pub fn metadata(&self, name: &str) -> Option<Value> {
        match name {
            "key" => self.key().map(Value::new),
            "parent" => self.parent(),
            "type" => Some(Value::new(self.kind().as_str())),
            other if self.is_root() => self.doc.metadata(other).map(Value::new),
            _ => None,
        }
    }

    /// Overwrites this slot. Missing intermediate containers are created on
    /// the way back to the root.
    pub fn set(&self, node: impl Into<Node>) -> Result<()> {
        self.doc.propagate(&self.path, node.into())
    }

    /// First phase of a delete: map keys are removed directly, array slots are
    /// only marked. Call `Document::compact` once every target is marked.
    /// Returns false when the slot was already gone.
    pub fn mark_deleted(&self) -> Result<bool> {
        self.doc.mark_deleted(&self.path)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("path", &self.path)
            .field("node", &self.node())
            .finish()
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::new(node)
    }
}
