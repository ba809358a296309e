use serde_json::Value as Json;

use crate::errors::Result;
use crate::node::Node;
use crate::value::{Value, Values};
use crate::Evaluator;

/// =========================
/// Public API (built-in registry)
/// =========================

/// Pure query: every matched value plus how many matched.
pub fn select(root: &Value, selector: &str) -> Result<(Values, usize)> {
    Evaluator::default().select(root, selector)
}

/// Sets every match to `new`; returns how many locations were updated.
pub fn modify(root: &Value, selector: &str, new: impl Into<Node>) -> Result<usize> {
    Evaluator::default().modify(root, selector, new)
}

/// Deletes every match with mark-then-compact.
pub fn delete(root: &Value, selector: &str) -> Result<()> {
    Evaluator::default().delete(root, selector)
}

/// =========================
/// Public API (JSON conveniences)
/// =========================

/// Parse `json_str` and run `selector` against it, returning plain JSON
/// values.
pub fn from_json(json_str: &str, selector: &str) -> Result<Vec<Json>> {
    let node: Node = serde_json::from_str(json_str)?;
    let (values, _) = select(&Value::new(node), selector)?;
    Ok(values.iter().map(|v| v.to_node().to_json()).collect())
}

/// Modify a JSON document and return the updated document.
pub fn modify_json(json_str: &str, selector: &str, new: Json) -> Result<Json> {
    let root = Value::new(serde_json::from_str::<Node>(json_str)?);
    modify(&root, selector, Node::from(new))?;
    Ok(root.document().root().to_json())
}

/// Delete from a JSON document and return the updated document.
pub fn delete_json(json_str: &str, selector: &str) -> Result<Json> {
    let root = Value::new(serde_json::from_str::<Node>(json_str)?);
    delete(&root, selector)?;
    Ok(root.document().root().to_json())
}
