use std::cmp::Ordering;

use crate::node::Node;
use crate::value::Value;

/// Orders two string forms the way the selector language does: plain
/// lexicographic byte order, so `"10" < "9"`.
pub fn cmp_string_forms(a: &str, b: &str) -> Ordering {
    a.cmp(b)
}

/// `found` compared against a literal, resolving ties with `equal` and
/// direction with `after`.
pub fn sorted_matches(found: &str, literal: &str, equal: bool, after: bool) -> bool {
    match cmp_string_forms(found, literal) {
        Ordering::Equal => equal,
        Ordering::Less => !after,
        Ordering::Greater => after,
    }
}

pub fn is_truthy(value: &Value) -> bool {
    value.with_node(|n| n.is_some_and(node_is_truthy))
}

pub fn node_is_truthy(node: &Node) -> bool {
    match node {
        Node::Bool(b) => *b,
        Node::String(s) => {
            let s = s.trim().to_lowercase();
            !matches!(s.as_str(), "false" | "no" | "0" | "")
        }
        Node::Int(i) => *i > 0,
        Node::UInt(u) => *u > 0,
        Node::Float(f) => *f >= 1.0,
        _ => false,
    }
}
