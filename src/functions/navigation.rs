use tracing::trace;

use super::{Arity, Function};
use crate::context::{Context, Step};
use crate::errors::{EvalError, Result};
use crate::node::{Node, Type};
use crate::parser::unescape;
use crate::value::{PathKey, Value, Values};

/// Splits a trailing `?`, which turns a miss into a silent skip. An escaped
/// `\?` is part of the name.
fn optional(arg: &str) -> (&str, bool) {
    match arg.strip_suffix('?') {
        Some(stripped) if stripped.chars().rev().take_while(|c| *c == '\\').count() % 2 == 0 => {
            (stripped, true)
        }
        _ => (arg, false),
    }
}

/// In create mode, absent and null inputs become `empty` before navigation.
fn materialise(ctx: &Context, inputs: &[Value], empty: fn() -> Node) -> Result<()> {
    if !ctx.create_when_missing() {
        return Ok(());
    }
    for input in inputs.iter().filter(|v| v.is_nil()) {
        trace!(path = ?input.path(), "materialising missing container");
        input.set(empty())?;
    }
    Ok(())
}

fn require_present(input: &Value, selector: &str) -> Result<()> {
    if input.exists() {
        Ok(())
    } else {
        Err(EvalError::UnexpectedPreviousNilValue(selector.to_string()))
    }
}

pub struct Property;
impl Function for Property {
    fn name(&self) -> &'static str {
        "property"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values> {
        let inputs = ctx.inputs(step);
        materialise(ctx, inputs, Node::empty_ordered_map)?;

        let mut out = Vec::new();
        for input in inputs {
            require_present(input, "property")?;
            match input.kind() {
                Type::Map => {}
                other => return Err(EvalError::unsupported("property", other)),
            }
            // Records have a fixed field set, so create mode cannot add to them.
            let is_record = input.with_node(|n| matches!(n, Some(Node::Record(_))));
            for arg in args {
                let (name, is_optional) = optional(arg);
                let name = unescape(name);
                let child = input.child(PathKey::Property(name.clone()));
                if child.exists() {
                    out.push(child);
                } else if is_optional {
                    continue;
                } else if ctx.create_when_missing() && !is_record {
                    out.push(child);
                } else {
                    return Err(EvalError::PropertyNotFound(name));
                }
            }
        }
        Ok(out)
    }
}

pub struct Index;
impl Function for Index {
    fn name(&self) -> &'static str {
        "index"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values> {
        let inputs = ctx.inputs(step);
        materialise(ctx, inputs, || Node::Array(Vec::new()))?;

        let mut out = Vec::new();
        for input in inputs {
            for arg in args {
                let (raw, is_optional) = optional(arg);
                let index: usize = match raw.parse() {
                    Ok(i) => i,
                    Err(_) if is_optional => continue,
                    Err(_) => return Err(EvalError::InvalidIndex(arg.clone())),
                };
                require_present(input, arg)?;
                let len = input.len();
                let addressable = match input.kind() {
                    Type::Array => index < len || (ctx.create_when_missing() && index == len),
                    Type::String => index < len,
                    other => return Err(EvalError::unsupported("index", other)),
                };
                if addressable {
                    out.push(input.child(PathKey::Index(index)));
                } else if !is_optional {
                    return Err(EvalError::IndexNotFound(index));
                }
            }
        }
        Ok(out)
    }
}

pub struct All;
impl Function for All {
    fn name(&self) -> &'static str {
        "all"
    }
    fn arity(&self) -> Arity {
        Arity::none()
    }
    fn call(&self, ctx: &Context, step: &Step, _args: &[String]) -> Result<Values> {
        let mut out = Vec::new();
        for input in ctx.inputs(step) {
            out.extend(children(input, "all")?);
        }
        Ok(out)
    }
}

/// One value per entry of a container, or per character of a string.
pub(crate) fn children(input: &Value, selector: &str) -> Result<Values> {
    input.with_node(|node| match node {
        Some(node @ (Node::Map(_) | Node::OrderedMap(_) | Node::Record(_))) => Ok(node
            .keys()
            .into_iter()
            .map(|k| input.child(PathKey::Property(k)))
            .collect()),
        Some(Node::Array(items)) => Ok((0..items.len())
            .map(|i| input.child(PathKey::Index(i)))
            .collect()),
        Some(Node::String(s)) => Ok((0..s.chars().count())
            .map(|i| input.child(PathKey::Index(i)))
            .collect()),
        Some(other) => Err(EvalError::unsupported(selector, other.kind())),
        None => Err(EvalError::UnexpectedPreviousNilValue(selector.to_string())),
    })
}

pub struct First;
impl Function for First {
    fn name(&self) -> &'static str {
        "first"
    }
    fn arity(&self) -> Arity {
        Arity::none()
    }
    fn call(&self, ctx: &Context, step: &Step, _args: &[String]) -> Result<Values> {
        ctx.inputs(step)
            .iter()
            .map(|input| match input.kind() {
                Type::Array if !input.is_empty() => Ok(input.child(PathKey::Index(0))),
                Type::Array => Err(EvalError::IndexNotFound(0)),
                other => Err(EvalError::unsupported("first", other)),
            })
            .collect()
    }
}

pub struct Last;
impl Function for Last {
    fn name(&self) -> &'static str {
        "last"
    }
    fn arity(&self) -> Arity {
        Arity::none()
    }
    fn call(&self, ctx: &Context, step: &Step, _args: &[String]) -> Result<Values> {
        ctx.inputs(step)
            .iter()
            .map(|input| match (input.kind(), input.len()) {
                (Type::Array, 0) => Err(EvalError::IndexNotFound(0)),
                (Type::Array, len) => Ok(input.child(PathKey::Index(len - 1))),
                (other, _) => Err(EvalError::unsupported("last", other)),
            })
            .collect()
    }
}

/// Pushes a `null` slot onto every array input and selects it.
pub struct Append;
impl Function for Append {
    fn name(&self) -> &'static str {
        "append"
    }
    fn arity(&self) -> Arity {
        Arity::none()
    }
    fn call(&self, ctx: &Context, step: &Step, _args: &[String]) -> Result<Values> {
        let inputs = ctx.inputs(step);
        materialise(ctx, inputs, || Node::Array(Vec::new()))?;

        let mut out = Vec::new();
        for input in inputs {
            match input.kind() {
                Type::Array => {
                    let len = input.len();
                    input.child(PathKey::NextIndex).set(Node::Null)?;
                    out.push(input.child(PathKey::Index(len)));
                }
                other => return Err(EvalError::unsupported("append", other)),
            }
        }
        Ok(out)
    }
}

pub struct This;
impl Function for This {
    fn name(&self) -> &'static str {
        "this"
    }
    fn arity(&self) -> Arity {
        Arity::none()
    }
    fn call(&self, ctx: &Context, step: &Step, _args: &[String]) -> Result<Values> {
        Ok(ctx.inputs(step).to_vec())
    }
}
