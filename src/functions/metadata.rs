use super::{Arity, Function};
use crate::context::{Context, Step};
use crate::errors::{EvalError, Result};
use crate::node::Node;
use crate::value::{Value, Values};

pub struct Key;
impl Function for Key {
    fn name(&self) -> &'static str {
        "key"
    }
    fn arity(&self) -> Arity {
        Arity::none()
    }
    fn call(&self, ctx: &Context, step: &Step, _args: &[String]) -> Result<Values> {
        Ok(ctx
            .inputs(step)
            .iter()
            .filter_map(Value::key)
            .map(Value::new)
            .collect())
    }
}

/// `parent([levels])`: walks up `levels` containers (default and minimum 1).
/// Inputs without enough ancestors are dropped.
pub struct Parent;
impl Function for Parent {
    fn name(&self) -> &'static str {
        "parent"
    }
    fn arity(&self) -> Arity {
        Arity::at_most(1)
    }
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values> {
        let levels = match args.first() {
            Some(arg) => arg.trim().parse::<usize>().map_err(|_| {
                EvalError::unexpected_args("parent", args, "levels must be a non-negative integer")
            })?,
            None => 1,
        }
        .max(1);

        Ok(ctx
            .inputs(step)
            .iter()
            .filter_map(|input| (0..levels).try_fold(input.clone(), |v, _| v.parent()))
            .collect())
    }
}

/// `metadata(name...)`: one value per input and name, `null` when unset.
pub struct Metadata;
impl Function for Metadata {
    fn name(&self) -> &'static str {
        "metadata"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values> {
        let mut out = Vec::new();
        for input in ctx.inputs(step) {
            for name in args {
                out.push(
                    input
                        .metadata(name)
                        .unwrap_or_else(|| Value::new(Node::Null)),
                );
            }
        }
        Ok(out)
    }
}
