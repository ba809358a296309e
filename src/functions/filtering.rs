use tracing::trace;

use super::navigation::children;
use super::{select_at_most_one, Arity, Function};
use crate::comparison::is_truthy;
use crate::condition::Condition;
use crate::context::{Context, Step};
use crate::errors::{EvalError, Result};
use crate::node::Type;
use crate::value::{Value, Values};

/// Runs a boolean sub-selector; no result counts as false.
pub(crate) fn truthy(ctx: &Context, function: &str, value: &Value, selector: &str) -> Result<bool> {
    Ok(select_at_most_one(ctx, function, value, selector)?.is_some_and(|v| is_truthy(&v)))
}

fn parse_conditions(groups: &[String]) -> Result<Vec<Condition>> {
    groups.iter().map(|g| Condition::parse(g)).collect()
}

/// Keeps inputs for which every selector is truthy.
pub struct Filter;
impl Function for Filter {
    fn name(&self) -> &'static str {
        "filter"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values> {
        let mut out = Vec::new();
        for input in ctx.inputs(step) {
            let mut keep = true;
            for selector in args {
                if !truthy(ctx, "filter", input, selector)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                out.push(input.clone());
            }
        }
        Ok(out)
    }
}

/// Keeps inputs for which at least one selector is truthy.
pub struct FilterOr;
impl Function for FilterOr {
    fn name(&self) -> &'static str {
        "filterOr"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values> {
        let mut out = Vec::new();
        for input in ctx.inputs(step) {
            for selector in args {
                if truthy(ctx, "filterOr", input, selector)? {
                    out.push(input.clone());
                    break;
                }
            }
        }
        Ok(out)
    }
}

/// Entries of each container input that satisfy every condition group.
pub struct Dynamic;
impl Function for Dynamic {
    fn name(&self) -> &'static str {
        "dynamic"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values> {
        let conditions = parse_conditions(args)?;
        let mut out = Vec::new();
        for input in ctx.inputs(step) {
            match input.kind() {
                Type::Map | Type::Array => {}
                other => return Err(EvalError::unsupported("dynamic", other)),
            }
            'candidates: for candidate in children(input, "dynamic")? {
                for condition in &conditions {
                    if !condition.check(ctx, &candidate)? {
                        continue 'candidates;
                    }
                }
                out.push(candidate);
            }
        }
        Ok(out)
    }
}

/// Recursive descent: every descendant of each input, node before its
/// children, that satisfies the condition.
pub struct Search;
impl Function for Search {
    fn name(&self) -> &'static str {
        "search"
    }
    fn arity(&self) -> Arity {
        Arity::exactly(1)
    }
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values> {
        let condition = Condition::parse(&args[0])?;
        let mut out = Vec::new();
        for input in ctx.inputs(step) {
            descend(ctx, &condition, input, &mut out)?;
        }
        Ok(out)
    }
}

fn descend(ctx: &Context, condition: &Condition, value: &Value, out: &mut Values) -> Result<()> {
    if !matches!(value.kind(), Type::Map | Type::Array) {
        return Ok(());
    }
    for child in children(value, "search")? {
        let subject = if condition.is_key_condition() {
            child.key().map(Value::new)
        } else {
            Some(child.clone())
        };
        let matched = match subject.map(|s| condition.check(ctx, &s)) {
            Some(Ok(matched)) => matched,
            Some(Err(e)) => {
                trace!(path = ?child.path(), error = %e, "search condition failed");
                false
            }
            None => false,
        };
        if matched {
            out.push(child.clone());
        }
        descend(ctx, condition, &child, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::context::Context;
    use crate::node::Node;
    use crate::value::Value;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value as Json};

    fn run(doc: Json, selector: &str) -> Vec<Json> {
        let root = Value::new(Node::from(doc));
        let out = Context::new(root, selector).run().unwrap();
        out.iter().map(|v| v.to_node().to_json()).collect()
    }

    #[test]
    fn filter_requires_all_filter_or_any() {
        let doc = json!([{"a": true, "b": false}, {"a": true, "b": true}, {"a": false, "b": false}]);
        assert_eq!(run(doc.clone(), "all().filter(a,b)").len(), 1);
        assert_eq!(run(doc.clone(), "all().filterOr(a,b)").len(), 2);
        assert_eq!(run(doc, "all().filter(x?)").len(), 0);
    }

    #[test]
    fn dynamic_groups_are_and_combined() {
        let doc = json!([
            {"name": "Tom", "age": 30},
            {"name": "Jim", "age": 30},
            {"name": "Tom", "age": 40}
        ]);
        assert_eq!(
            run(doc.clone(), "(name=Tom)(age=30)"),
            vec![json!({"name": "Tom", "age": 30})]
        );
        assert_eq!(run(doc.clone(), "(age>30).name"), vec![json!("Tom")]);
        assert_eq!(run(doc, "(name!=Tom).name"), vec![json!("Jim")]);
    }

    #[test]
    fn search_walks_descendants_in_pre_order() {
        let doc = json!({
            "id": 1,
            "child": {"id": 2, "deeper": [{"id": 3}]}
        });
        assert_eq!(run(doc.clone(), "(?:-=id)"), vec![json!(1), json!(2), json!(3)]);
        assert_eq!(run(doc, "(?:id=2).deeper.[0].id"), vec![json!(3)]);
    }
}
