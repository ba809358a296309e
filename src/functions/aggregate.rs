use indexmap::IndexMap;
use itertools::Itertools;

use super::{select_exactly_one, Arity, Function};
use crate::context::{Context, Step};
use crate::errors::{EvalError, Result};
use crate::node::{Node, Type};
use crate::parser::unescape;
use crate::value::{Value, Values};

pub struct Count;
impl Function for Count {
    fn name(&self) -> &'static str {
        "count"
    }
    fn arity(&self) -> Arity {
        Arity::none()
    }
    fn call(&self, ctx: &Context, step: &Step, _args: &[String]) -> Result<Values> {
        Ok(vec![Value::new(ctx.inputs(step).len())])
    }
}

pub struct Len;
impl Function for Len {
    fn name(&self) -> &'static str {
        "len"
    }
    fn arity(&self) -> Arity {
        Arity::none()
    }
    fn call(&self, ctx: &Context, step: &Step, _args: &[String]) -> Result<Values> {
        Ok(ctx.inputs(step).iter().map(|v| Value::new(v.len())).collect())
    }
}

/// Sorted keys of maps, `0..len` for arrays.
pub struct Keys;
impl Function for Keys {
    fn name(&self) -> &'static str {
        "keys"
    }
    fn arity(&self) -> Arity {
        Arity::none()
    }
    fn call(&self, ctx: &Context, step: &Step, _args: &[String]) -> Result<Values> {
        ctx.inputs(step)
            .iter()
            .map(|input| {
                let keys: Vec<Node> = match input.kind() {
                    Type::Map => input
                        .with_node(|n| n.map(Node::keys).unwrap_or_default())
                        .into_iter()
                        .sorted()
                        .map(Node::from)
                        .collect(),
                    Type::Array => (0..input.len()).map(Node::from).collect(),
                    other => {
                        return Err(EvalError::IncompatibleTypes(format!(
                            "keys expects map or array, got {other}"
                        )))
                    }
                };
                Ok(Value::new(keys))
            })
            .collect()
    }
}

/// `mapOf(key, selector, ...)`: one new ordered map per input.
pub struct MapOf;
impl Function for MapOf {
    fn name(&self) -> &'static str {
        "mapOf"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(2).multiple_of(2)
    }
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values> {
        let mut out = Vec::new();
        for input in ctx.inputs(step) {
            let mut map = IndexMap::new();
            for (key, selector) in args.iter().tuples() {
                let found = select_exactly_one(ctx, "mapOf", input, selector)?;
                map.insert(unescape(key), found.to_node());
            }
            out.push(Value::new(Node::OrderedMap(map)));
        }
        Ok(out)
    }
}

/// `join(sep[, selector...])`: one string joining the inputs, or everything
/// the selectors find in them.
pub struct Join;
impl Function for Join {
    fn name(&self) -> &'static str {
        "join"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values> {
        let (separator, selectors) = match args.split_first() {
            Some((sep, rest)) => (unescape(sep), rest),
            None => return Err(EvalError::unexpected_args("join", args, "missing separator")),
        };
        let inputs = ctx.inputs(step);
        let joined = if selectors.is_empty() {
            inputs.iter().map(Value::to_string_form).join(&separator)
        } else {
            let mut parts = Vec::new();
            for input in inputs {
                for selector in selectors {
                    parts.extend(ctx.sub_select(input, selector)?.iter().map(Value::to_string_form));
                }
            }
            parts.join(separator.as_str())
        };
        Ok(vec![Value::new(joined)])
    }
}

/// Collects the inputs, or what the selectors find in them, into one array.
pub struct Merge;
impl Function for Merge {
    fn name(&self) -> &'static str {
        "merge"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(0)
    }
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values> {
        let inputs = ctx.inputs(step);
        let items: Vec<Node> = if args.is_empty() {
            inputs.iter().map(Value::to_node).collect()
        } else {
            let mut items = Vec::new();
            for input in inputs {
                for selector in args {
                    items.extend(ctx.sub_select(input, selector)?.iter().map(Value::to_node));
                }
            }
            items
        };
        Ok(vec![Value::new(items)])
    }
}

pub struct TypeOf;
impl Function for TypeOf {
    fn name(&self) -> &'static str {
        "type"
    }
    fn arity(&self) -> Arity {
        Arity::none()
    }
    fn call(&self, ctx: &Context, step: &Step, _args: &[String]) -> Result<Values> {
        Ok(ctx
            .inputs(step)
            .iter()
            .map(|v| Value::new(v.kind().as_str()))
            .collect())
    }
}

/// `string(literal)`: the literal once per input.
pub struct StringLit;
impl Function for StringLit {
    fn name(&self) -> &'static str {
        "string"
    }
    fn arity(&self) -> Arity {
        Arity::exactly(1)
    }
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values> {
        let literal = unescape(&args[0]);
        Ok(ctx
            .inputs(step)
            .iter()
            .map(|_| Value::new(literal.as_str()))
            .collect())
    }
}

pub struct Null;
impl Function for Null {
    fn name(&self) -> &'static str {
        "null"
    }
    fn arity(&self) -> Arity {
        Arity::none()
    }
    fn call(&self, ctx: &Context, step: &Step, _args: &[String]) -> Result<Values> {
        Ok(ctx
            .inputs(step)
            .iter()
            .map(|_| Value::new(Node::Null))
            .collect())
    }
}

/// `orDefault(selector, default)`: falls back to `default` when `selector`
/// hits a missing property or index.
pub struct OrDefault;
impl Function for OrDefault {
    fn name(&self) -> &'static str {
        "orDefault"
    }
    fn arity(&self) -> Arity {
        Arity::exactly(2)
    }
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values> {
        let (selector, fallback) = (&args[0], &args[1]);
        ctx.inputs(step)
            .iter()
            .map(|input| match select_exactly_one(ctx, "orDefault", input, selector) {
                Err(e) if e.is_not_found() => select_exactly_one(ctx, "orDefault", input, fallback),
                other => other,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Context;
    use crate::errors::EvalError;
    use crate::node::Node;
    use crate::value::Value;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value as Json};

    fn run(doc: Json, selector: &str) -> Result<Vec<Json>, EvalError> {
        let root = Value::new(Node::from(doc));
        let out = Context::new(root, selector).run()?;
        Ok(out.iter().map(|v| v.to_node().to_json()).collect())
    }

    #[test]
    fn count_and_len() {
        let doc = json!({"a": [1, 2, 3], "s": "héllo"});
        assert_eq!(run(doc.clone(), "a.all().count()").unwrap(), vec![json!(3)]);
        assert_eq!(run(doc.clone(), "a.len()").unwrap(), vec![json!(3)]);
        assert_eq!(run(doc.clone(), "a.[#]").unwrap(), vec![json!(3)]);
        assert_eq!(run(doc, "s.len()").unwrap(), vec![json!(5)]);
    }

    #[test]
    fn keys_sort_map_keys() {
        assert_eq!(
            run(json!({"z": 1, "a": 2}), "keys()").unwrap(),
            vec![json!(["a", "z"])]
        );
        assert_eq!(run(json!(["x", "y"]), "keys()").unwrap(), vec![json!([0, 1])]);
        assert!(matches!(
            run(json!("x"), "keys()").unwrap_err().root_cause(),
            EvalError::IncompatibleTypes(_)
        ));
    }

    #[test]
    fn map_of_builds_ordered_maps() {
        let doc = json!([{"first": "Tom", "age": 30}]);
        assert_eq!(
            run(doc.clone(), "all().mapOf(name,first,years,age)").unwrap(),
            vec![json!({"name": "Tom", "years": 30})]
        );
        assert!(matches!(
            run(doc, "all().mapOf(name,missing?)").unwrap_err().root_cause(),
            EvalError::UnexpectedResultCount { got: 0, .. }
        ));
    }

    #[test]
    fn join_inputs_or_selected_values() {
        let doc = json!([{"n": "a"}, {"n": "b"}]);
        assert_eq!(run(doc.clone(), "all().n.join(-)").unwrap(), vec![json!("a-b")]);
        assert_eq!(run(doc.clone(), r"all().join(\,,n)").unwrap(), vec![json!("a,b")]);
        assert_eq!(run(doc, "all().n.join( )").unwrap(), vec![json!("a b")]);
    }

    #[test]
    fn merge_collects_into_one_array() {
        let doc = json!({"a": [1, 2], "b": [3]});
        assert_eq!(run(doc.clone(), "all().merge()").unwrap(), vec![json!([[1, 2], [3]])]);
        assert_eq!(run(doc, "merge(a.all(),b.all())").unwrap(), vec![json!([1, 2, 3])]);
    }

    #[test]
    fn type_names() {
        let doc = json!({"s": "x", "i": 1, "f": 1.5, "b": true, "n": null, "m": {}, "a": []});
        assert_eq!(
            run(doc, "all().type()").unwrap(),
            vec![
                json!("string"),
                json!("int"),
                json!("float"),
                json!("bool"),
                json!("null"),
                json!("map"),
                json!("array")
            ]
        );
    }

    #[test]
    fn string_and_null_literals() {
        assert_eq!(run(json!([1, 2]), "all().string(x)").unwrap(), vec![json!("x"), json!("x")]);
        assert_eq!(run(json!({}), r"string(a\.b)").unwrap(), vec![json!("a.b")]);
        assert_eq!(run(json!({}), "null()").unwrap(), vec![json!(null)]);
    }

    #[test]
    fn or_default_only_swallows_misses() {
        let doc = json!({"a": 1});
        assert_eq!(run(doc.clone(), "orDefault(a,string(x))").unwrap(), vec![json!(1)]);
        assert_eq!(run(doc.clone(), "orDefault(b,string(x))").unwrap(), vec![json!("x")]);
        assert_eq!(run(doc.clone(), "orDefault(b.[3],null())").unwrap(), vec![json!(null)]);
        assert!(run(doc, "orDefault(nope(),string(x))").is_err());
    }
}
