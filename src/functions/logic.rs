use itertools::Itertools;

use super::filtering::truthy;
use super::{select_at_most_one, Arity, Function};
use crate::comparison::sorted_matches;
use crate::context::{Context, Step};
use crate::errors::Result;
use crate::parser::unescape;
use crate::value::{Value, Values};

/// How a found string form is compared against a literal.
#[derive(Clone, Copy)]
enum Compare {
    Equal,
    Less,
    More,
}

impl Compare {
    fn matches(self, found: &str, literal: &str) -> bool {
        match self {
            Compare::Equal => found == literal,
            Compare::Less => sorted_matches(found, literal, false, false),
            Compare::More => sorted_matches(found, literal, false, true),
        }
    }
}

/// One boolean per input: whether every `(selector, literal)` pair holds.
fn compare_pairs(
    ctx: &Context,
    step: &Step,
    function: &str,
    args: &[String],
    compare: Compare,
) -> Result<Values> {
    let pairs: Vec<(&String, String)> = args
        .iter()
        .tuples()
        .map(|(selector, literal)| (selector, unescape(literal)))
        .collect();

    let mut out = Vec::new();
    for input in ctx.inputs(step) {
        let mut passed = true;
        for (selector, literal) in &pairs {
            let found = select_at_most_one(ctx, function, input, selector)?;
            if !found.is_some_and(|v| compare.matches(&v.to_string_form(), literal)) {
                passed = false;
                break;
            }
        }
        out.push(Value::new(passed));
    }
    Ok(out)
}

pub struct Equal;
impl Function for Equal {
    fn name(&self) -> &'static str {
        "equal"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(2).multiple_of(2)
    }
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values> {
        compare_pairs(ctx, step, "equal", args, Compare::Equal)
    }
}

/// String-form ordering, so `10` is less than `9`.
pub struct LessThan;
impl Function for LessThan {
    fn name(&self) -> &'static str {
        "lessThan"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(2).multiple_of(2)
    }
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values> {
        compare_pairs(ctx, step, "lessThan", args, Compare::Less)
    }
}

pub struct MoreThan;
impl Function for MoreThan {
    fn name(&self) -> &'static str {
        "moreThan"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(2).multiple_of(2)
    }
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values> {
        compare_pairs(ctx, step, "moreThan", args, Compare::More)
    }
}

pub struct And;
impl Function for And {
    fn name(&self) -> &'static str {
        "and"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values> {
        let mut out = Vec::new();
        for input in ctx.inputs(step) {
            let mut all = true;
            for selector in args {
                if !truthy(ctx, "and", input, selector)? {
                    all = false;
                    break;
                }
            }
            out.push(Value::new(all));
        }
        Ok(out)
    }
}

pub struct Or;
impl Function for Or {
    fn name(&self) -> &'static str {
        "or"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values> {
        let mut out = Vec::new();
        for input in ctx.inputs(step) {
            let mut any = false;
            for selector in args {
                if truthy(ctx, "or", input, selector)? {
                    any = true;
                    break;
                }
            }
            out.push(Value::new(any));
        }
        Ok(out)
    }
}

/// One negated boolean per input and selector.
pub struct Not;
impl Function for Not {
    fn name(&self) -> &'static str {
        "not"
    }
    fn arity(&self) -> Arity {
        Arity::at_least(1)
    }
    fn call(&self, ctx: &Context, step: &Step, args: &[String]) -> Result<Values> {
        let mut out = Vec::new();
        for input in ctx.inputs(step) {
            for selector in args {
                out.push(Value::new(!truthy(ctx, "not", input, selector)?));
            }
        }
        Ok(out)
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
    fn equal_pairs() {
        let doc = json!({"a": "x", "b": 1});
        assert_eq!(run(doc.clone(), "equal(a,x)").unwrap(), vec![json!(true)]);
        assert_eq!(run(doc.clone(), "equal(a,x,b,1)").unwrap(), vec![json!(true)]);
        assert_eq!(run(doc.clone(), "equal(a,x,b,2)").unwrap(), vec![json!(false)]);
        assert_eq!(run(doc.clone(), "equal(c?,x)").unwrap(), vec![json!(false)]);
        assert!(matches!(
            run(doc, "equal(a)").unwrap_err().root_cause(),
            EvalError::UnexpectedFunctionArgs { .. }
        ));
    }

    #[test]
    fn equal_rejects_multiple_results() {
        let err = run(json!([1, 2]), "equal(all(),1)").unwrap_err();
        assert!(matches!(err.root_cause(), EvalError::UnexpectedResultCount { got: 2, .. }));
    }

    #[test]
    fn ordering_is_lexicographic() {
        let doc = json!({"n": 10});
        assert_eq!(run(doc.clone(), "lessThan(n,9)").unwrap(), vec![json!(true)]);
        assert_eq!(run(doc.clone(), "moreThan(n,9)").unwrap(), vec![json!(false)]);
        assert_eq!(run(doc.clone(), "lessThan(n,10)").unwrap(), vec![json!(false)]);
        assert_eq!(run(doc, "moreThan(n,1)").unwrap(), vec![json!(true)]);
    }

    #[test]
    fn boolean_combinators() {
        let doc = json!({"t": true, "f": "no", "s": "yes"});
        assert_eq!(run(doc.clone(), "and(t,s)").unwrap(), vec![json!(true)]);
        assert_eq!(run(doc.clone(), "and(t,f)").unwrap(), vec![json!(false)]);
        assert_eq!(run(doc.clone(), "or(f,s)").unwrap(), vec![json!(true)]);
        assert_eq!(run(doc.clone(), "or(f)").unwrap(), vec![json!(false)]);
        assert_eq!(run(doc, "not(t,f)").unwrap(), vec![json!(false), json!(true)]);
    }
}
