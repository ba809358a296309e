use crate::comparison::sorted_matches;
use crate::context::Context;
use crate::errors::{EvalError, Result};
use crate::parser::unescape;
use crate::value::Value;

/// Keys that refer to the candidate itself rather than a sub-selector.
fn is_self_key(key: &str) -> bool {
    key == "." || key == "value"
}

/// Exact match of the value found at `key` against a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualCondition {
    pub key: String,
    pub value: String,
    pub not: bool,
}

/// Exact match of the candidate itself; used when searching by key name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEqualCondition {
    pub value: String,
    pub not: bool,
}

/// Ordering check between the value found at `key` and a literal, on their
/// string forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedComparisonCondition {
    pub key: String,
    pub value: String,
    /// Whether equal values pass.
    pub equal: bool,
    /// Whether the found value must sort after the literal (otherwise before).
    pub after: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Equal(EqualCondition),
    KeyEqual(KeyEqualCondition),
    Sorted(SortedComparisonCondition),
}

const OPERATORS: [&str; 6] = ["=", "!=", "<", "<=", ">", ">="];

impl Condition {
    /// Parses one dynamic group such as `name=Tom`, `age>=30` or `-=id`.
    pub fn parse(group: &str) -> Result<Condition> {
        let (key, op, value) = split_group(group);
        let value = unescape(&value);
        match key.as_str() {
            "-" | "keyValue" => match op.as_str() {
                "=" | "!=" => Ok(Condition::KeyEqual(KeyEqualCondition {
                    value,
                    not: op == "!=",
                })),
                other => Err(EvalError::UnknownComparisonOperator(other.to_string())),
            },
            _ => match op.as_str() {
                "=" | "!=" => Ok(Condition::Equal(EqualCondition {
                    key,
                    value,
                    not: op == "!=",
                })),
                "<" | "<=" | ">" | ">=" => Ok(Condition::Sorted(SortedComparisonCondition {
                    key,
                    value,
                    equal: op.ends_with('='),
                    after: op.starts_with('>'),
                })),
                "" => Err(EvalError::UnknownComparisonOperator(group.to_string())),
                other => Err(EvalError::UnknownComparisonOperator(other.to_string())),
            },
        }
    }

    pub fn check(&self, ctx: &Context, candidate: &Value) -> Result<bool> {
        match self {
            Condition::Equal(c) => c.check(ctx, candidate),
            Condition::KeyEqual(c) => c.check(candidate),
            Condition::Sorted(c) => c.check(ctx, candidate),
        }
    }

    pub fn is_key_condition(&self) -> bool {
        matches!(self, Condition::KeyEqual(_))
    }
}

/// Splits `key op value`, only recognising operator characters outside
/// brackets and before the value starts.
fn split_group(group: &str) -> (String, String, String) {
    let mut key = String::new();
    let mut op = String::new();
    let mut value = String::new();
    let mut depth = 0i32;
    let mut escaped = false;
    for c in group.chars() {
        let literal = std::mem::take(&mut escaped);
        match c {
            _ if literal => {}
            '\\' => escaped = true,
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            _ => {}
        }
        let mut candidate = op.clone();
        candidate.push(c);
        let building = !literal
            && depth == 0
            && value.is_empty()
            && OPERATORS.iter().any(|o| o.starts_with(candidate.as_str()));
        if building {
            op = candidate;
        } else if op.is_empty() {
            key.push(c);
        } else {
            value.push(c);
        }
    }
    (key, op, value)
}

/// Runs `key` against `candidate`, giving the single found value's string
/// form, or `None` when nothing was found.
fn lookup(ctx: &Context, candidate: &Value, key: &str) -> Result<Option<String>> {
    if candidate.with_node(|n| n.is_none()) {
        return Err(EvalError::UnhandledCheckType("nil".into()));
    }
    if !candidate.with_node(|n| n.is_some_and(|n| n.is_container())) {
        return Err(EvalError::UnhandledCheckType(candidate.kind().to_string()));
    }
    let found = match ctx.sub_select(candidate, key) {
        Ok(found) => found,
        Err(e)
            if e.is_not_found()
                || matches!(e.root_cause(), EvalError::UnsupportedTypeForSelector { .. }) =>
        {
            return Ok(None)
        }
        Err(e) => return Err(e),
    };
    match found.as_slice() {
        [] => Ok(None),
        [single] => Ok(Some(single.to_string_form())),
        many => Err(EvalError::UnexpectedResultCount {
            function: "condition".into(),
            selector: key.to_string(),
            expected: "at most one",
            got: many.len(),
        }),
    }
}

impl EqualCondition {
    pub fn check(&self, ctx: &Context, candidate: &Value) -> Result<bool> {
        let found = if is_self_key(&self.key) {
            if !candidate.exists() {
                return Err(EvalError::UnhandledCheckType("nil".into()));
            }
            Some(candidate.to_string_form())
        } else {
            lookup(ctx, candidate, &self.key)?
        };
        let matched = found.is_some_and(|f| f == self.value);
        Ok(matched != self.not)
    }
}

impl KeyEqualCondition {
    pub fn check(&self, candidate: &Value) -> Result<bool> {
        if !candidate.exists() {
            return Err(EvalError::UnhandledCheckType("nil".into()));
        }
        Ok((candidate.to_string_form() == self.value) != self.not)
    }
}

impl SortedComparisonCondition {
    pub fn check(&self, ctx: &Context, candidate: &Value) -> Result<bool> {
        let found = if is_self_key(&self.key) {
            if !candidate.exists() {
                return Err(EvalError::UnhandledCheckType("nil".into()));
            }
            Some(candidate.to_string_form())
        } else {
            lookup(ctx, candidate, &self.key)?
        };
        Ok(found.is_some_and(|f| sorted_matches(&f, &self.value, self.equal, self.after)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ctx() -> Context {
        Context::new(Value::new(Node::Null), "")
    }

    #[test]
    fn parses_operators() {
        assert_eq!(
            Condition::parse("name=Tom").unwrap(),
            Condition::Equal(EqualCondition { key: "name".into(), value: "Tom".into(), not: false })
        );
        assert_eq!(
            Condition::parse("name!=Tom").unwrap(),
            Condition::Equal(EqualCondition { key: "name".into(), value: "Tom".into(), not: true })
        );
        assert_eq!(
            Condition::parse("age>=30").unwrap(),
            Condition::Sorted(SortedComparisonCondition {
                key: "age".into(),
                value: "30".into(),
                equal: true,
                after: true
            })
        );
        assert_eq!(
            Condition::parse("-=id").unwrap(),
            Condition::KeyEqual(KeyEqualCondition { value: "id".into(), not: false })
        );
        assert_eq!(
            Condition::parse("x=a=b").unwrap(),
            Condition::Equal(EqualCondition { key: "x".into(), value: "a=b".into(), not: false })
        );
        assert!(matches!(Condition::parse("-<id"), Err(EvalError::UnknownComparisonOperator(_))));
        assert!(matches!(Condition::parse("noop"), Err(EvalError::UnknownComparisonOperator(_))));
    }

    #[test]
    fn operator_inside_brackets_belongs_to_key() {
        let (key, op, value) = split_group("filter(equal(a,b))=x");
        assert_eq!((key.as_str(), op.as_str(), value.as_str()), ("filter(equal(a,b))", "=", "x"));
        let (key, op, value) = split_group(r"a\=b=c");
        assert_eq!((key.as_str(), op.as_str(), value.as_str()), (r"a\=b", "=", "c"));
    }

    #[test]
    fn equal_condition_matches_iff_sub_query_matches() {
        let ctx = ctx();
        let candidate = Value::new(Node::from(json!({"name": "Tom", "age": 30})));
        let check = |group: &str| Condition::parse(group).unwrap().check(&ctx, &candidate).unwrap();
        assert!(check("name=Tom"));
        assert!(!check("name=Jim"));
        assert!(check("age=30"));
        assert!(check("name!=Jim"));
        assert!(!check("missing=Tom"));
    }

    #[test]
    fn equal_condition_rejects_scalars_with_keys() {
        let ctx = ctx();
        let scalar = Value::new(Node::from("Tom"));
        let cond = Condition::parse("name=Tom").unwrap();
        assert!(matches!(cond.check(&ctx, &scalar), Err(EvalError::UnhandledCheckType(_))));
        assert!(Condition::parse(".=Tom").unwrap().check(&ctx, &scalar).unwrap());
    }

    #[test]
    fn sorted_condition_uses_string_order() {
        let ctx = ctx();
        let candidate = Value::new(Node::from(json!({"n": 10})));
        let check = |group: &str| Condition::parse(group).unwrap().check(&ctx, &candidate).unwrap();
        assert!(check("n<9"));
        assert!(!check("n>9"));
        assert!(check("n>=10"));
        assert!(!check("n<10"));
    }
}
