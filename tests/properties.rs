//! Property-based tests for parsing, fan-out, mutation and conditions.

use dot_selector_query as dsq;
use dsq::condition::Condition;
use dsq::context::Context;
use dsq::node::Node;
use dsq::parser::parse_segment;
use dsq::value::Value;
use proptest::prelude::*;
use serde_json::{json, Value as Json};

fn doc(v: Json) -> Value {
    Value::new(Node::from(v))
}

fn select_json(root: &Value, selector: &str) -> Vec<Json> {
    let (values, _) = dsq::select(root, selector).unwrap();
    values.iter().map(|v| v.to_node().to_json()).collect()
}

proptest! {
    /// `[n]` expands to `index(n)`, a bare name to `property(name)`
    #[test]
    fn prop_shorthand_matches_canonical(n in 0usize..100_000, name in "[a-z][a-zA-Z0-9_]{0,8}") {
        let short = parse_segment(&format!("[{n}]")).unwrap();
        let long = parse_segment(&format!("index({n})")).unwrap();
        prop_assert_eq!(short.map(|(s, _)| s), long.map(|(s, _)| s));

        let short = parse_segment(&name).unwrap();
        let long = parse_segment(&format!("property({name})")).unwrap();
        prop_assert_eq!(short.map(|(s, _)| s), long.map(|(s, _)| s));
    }

    /// all() yields one value per entry; filtering never adds values
    #[test]
    fn prop_fan_out_then_narrow(
        items in prop::collection::vec(any::<i64>(), 0..30),
        entries in prop::collection::btree_map("[a-z]{1,5}", any::<bool>(), 0..20),
    ) {
        let array = doc(json!(items));
        let all = select_json(&array, "all()");
        prop_assert_eq!(all.len(), items.len());
        let narrowed = select_json(&array, "all().filter(moreThan(this(),5))");
        prop_assert!(narrowed.len() <= all.len());

        let object = doc(json!(entries));
        let all = select_json(&object, "all()");
        prop_assert_eq!(all.len(), entries.len());
        let truthy = select_json(&object, "all().filter(this())");
        prop_assert_eq!(truthy.len(), entries.values().filter(|b| **b).count());
    }

    /// a value written by modify reads back through the same selector
    #[test]
    fn prop_modify_then_select(
        path in prop::collection::vec("[a-z]{1,6}", 1..6),
        value in any::<i64>(),
    ) {
        let root = doc(json!({}));
        let selector = path.join(".");
        prop_assert_eq!(dsq::modify(&root, &selector, value).unwrap(), 1);
        prop_assert_eq!(select_json(&root, &selector), vec![json!(value)]);
    }

    /// multi-target deletes keep the survivors in their original order
    #[test]
    fn prop_delete_compacts_in_order(
        items in prop::collection::vec(0i64..10, 0..40),
        threshold in 0i64..10,
    ) {
        let root = doc(json!(items));
        let selector = format!("all().filter(moreThan(this(),{threshold}))");
        let matched = select_json(&root, &selector).len();
        dsq::delete(&root, &selector).unwrap();

        let expected: Vec<i64> = items.iter().copied().filter(|x| *x <= threshold).collect();
        let remaining = root.document().root().to_json();
        prop_assert_eq!(remaining, json!(expected));
        prop_assert_eq!(expected.len(), items.len() - matched);
    }

    /// key=v holds exactly when the sub-query's string form is v
    #[test]
    fn prop_equal_condition_symmetry(found in "[a-c]{0,3}", literal in "[a-c]{0,3}") {
        let candidate = doc(json!({"k": found}));
        let ctx = Context::new(doc(json!(null)), "");
        let condition = Condition::parse(&format!("k={literal}")).unwrap();
        prop_assert_eq!(condition.check(&ctx, &candidate).unwrap(), found == literal);
    }
}
