use dot_selector_query as dsq;
use pretty_assertions::assert_eq;
use serde_json::{json, Value as Json};

fn people() -> &'static str {
    r#"{
        "people": [
            {"name": "Tom", "age": 30, "active": true, "tags": ["a", "b"]},
            {"name": "Jim", "age": 25, "active": "no", "tags": []},
            {"name": "Amy", "age": 41, "active": 1, "tags": ["c"]}
        ]
    }"#
}

fn run(selector: &str) -> Vec<Json> {
    dsq::from_json(people(), selector).unwrap()
}

#[test]
fn test_builtin_filter_truthiness() {
    assert_eq!(run("people.all().filter(active).name"), vec![json!("Tom"), json!("Amy")]);
    assert_eq!(
        run("people.all().filter(not(active)).name"),
        vec![json!("Jim")]
    );
}

#[test]
fn test_builtin_filter_or() {
    assert_eq!(
        run("people.all().filterOr(equal(name,Jim),moreThan(age,40)).name"),
        vec![json!("Jim"), json!("Amy")]
    );
}

#[test]
fn test_builtin_less_than_is_lexicographic() {
    assert_eq!(
        run("people.all().filter(lessThan(age,30)).name"),
        vec![json!("Jim")]
    );
    // "100" sorts before "30" as a string.
    let out = dsq::from_json(r#"[{"n": 100}, {"n": 5}]"#, "all().filter(lessThan(n,30)).n").unwrap();
    assert_eq!(out, vec![json!(100)]);
}

#[test]
fn test_builtin_and_or() {
    assert_eq!(
        run("people.all().and(active,equal(age,30))"),
        vec![json!(true), json!(false), json!(false)]
    );
    assert_eq!(
        run("people.all().or(active,equal(age,25))"),
        vec![json!(true), json!(true), json!(true)]
    );
}

#[test]
fn test_builtin_count_len_keys() {
    assert_eq!(run("people.all().count()"), vec![json!(3)]);
    assert_eq!(run("people.all().tags.len()"), vec![json!(2), json!(0), json!(1)]);
    assert_eq!(
        run("people.first().keys()"),
        vec![json!(["active", "age", "name", "tags"])]
    );
    assert_eq!(run("people.keys()"), vec![json!([0, 1, 2])]);
}

#[test]
fn test_builtin_first_last() {
    assert_eq!(run("people.first().name"), vec![json!("Tom")]);
    assert_eq!(run("people.last().name"), vec![json!("Amy")]);
}

#[test]
fn test_builtin_join_and_merge() {
    assert_eq!(run("people.all().name.join(/)"), vec![json!("Tom/Jim/Amy")]);
    assert_eq!(run("people.join(\\,,all().name)"), vec![json!("Tom,Jim,Amy")]);
    assert_eq!(run("people.all().merge(tags.all())"), vec![json!(["a", "b", "c"])]);
}

#[test]
fn test_builtin_map_of() {
    assert_eq!(
        run("people.last().mapOf(n,name,first_tag,tags.first())"),
        vec![json!({"n": "Amy", "first_tag": "c"})]
    );
}

#[test]
fn test_builtin_key_parent_metadata() {
    assert_eq!(run("people.[1].key()"), vec![json!(1)]);
    assert_eq!(run("people.[1].name.parent().age"), vec![json!(25)]);
    assert_eq!(run("people.[1].name.parent(2).len()"), vec![json!(3)]);
    assert_eq!(run("people.metadata(key)"), vec![json!("people")]);
    assert_eq!(run("metadata(key)"), vec![json!("root")]);
}

#[test]
fn test_builtin_literals_have_no_key() {
    assert_eq!(run("people.all().string(x).key()"), Vec::<Json>::new());
    assert_eq!(
        run("people.all().string(x).filter(equal(this(),x)).key()"),
        Vec::<Json>::new()
    );
    assert_eq!(run("people.[0].mapOf(n,name).filter(n).key()"), Vec::<Json>::new());
}

#[test]
fn test_builtin_or_default() {
    assert_eq!(
        run("people.all().orDefault(nickname,name)"),
        vec![json!("Tom"), json!("Jim"), json!("Amy")]
    );
    assert_eq!(
        run("people.all().orDefault(tags.[1],string(none))"),
        vec![json!("b"), json!("none"), json!("none")]
    );
}

#[test]
fn test_builtin_type_string_null_this() {
    assert_eq!(
        run("people.first().all().type()"),
        vec![json!("string"), json!("int"), json!("bool"), json!("array")]
    );
    assert_eq!(run("people.this().all().string(x).count()"), vec![json!(3)]);
    assert_eq!(run("people.null()"), vec![json!(null)]);
}
