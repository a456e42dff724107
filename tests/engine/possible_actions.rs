//! Possible-action evaluation tests

use felt_engine::{ActionSpec, EventDraft, Felt};
use felt_foundation::Value;

use crate::cast;

const LIKES_SAME: &str = r#"[
[(likes_same ?a ?b) [?a "likes" ?f] [?b "likes" ?f] [(not= ?a ?b)]]
]"#;

fn noop(_: &[Value]) -> EventDraft {
    EventDraft::new()
}

fn felt() -> Felt {
    let mut felt: Felt = Felt::new();
    felt.register_action(
        "share_food",
        ActionSpec::new(noop).with_where(&[
            "?a likes food",
            "?b likes food",
            "(not= ?a ?b)",
            "?a name ?an",
        ]),
    )
    .unwrap();
    felt.register_action(
        "throw_rocks",
        ActionSpec::new(noop).with_where(&["?a likes rocks", "?a name ?n"]),
    )
    .unwrap();
    felt.register_action(
        "eat_rocks",
        ActionSpec::new(noop).with_where(&["?a likes rocks", "?a age ?age", "(< ?age 10)"]),
    )
    .unwrap();
    felt.register_action("wait", ActionSpec::new(noop)).unwrap();
    felt
}

#[test]
fn every_binding_tuple_is_a_pair() {
    let felt = felt();
    let db = cast();
    let possible = felt.possible_actions(&db, felt.all_actions()).unwrap();

    let count = |name: &str| possible.iter().filter(|p| p.action.name == name).count();
    assert_eq!(count("share_food"), 2);
    assert_eq!(count("throw_rocks"), 1);
    assert_eq!(count("eat_rocks"), 0);
    assert_eq!(count("wait"), 1);
    assert_eq!(possible.len(), 4);
}

#[test]
fn bindings_follow_variable_order() {
    let felt = felt();
    let db = cast();
    let action = felt.action("throw_rocks").unwrap();
    let possible = felt.possible_actions(&db, [action]).unwrap();

    assert_eq!(action.lvars, vec!["a", "n"]);
    assert_eq!(possible[0].bindings.len(), 2);
    assert_eq!(possible[0].get("n"), Some(&Value::from("zog")));
    assert!(possible[0].bindings[0].as_entity().is_some());
}

#[test]
fn by_type_omits_actions_without_matches() {
    let felt = felt();
    let db = cast();
    let grouped = felt.possible_actions_by_type(&db, felt.all_actions()).unwrap();

    assert!(!grouped.contains_key("eat_rocks"));
    assert_eq!(grouped["share_food"].len(), 2);
    assert_eq!(grouped["throw_rocks"].len(), 1);
    assert_eq!(grouped["wait"].len(), 1);
    assert!(grouped["wait"][0].bindings.is_empty());
}

#[test]
fn unconditional_action_is_always_possible() {
    let felt = felt();
    let action = felt.action("wait").unwrap();
    assert!(action.lvars.is_empty());
    assert!(action.query.is_none());

    let empty = felt_storage::Database::new();
    let possible = felt.possible_actions(&empty, [action]).unwrap();
    assert_eq!(possible.len(), 1);
    assert!(possible[0].bindings.is_empty());
}

#[test]
fn explicit_find_controls_tuple_shape() {
    let mut felt: Felt = Felt::new();
    felt.register_action(
        "befriend",
        ActionSpec::new(noop)
            .with_where(&["?a friend ?b", "?a name ?an", "?b name ?bn"])
            .with_find("?bn ?an ?bn"),
    )
    .unwrap();
    let db = cast();
    let possible = felt.possible_actions(&db, felt.all_actions()).unwrap();

    assert_eq!(possible.len(), 1);
    assert_eq!(
        possible[0].bindings,
        vec![Value::from("zog"), Value::from("grok"), Value::from("zog")]
    );
}

#[test]
fn duplicate_tuples_are_kept() {
    let mut felt: Felt = Felt::new();
    felt.register_action(
        "notice_food_lover",
        ActionSpec::new(noop)
            .with_where(&["?a likes food", "?b likes food"])
            .with_find("?a"),
    )
    .unwrap();
    let db = cast();
    let possible = felt.possible_actions(&db, felt.all_actions()).unwrap();
    // Two food lovers, each paired with both food lovers.
    assert_eq!(possible.len(), 4);
}

#[test]
fn rules_are_available_to_actions() {
    let mut felt: Felt = Felt::new();
    felt.set_query_rules(LIKES_SAME).unwrap();
    felt.register_action(
        "bond",
        ActionSpec::new(noop).with_where(&["(likes_same ?x ?y)", "?x name ?xn"]),
    )
    .unwrap();
    let action = felt.action("bond").unwrap();
    assert_eq!(action.where_part, "(likes_same ?x ?y),[?x \"name\" ?xn]");

    let db = cast();
    let possible = felt.possible_actions(&db, [action]).unwrap();
    let mut names: Vec<_> = possible
        .iter()
        .filter_map(|p| p.get("xn").and_then(Value::as_str).map(str::to_string))
        .collect();
    names.sort();
    assert_eq!(names, vec!["grok", "ugg"]);
}
