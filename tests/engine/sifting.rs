//! Sifting pattern execution tests

use felt_engine::Felt;
use felt_foundation::{ErrorKind, Value};

use crate::cast;

#[test]
fn nuggets_bind_pattern_variables() {
    let mut felt: Felt = Felt::new();
    felt.register_sifting_pattern("elder_friend", &["?a friend ?b", "?b age ?age", "(> ?age 40)"])
        .unwrap();

    let db = cast();
    let nuggets = felt.run_sifting_pattern_by_name(&db, "elder_friend").unwrap();
    assert_eq!(nuggets.len(), 1);
    let nugget = &nuggets[0];
    assert_eq!(nugget.get("age"), Some(&Value::Int(45)));
    assert_eq!(
        nugget.vars.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["a", "b", "age"]
    );
}

#[test]
fn run_all_patterns_in_order() {
    let mut felt: Felt = Felt::new();
    felt.register_sifting_pattern("rock_fans", &["?a likes rocks"]).unwrap();
    felt.register_sifting_pattern("food_fans", &["?a likes food"]).unwrap();

    let nuggets = felt.run_sifting_patterns(&cast()).unwrap();
    let names: Vec<_> = nuggets.iter().map(|n| n.pattern.as_deref()).collect();
    assert_eq!(
        names,
        vec![Some("rock_fans"), Some("food_fans"), Some("food_fans")]
    );
}

#[test]
fn patterns_see_only_their_store_version() {
    let mut felt: Felt = Felt::new();
    felt.register_sifting_pattern("rock_fans", &["?a likes rocks"]).unwrap();

    let before = cast();
    let (after, _) = before
        .create_entity(crate::person("krag", "rocks", 20))
        .unwrap();

    assert_eq!(felt.run_sifting_pattern_by_name(&before, "rock_fans").unwrap().len(), 1);
    assert_eq!(felt.run_sifting_pattern_by_name(&after, "rock_fans").unwrap().len(), 2);
}

#[test]
fn unknown_pattern_is_an_error() {
    let felt: Felt = Felt::new();
    let err = felt.run_sifting_pattern_by_name(&cast(), "nope").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownPattern(_)));
    assert_eq!(err.to_string(), "there is no registered sifting pattern named nope");
}

#[test]
fn literal_only_pattern_is_malformed() {
    let mut felt: Felt = Felt::new();
    felt.register_sifting_pattern("constant", &["food is_edible true"])
        .unwrap();
    let err = felt.run_sifting_pattern_by_name(&cast(), "constant").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MalformedPattern(_)));
}
