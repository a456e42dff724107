//! Registry tests

use felt_engine::{ActionSpec, EventDraft, Felt};
use felt_foundation::{ErrorKind, Value};

fn wait(_: &[Value]) -> EventDraft {
    EventDraft::new()
}

#[test]
fn duplicate_action_keeps_first() {
    let mut felt: Felt = Felt::new();
    felt.register_action("wait", ActionSpec::new(wait).with_tagline("first"))
        .unwrap();
    let err = felt
        .register_action("wait", ActionSpec::new(wait).with_tagline("second"))
        .unwrap_err();

    match err.kind {
        ErrorKind::DuplicateRegistration { registry, name } => {
            assert_eq!(registry, "action");
            assert_eq!(name, "wait");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(felt.action("wait").unwrap().tagline.as_deref(), Some("first"));
    assert_eq!(felt.all_actions().count(), 1);
}

#[test]
fn duplicate_message_names_the_entry() {
    let mut felt: Felt = Felt::new();
    felt.register_sifting_pattern("p", &["?a b c"]).unwrap();
    let err = felt.register_sifting_pattern("p", &["?a b c"]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "a sifting pattern named p has already been registered"
    );
}

#[test]
fn failed_compilation_leaves_registry_unchanged() {
    let mut felt: Felt = Felt::with_config(felt_engine::FeltConfig::strict());
    let err = felt
        .register_action("bad", ActionSpec::new(wait).with_where(&["a b c d"]))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidClauseShape(_)));
    assert!(felt.action("bad").is_none());

    felt.register_action("bad", ActionSpec::new(wait).with_where(&["?a b c"]))
        .unwrap();
    assert!(felt.action("bad").is_some());
}

#[test]
fn actions_iterate_in_registration_order() {
    let mut felt: Felt = Felt::new();
    for name in ["zeta", "alpha", "mid"] {
        felt.register_action(name, ActionSpec::new(wait)).unwrap();
    }
    let names: Vec<&str> = felt.all_actions().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn effect_handler_names_are_unique() {
    let mut felt: Felt = Felt::new();
    felt.register_effect_handler("move", |db, _| Ok(db.clone()))
        .unwrap();
    assert!(felt.handles("move"));
    let err = felt
        .register_effect_handler("move", |db, _| Ok(db.clone()))
        .unwrap_err();
    assert!(err.is_duplicate_registration());
}
