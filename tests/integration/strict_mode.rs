//! Strict configuration promotes diagnostics to errors

use felt_engine::{ActionSpec, Effect, EventDraft, Felt, FeltConfig, check_effect_keys};
use felt_foundation::{ErrorKind, Value};
use felt_storage::{Database, FactStore};

use crate::{init_tracing, village};

fn unhandled_event() -> EventDraft {
    EventDraft::new()
        .with("type", "event")
        .with_effect(Effect::new("vanish"))
}

#[test]
fn lenient_mode_tags_unhandled_effects() {
    init_tracing();
    let felt: Felt = Felt::new();
    let next = felt.add_event(&village(), &unhandled_event()).unwrap();
    let id = next.most_recent_entity_id().unwrap();
    assert_eq!(next.values(id, "tag"), vec![Value::from("vanish")]);
}

#[test]
fn strict_mode_rejects_unhandled_effects() {
    let felt: Felt = Felt::with_config(FeltConfig::strict());
    let err = felt.add_event(&village(), &unhandled_event()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnrecognizedEffectType(ref t) if t == "vanish"));
    assert_eq!(err.context.unwrap().stack, vec!["effect vanish"]);
}

#[test]
fn strict_mode_rejects_malformed_preconditions() {
    let mut felt: Felt = Felt::with_config(FeltConfig::strict());
    let err = felt
        .register_action(
            "ramble",
            ActionSpec::new(|_: &[Value]| EventDraft::new()).with_where(&["a b c d"]),
        )
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidClauseShape(_)));
    let context = err.context.unwrap();
    assert_eq!(context.source.as_deref(), Some("ramble"));
}

#[test]
fn extra_effect_keys_are_never_fatal() {
    let mut felt: Felt = Felt::with_config(FeltConfig::strict());
    felt.register_effect_handler("wave", |db: &Database, effect| {
        let extra = check_effect_keys(effect, &["at"], &[])?;
        assert_eq!(extra, vec!["mood"]);
        Ok(db.clone())
    })
    .unwrap();
    let draft = EventDraft::new().with("type", "event").with_effect(
        Effect::new("wave").with("at", 1).with("mood", "cheery"),
    );
    assert!(felt.add_event(&village(), &draft).is_ok());
}
