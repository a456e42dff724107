//! Full evaluate, realize, and commit cycles

use felt_engine::{Effect, EventDraft};
use felt_foundation::{EntityId, Value};
use felt_storage::{Database, FactStore};

use crate::{init_tracing, village, village_felt};

fn find_by_name(db: &Database, name: &str) -> EntityId {
    let query = format!(r#"[:find ?e :where [?e "name" "{name}"]]"#);
    db.query(&query, "").unwrap()[0][0].as_entity().unwrap()
}

#[test]
fn eat_cycle_commits_one_event() {
    init_tracing();
    let felt = village_felt();
    let db = village();

    let grouped = felt.possible_actions_by_type(&db, felt.all_actions()).unwrap();
    assert_eq!(grouped.keys().copied().collect::<Vec<_>>(), vec!["eat", "rest"]);
    let eat = &grouped["eat"][0];
    let grok = find_by_name(&db, "grok");
    assert_eq!(eat.get("eater").and_then(Value::as_entity), Some(grok));

    let event = felt.realize_event(eat.action, &eat.bindings);
    assert_eq!(event.get("type"), Some(&Value::from("event")));
    assert_eq!(event.event_type(), Some("eat"));

    let next = felt.add_event(&db, &event).unwrap();
    let id = next.most_recent_entity_id().unwrap();
    let bush = find_by_name(&db, "bush");

    assert_eq!(next.entity_count(), db.entity_count() + 1);
    assert_eq!(
        next.values(id, "tag"),
        vec![
            Value::from("deplete"),
            Value::from("feed"),
            Value::from("meal")
        ]
    );
    assert_eq!(next.values(id, "actor"), vec![Value::from(grok)]);
    assert_eq!(next.values(grok, "hunger"), vec![Value::Int(0)]);
    assert_eq!(next.values(bush, "food"), vec![Value::Int(2)]);

    let after = felt.possible_actions_by_type(&next, felt.all_actions()).unwrap();
    assert!(!after.contains_key("eat"));
    assert!(after.contains_key("rest"));
}

#[test]
fn event_properties_exclude_effects_and_tags() {
    let felt = village_felt();
    let db = village();
    let rest = felt.action("rest").unwrap();
    let next = felt.add_event(&db, &felt.realize_event(rest, &[])).unwrap();
    let id = next.most_recent_entity_id().unwrap();

    let event = next.get_entity(id).unwrap();
    let mut attributes: Vec<&str> = event.attributes.keys().map(AsRef::as_ref).collect();
    attributes.sort_unstable();
    assert_eq!(attributes, vec!["eventType", "tag", "type"]);
    assert_eq!(next.values(id, "tag"), vec![Value::from("quiet")]);
}

#[test]
fn two_effects_and_a_tag_on_a_default_store() {
    let mut felt = village_felt();
    felt.register_effect_handler("wave", |db, _| Ok(db.clone())).unwrap();
    felt.register_effect_handler("nod", |db, _| Ok(db.clone())).unwrap();
    let draft = EventDraft::new()
        .with("type", "event")
        .with_effect(Effect::new("wave"))
        .with_effect(Effect::new("nod"))
        .with_tag("greeting");

    let db = Database::new();
    let next = felt.add_event(&db, &draft).unwrap();
    let id = next.most_recent_entity_id().unwrap();
    assert_eq!(next.entity_count(), db.entity_count() + 1);
    assert_eq!(next.values(id, "tag").len(), 3);
}

#[test]
fn repeated_tag_values_collapse_to_one_fact() {
    let mut felt = village_felt();
    felt.register_effect_handler("shout", |db, _| Ok(db.clone())).unwrap();
    let draft = EventDraft::new()
        .with("type", "event")
        .with_effect(Effect::new("shout"))
        .with_effect(Effect::new("shout"))
        .with_tag("loud");

    let db = village();
    let next = felt.add_event(&db, &draft).unwrap();
    let id = next.most_recent_entity_id().unwrap();
    // The store is a set of facts: one `tag` fact per distinct value.
    assert_eq!(
        next.values(id, "tag"),
        vec![Value::from("loud"), Value::from("shout")]
    );
}

#[test]
fn handlers_fold_in_order() {
    let mut felt = village_felt();
    felt.register_effect_handler("double", |db: &Database, effect| {
        let id = effect.cause()?;
        let n = db.values(id, "n").first().and_then(Value::as_int).unwrap_or(0);
        db.update_property(id, "n", Value::Int(n * 2))
    })
    .unwrap();
    felt.register_effect_handler("increment", |db: &Database, effect| {
        let id = effect.cause()?;
        let n = db.values(id, "n").first().and_then(Value::as_int).unwrap_or(0);
        db.update_property(id, "n", Value::Int(n + 1))
    })
    .unwrap();

    let draft = EventDraft::new()
        .with("n", 3)
        .with_effect(Effect::new("double"))
        .with_effect(Effect::new("increment"));
    let next = felt.add_event(&village(), &draft).unwrap();
    let id = next.most_recent_entity_id().unwrap();
    assert_eq!(next.values(id, "n"), vec![Value::Int(7)]);
}

#[test]
fn missing_effect_key_aborts_the_event() {
    let felt = village_felt();
    let db = village();
    let draft = EventDraft::new()
        .with("type", "event")
        .with_effect(Effect::new("feed"))
        .with_effect(Effect::new("deplete").with("source", 3).with("amount", 1));

    let err = felt.add_event(&db, &draft).unwrap_err();
    assert!(err.to_string().contains("Missing keys: eater"));
    assert_eq!(db.values(EntityId::new(3), "food"), vec![Value::Int(3)]);
}
