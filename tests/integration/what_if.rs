//! Branching evaluation against older store versions

use felt_engine::EventDraft;
use felt_foundation::{EntityId, Value};
use felt_storage::FactStore;

use crate::{village, village_felt};

#[test]
fn branches_do_not_disturb_each_other() {
    let felt = village_felt();
    let base = village();
    let eat = felt.action("eat").unwrap();
    let rest = felt.action("rest").unwrap();
    let bindings = felt.possible_actions(&base, [eat]).unwrap()[0].bindings.clone();

    let ate = felt.add_event(&base, &felt.realize_event(eat, &bindings)).unwrap();
    let rested = felt.add_event(&base, &felt.realize_event(rest, &[])).unwrap();

    let grok = EntityId::new(1);
    assert_eq!(base.values(grok, "hunger"), vec![Value::Int(8)]);
    assert_eq!(ate.values(grok, "hunger"), vec![Value::Int(0)]);
    assert_eq!(rested.values(grok, "hunger"), vec![Value::Int(8)]);

    // Both branches allocate the same next identity for their event.
    assert_eq!(ate.most_recent_entity_id(), rested.most_recent_entity_id());
    assert_eq!(felt.possible_actions(&base, [eat]).unwrap().len(), 1);
    assert_eq!(felt.possible_actions(&rested, [eat]).unwrap().len(), 1);
    assert!(felt.possible_actions(&ate, [eat]).unwrap().is_empty());
}

#[test]
fn failed_event_leaves_caller_on_prior_version() {
    let felt = village_felt();
    let base = village();
    let bad = EventDraft::new().with("type", "event").with("broken", Value::Nil);

    assert!(felt.add_event(&base, &bad).is_err());
    let rows = base
        .query(r#"[:find ?e :where [?e "type" "event"]]"#, "")
        .unwrap();
    assert!(rows.is_empty());
}
