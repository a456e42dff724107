//! Seeded simulation steps

use felt_engine::{Felt, FeltConfig, util};
use felt_storage::{Database, FactStore};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{init_tracing, village, village_felt};

fn event_count(db: &Database) -> usize {
    db.query(r#"[:find ?e :where [?e "type" "event"]]"#, "")
        .unwrap()
        .len()
}

#[test]
fn steps_commit_one_event_each() {
    init_tracing();
    let felt = village_felt();
    let mut rng = felt.rng();
    let mut db = village();

    let mut eaten = 0;
    for _ in 0..6 {
        let (next, event) = felt.step(&db, &mut rng).unwrap().expect("rest is always possible");
        if event.event_type() == Some("eat") {
            eaten += 1;
        }
        db = next;
    }
    assert_eq!(event_count(&db), 6);
    assert!(eaten <= 1);
}

#[test]
fn same_seed_same_history() {
    let run = |seed: u64| {
        let felt = village_felt();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut db = village();
        let mut history = Vec::new();
        for _ in 0..4 {
            let (next, event) = felt.step(&db, &mut rng).unwrap().unwrap();
            history.push(event.event_type().map(str::to_string));
            db = next;
        }
        history
    };
    assert_eq!(run(7), run(7));
}

#[test]
fn nothing_possible_means_no_step() {
    let felt: Felt = Felt::with_config(FeltConfig::default().with_rng_seed(3));
    let mut rng = felt.rng();
    assert!(felt.step(&Database::new(), &mut rng).unwrap().is_none());
}

#[test]
fn helpers_use_the_engine_rng() {
    let felt: Felt = Felt::with_config(FeltConfig::default().with_rng_seed(11));
    let items = ["a", "b", "c", "d"];

    let mut first = felt.rng();
    let mut second = felt.rng();
    assert_eq!(util::shuffle(&mut first, &items), util::shuffle(&mut second, &items));
    assert_eq!(util::rand_nth(&mut first, &items), util::rand_nth(&mut second, &items));

    let n = util::rand_int(&mut first, 5, 1);
    assert!((1..=5).contains(&n));
    assert_eq!(util::distinct(["a", "b", "a", "c", "b"]), vec!["a", "b", "c"]);
}
