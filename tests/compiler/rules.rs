//! Rule-name recognition tests

use felt_engine::{QueryRules, extract_rule_names};

const RULES: &str = r#"[
[(likes_food ?x) [?x "likes" "food"]]
[(friends ?a ?b) [?a "friend" ?b]]
[(friends ?a ?b) [?b "friend" ?a]]
  [(indented ?x) [?x "indented" true]]
]"#;

#[test]
fn names_in_first_seen_order() {
    assert_eq!(extract_rule_names(RULES), vec!["likes_food", "friends"]);
}

#[test]
fn indented_definitions_are_missed() {
    let rules = QueryRules::new(RULES);
    assert!(!rules.is_rule("indented"));
    assert!(rules.is_rule("friends"));
}

#[test]
fn definition_on_the_opening_line_is_missed() {
    assert!(extract_rule_names(r#"[[(solo ?x) [?x "solo" true]]]"#).is_empty());
}

#[test]
fn source_is_kept_verbatim() {
    let rules = QueryRules::new(RULES);
    assert_eq!(rules.source(), RULES);
}
