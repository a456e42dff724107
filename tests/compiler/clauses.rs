//! Clause compilation tests

use felt_engine::{QueryRules, compile_clause, find_lvars, quote_if_needed};
use proptest::prelude::*;

fn compile(line: &str) -> (String, Vec<String>) {
    let rules = QueryRules::new("[\n[(befriends ?a ?b) [?a \"friend\" ?b]]\n]");
    let clause = compile_clause(line, &rules, false).unwrap();
    (clause.compiled, clause.lvars)
}

// =============================================================================
// Simple Clauses
// =============================================================================

#[test]
fn single_entity_clause() {
    assert_eq!(compile("?x"), ("[?x]".to_string(), vec!["x".to_string()]));
}

#[test]
fn two_part_clause() {
    assert_eq!(compile("?x hungry").0, r#"[?x "hungry"]"#);
}

#[test]
fn literal_keywords_and_numbers_stay_bare() {
    assert_eq!(compile("?x alive true").0, r#"[?x "alive" true]"#);
    assert_eq!(compile("?x spouse nil").0, r#"[?x "spouse" nil]"#);
    assert_eq!(compile("?x age 42").0, r#"[?x "age" 42]"#);
    assert_eq!(compile("?x weight -1.5").0, r#"[?x "weight" -1.5]"#);
}

#[test]
fn quoted_tokens_are_not_requoted() {
    assert_eq!(compile(r#"?x name "grok""#).0, r#"[?x "name" "grok"]"#);
}

#[test]
fn surrounding_whitespace_is_ignored() {
    assert_eq!(compile("   ?x    likes\tfood  ").0, r#"[?x "likes" "food"]"#);
}

#[test]
fn oversized_clause_compiles_best_effort() {
    let (compiled, lvars) = compile("?x likes ?y very much");
    assert_eq!(compiled, r#"[?x "likes" ?y "very" "much"]"#);
    assert_eq!(lvars, vec!["x", "y"]);
}

// =============================================================================
// Compound Clauses
// =============================================================================

#[test]
fn negation_hides_variables() {
    let (compiled, lvars) = compile(r#"(not [?x "hates" ?y])"#);
    assert_eq!(compiled, r#"(not [?x "hates" ?y])"#);
    assert!(lvars.is_empty());
}

#[test]
fn not_join_hides_variables() {
    let (_, lvars) = compile(r#"(not-join [?x] [?x "hates" ?z])"#);
    assert!(lvars.is_empty());
}

#[test]
fn disjunction_hides_variables() {
    let (_, lvars) = compile(r#"(or [?x "likes" "food"] [?x "likes" "rocks"])"#);
    assert!(lvars.is_empty());
}

#[test]
fn rule_call_is_verbatim_and_exports_variables() {
    let (compiled, lvars) = compile("(befriends ?a ?b)");
    assert_eq!(compiled, "(befriends ?a ?b)");
    assert_eq!(lvars, vec!["a", "b"]);
}

#[test]
fn predicate_is_wrapped() {
    let (compiled, lvars) = compile("(< ?age 18)");
    assert_eq!(compiled, "[(< ?age 18)]");
    assert_eq!(lvars, vec!["age"]);
}

#[test]
fn function_binding_is_wrapped() {
    let (compiled, lvars) = compile("(+ ?a 1) ?b");
    assert_eq!(compiled, "[(+ ?a 1) ?b]");
    assert_eq!(lvars, vec!["a", "b"]);
}

#[test]
fn unregistered_rule_is_treated_as_predicate() {
    assert_eq!(compile("(strangers ?a ?b)").0, "[(strangers ?a ?b)]");
}

// =============================================================================
// Variable Scanning
// =============================================================================

#[test]
fn variables_need_a_leading_letter_or_underscore() {
    assert_eq!(find_lvars("?a ?_b ?1c ?"), vec!["a", "_b"]);
}

#[test]
fn quoting_is_token_local() {
    assert_eq!(quote_if_needed("food"), r#""food""#);
    assert_eq!(quote_if_needed("?food"), "?food");
    assert_eq!(quote_if_needed("3rd"), r#""3rd""#);
}

proptest! {
    #[test]
    fn quoting_is_idempotent(token in "[a-z0-9?\"._-]{1,8}") {
        let once = quote_if_needed(&token);
        prop_assert_eq!(quote_if_needed(&once), once);
    }

    #[test]
    fn simple_clauses_are_bracketed(parts in prop::collection::vec("[a-z]{1,5}", 1..=3)) {
        let (compiled, lvars) = compile(&parts.join(" "));
        prop_assert!(compiled.starts_with('[') && compiled.ends_with(']'));
        prop_assert!(lvars.is_empty());
    }
}
