//! Query rule text and rule-name recognition.
//!
//! Rule names are found with a line-anchored scan: a name is recognized only
//! on a line that begins exactly with `[(` followed by the name, as in
//!
//! ```text
//! [
//! [(likes_food ?x) [?x "likes" "food"]]
//! [(friends ?a ?b) [?a "friend" ?b]]
//! ]
//! ```
//!
//! Indented definitions, a definition on the same line as the outer `[`,
//! and the part of a name after a `-` are not recognized. Clauses headed by
//! an unrecognized rule name compile as predicate clauses.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::util::distinct;

static RULE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\[\(([a-zA-Z0-9_]*)").expect("rule name pattern is valid"));

/// Extracts rule names from rule text, in order of first appearance.
#[must_use]
pub fn extract_rule_names(rules: &str) -> Vec<String> {
    distinct(
        RULE_NAME
            .captures_iter(rules)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string()),
    )
}

/// Raw rule text plus the rule names recognized in it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryRules {
    source: String,
    names: Vec<String>,
}

impl QueryRules {
    /// Wraps rule text and scans it for rule names.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let names = extract_rule_names(&source);
        Self { source, names }
    }

    /// Returns the raw rule text handed to the fact store.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the recognized rule names.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns true if `name` was recognized as a rule name.
    #[must_use]
    pub fn is_rule(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}
