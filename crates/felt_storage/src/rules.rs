//! Query rules: named, reusable groups of clauses.
//!
//! A rule set is written as a vector of rule definitions:
//!
//! ```text
//! [[(likes_food ?x) [?x "likes" "food"]]
//!  [(friends ?a ?b) [?a "friend" ?b]]
//!  [(friends ?a ?b) [?b "friend" ?a]]]
//! ```
//!
//! Several definitions under one name are alternatives.

use std::collections::BTreeMap;

use felt_foundation::{Error, Result};

use crate::query::WhereClause;
use crate::reader::{Form, Reader};

/// One rule definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    /// Rule name.
    pub name: String,
    /// Head variables, without `?`.
    pub params: Vec<String>,
    /// Body clauses.
    pub body: Vec<WhereClause>,
}

/// Parsed rule definitions keyed by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleSet {
    rules: BTreeMap<String, Vec<Rule>>,
}

impl RuleSet {
    /// Parses rule text. Empty or whitespace-only text yields an empty set.
    ///
    /// # Errors
    /// Returns an error if the text is not a vector of rule definitions.
    pub fn parse(text: &str) -> Result<Self> {
        let mut set = RuleSet::default();
        for form in Reader::read_all(text)? {
            match &form {
                Form::Vector(items) if matches!(items.first(), Some(Form::List(_))) => {
                    set.insert(Self::definition(&form)?);
                }
                Form::Vector(items) => {
                    for item in items {
                        set.insert(Self::definition(item)?);
                    }
                }
                other => {
                    return Err(Error::parse(
                        format!("expected a vector of rules, found {other}"),
                        0,
                    ));
                }
            }
        }
        Ok(set)
    }

    /// Returns the definitions of a rule.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[Rule]> {
        self.rules.get(name).map(Vec::as_slice)
    }

    /// Iterates rule names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Returns the number of distinct rule names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rules are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn insert(&mut self, rule: Rule) {
        self.rules.entry(rule.name.clone()).or_default().push(rule);
    }

    fn definition(form: &Form) -> Result<Rule> {
        let invalid = || Error::parse(format!("invalid rule definition {form}"), 0);
        let Form::Vector(items) = form else {
            return Err(invalid());
        };
        let Some((Form::List(head), body)) = items.split_first() else {
            return Err(invalid());
        };
        let Some((name, params)) = head.split_first() else {
            return Err(invalid());
        };
        let name = name.as_symbol().ok_or_else(invalid)?;
        let params = params
            .iter()
            .map(|p| p.as_variable().map(ToString::to_string).ok_or_else(invalid))
            .collect::<Result<Vec<_>>>()?;
        Ok(Rule {
            name: name.to_string(),
            params,
            body: WhereClause::from_forms(body)?,
        })
    }
}
