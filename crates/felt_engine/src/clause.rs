//! Compilation of single lines of pattern text into query clauses.
//!
//! A line is either a compound form starting with `(` or a simple clause of
//! one to three whitespace-separated parts: `entity attribute? value?`.

use felt_foundation::{Error, ErrorKind, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::rules::QueryRules;
use crate::util::distinct;

/// Leading marker of a logic variable.
pub const LVAR_MARKER: char = '?';

/// Connectives whose variables stay scoped inside the clause.
pub const SCOPING_CONNECTIVES: [&str; 3] = ["or", "not", "not-join"];

/// Bare words passed through unquoted in simple clauses.
pub const LITERAL_KEYWORDS: [&str; 3] = ["true", "false", "nil"];

static LVAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\?[a-zA-Z_][a-zA-Z0-9_]*").expect("lvar pattern is valid"));

/// One compiled line of a pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clause {
    /// The clause as query text.
    pub compiled: String,
    /// Logic variables the clause exports to its pattern, first-seen order.
    pub lvars: Vec<String>,
    /// The trimmed source line.
    pub original: String,
}

/// Finds every logic variable in `text`, without the marker, in order.
///
/// Duplicates are kept.
#[must_use]
pub fn find_lvars(text: &str) -> Vec<String> {
    LVAR.find_iter(text)
        .map(|m| m.as_str()[LVAR_MARKER.len_utf8()..].to_string())
        .collect()
}

/// Returns `part` unchanged if it can stand in a clause as-is, otherwise
/// wrapped in double quotes.
///
/// Variables, `true`/`false`/`nil`, numbers, and already-quoted strings pass
/// through. Applying this to its own output changes nothing.
#[must_use]
pub fn quote_if_needed(part: &str) -> String {
    if part.starts_with(LVAR_MARKER)
        || LITERAL_KEYWORDS.contains(&part)
        || is_number(part)
        || is_quoted(part)
    {
        part.to_string()
    } else {
        format!("\"{part}\"")
    }
}

// Unlike a prefix parse, the whole token must be a number: `3rd`, `12abc`
// and `Infinity` are quoted.
fn is_number(part: &str) -> bool {
    let digits = part.strip_prefix(['-', '+']).unwrap_or(part);
    let numeric_start = digits.starts_with(|c: char| c.is_ascii_digit())
        || (digits.starts_with('.') && digits[1..].starts_with(|c: char| c.is_ascii_digit()));
    numeric_start && part.parse::<f64>().is_ok()
}

fn is_quoted(part: &str) -> bool {
    part.len() >= 2 && part.starts_with('"') && part.ends_with('"')
}

/// Returns the head of a compound line: its first token minus the `(`.
#[must_use]
pub fn clause_head(line: &str) -> Option<&str> {
    line.split_whitespace().next()?.strip_prefix('(')
}

/// Compiles one line of pattern text.
///
/// Compound lines headed by `or`, `not`, or `not-join` are kept verbatim and
/// export no variables. Compound lines headed by a recognized rule name are
/// kept verbatim. Other compound lines are predicate or function calls and
/// get wrapped in `[...]`. Simple lines have each part quoted as needed and
/// are wrapped in `[...]`.
///
/// A simple line without 1 to 3 parts is reported and compiled anyway,
/// unless `strict` is set.
///
/// # Errors
/// Returns an invalid clause shape error in strict mode.
pub fn compile_clause(line: &str, rules: &QueryRules, strict: bool) -> Result<Clause> {
    let line = line.trim();
    let mut lvars = distinct(find_lvars(line));

    let compiled = if line.starts_with('(') {
        let head = clause_head(line).unwrap_or_default();
        if SCOPING_CONNECTIVES.contains(&head) {
            lvars.clear();
            line.to_string()
        } else if rules.is_rule(head) {
            line.to_string()
        } else {
            format!("[{line}]")
        }
    } else {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() || parts.len() > 3 {
            if strict {
                return Err(Error::new(ErrorKind::InvalidClauseShape(line.to_string())));
            }
            tracing::warn!(line, parts = parts.len(), "invalid query line");
        }
        let quoted: Vec<String> = parts.iter().map(|part| quote_if_needed(part)).collect();
        format!("[{}]", quoted.join(" "))
    };

    Ok(Clause {
        compiled,
        lvars,
        original: line.to_string(),
    })
}
