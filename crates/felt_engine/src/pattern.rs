//! Sifting patterns: ordered lines of pattern text compiled into one query.

use felt_foundation::{ErrorContext, Result};

use crate::clause::{Clause, LVAR_MARKER, compile_clause};
use crate::rules::QueryRules;
use crate::util::distinct;

/// A compiled sifting pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    /// Registered name; `None` for action preconditions.
    pub name: Option<String>,
    /// Exported logic variables, deduplicated in first-seen clause order.
    pub lvars: Vec<String>,
    /// Compiled clauses in input order.
    pub clauses: Vec<Clause>,
    /// The `:find` projection text.
    pub find_part: String,
    /// The `:where` clause text.
    pub where_part: String,
    /// The full query text.
    pub query: String,
}

/// Builds query text for a projection and where-clause text.
///
/// The query takes the database as `$` and the rule set as `%`.
#[must_use]
pub fn query_text(find_part: &str, where_part: &str) -> String {
    format!("[:find {find_part} :in $ % :where {where_part}]")
}

/// Compiles pattern text against a set of recognized rule names.
#[derive(Clone, Copy, Debug)]
pub struct PatternCompiler<'a> {
    rules: &'a QueryRules,
    strict: bool,
}

impl<'a> PatternCompiler<'a> {
    /// Creates a compiler that treats `rules`' names as rule calls.
    #[must_use]
    pub fn new(rules: &'a QueryRules) -> Self {
        Self {
            rules,
            strict: false,
        }
    }

    /// Sets whether malformed simple clauses are errors.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Compiles one line. See [`compile_clause`].
    ///
    /// # Errors
    /// Returns an invalid clause shape error in strict mode.
    pub fn compile_clause(&self, line: &str) -> Result<Clause> {
        compile_clause(line, self.rules, self.strict)
    }

    /// Compiles ordered lines into a pattern.
    ///
    /// The same lines always compile to byte-identical output.
    ///
    /// # Errors
    /// Returns an invalid clause shape error in strict mode.
    pub fn compile<S: AsRef<str>>(&self, lines: &[S], name: Option<&str>) -> Result<Pattern> {
        let clauses = lines
            .iter()
            .map(|line| {
                self.compile_clause(line.as_ref()).map_err(|err| {
                    let mut context = ErrorContext::new().with_line(line.as_ref().trim());
                    if let Some(name) = name {
                        context = context.with_source(name);
                    }
                    err.with_context(context)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let lvars = distinct(clauses.iter().flat_map(|c| c.lvars.iter().cloned()));
        let find_part = lvars
            .iter()
            .map(|lvar| format!("{LVAR_MARKER}{lvar}"))
            .collect::<Vec<_>>()
            .join(" ");
        let where_part = clauses
            .iter()
            .map(|c| c.compiled.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let query = query_text(&find_part, &where_part);

        Ok(Pattern {
            name: name.map(ToString::to_string),
            lvars,
            clauses,
            find_part,
            where_part,
            query,
        })
    }
}
