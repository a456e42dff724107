//! Actions: named, optionally conditional operations realized into events.

use std::fmt;

use felt_foundation::{Result, Value};

use crate::clause::LVAR_MARKER;
use crate::effect::{EVENT_TYPE_KEY, EVENT_TYPE_MARKER, EventDraft, TYPE_KEY};
use crate::pattern::{Pattern, PatternCompiler, query_text};

/// Builds an event draft from a binding tuple.
pub type EventBuilder = dyn Fn(&[Value]) -> EventDraft;

/// An action as authored, before registration compiles it.
pub struct ActionSpec {
    tagline: Option<String>,
    where_lines: Option<Vec<String>>,
    find: Option<String>,
    event: Box<EventBuilder>,
}

impl ActionSpec {
    /// Creates an unconditional action spec with the given event builder.
    pub fn new(event: impl Fn(&[Value]) -> EventDraft + 'static) -> Self {
        Self {
            tagline: None,
            where_lines: None,
            find: None,
            event: Box::new(event),
        }
    }

    /// Sets the precondition pattern lines.
    #[must_use]
    pub fn with_where<S: AsRef<str>>(mut self, lines: &[S]) -> Self {
        self.where_lines = Some(lines.iter().map(|l| l.as_ref().to_string()).collect());
        self
    }

    /// Sets an explicit output projection, e.g. `"?b ?a"`.
    ///
    /// Blank text counts as no projection.
    #[must_use]
    pub fn with_find(mut self, find: impl Into<String>) -> Self {
        self.find = Some(find.into());
        self
    }

    /// Sets a short human-readable description.
    #[must_use]
    pub fn with_tagline(mut self, tagline: impl Into<String>) -> Self {
        self.tagline = Some(tagline.into());
        self
    }
}

impl fmt::Debug for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSpec")
            .field("tagline", &self.tagline)
            .field("where_lines", &self.where_lines)
            .field("find", &self.find)
            .finish_non_exhaustive()
    }
}

/// A registered action.
pub struct Action {
    /// Unique name; stamped as `eventType` on realized events.
    pub name: String,
    /// Optional description.
    pub tagline: Option<String>,
    /// Compiled precondition, if any.
    pub pattern: Option<Pattern>,
    /// Variable order of binding tuples.
    pub lvars: Vec<String>,
    /// The `:find` text of `query`.
    pub find_part: String,
    /// The `:where` text of `query`.
    pub where_part: String,
    /// Compiled query; `None` for unconditional actions.
    pub query: Option<String>,
    event: Box<EventBuilder>,
}

impl Action {
    /// Compiles a spec into an action.
    ///
    /// Without a precondition the action is unconditional. With one, an
    /// explicit projection replaces the pattern's natural projection,
    /// keeping the authored order, subset, and repeats.
    ///
    /// # Errors
    /// Returns an error if the precondition fails to compile.
    pub fn compile(name: &str, spec: ActionSpec, compiler: &PatternCompiler<'_>) -> Result<Self> {
        let ActionSpec {
            tagline,
            where_lines,
            find,
            event,
        } = spec;

        let mut action = Self {
            name: name.to_string(),
            tagline,
            pattern: None,
            lvars: Vec::new(),
            find_part: String::new(),
            where_part: String::new(),
            query: None,
            event,
        };
        let Some(lines) = where_lines else {
            return Ok(action);
        };

        let pattern = compiler.compile(&lines, Some(name))?;
        match find.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
            Some(find) => {
                action.lvars = find
                    .split_whitespace()
                    .map(|token| token.strip_prefix(LVAR_MARKER).unwrap_or(token).to_string())
                    .collect();
                action.find_part = action
                    .lvars
                    .iter()
                    .map(|lvar| format!("{LVAR_MARKER}{lvar}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                action.where_part.clone_from(&pattern.where_part);
                action.query = Some(query_text(&action.find_part, &action.where_part));
            }
            None => {
                action.lvars.clone_from(&pattern.lvars);
                action.find_part.clone_from(&pattern.find_part);
                action.where_part.clone_from(&pattern.where_part);
                action.query = Some(pattern.query.clone());
            }
        }
        action.pattern = Some(pattern);
        Ok(action)
    }

    /// Returns true if the action has no precondition.
    #[must_use]
    pub fn is_unconditional(&self) -> bool {
        self.query.is_none()
    }

    /// Looks up a variable by name in a binding tuple for this action.
    #[must_use]
    pub fn binding<'b>(&self, bindings: &'b [Value], name: &str) -> Option<&'b Value> {
        let name = name.strip_prefix(LVAR_MARKER).unwrap_or(name);
        let index = self.lvars.iter().position(|lvar| lvar == name)?;
        bindings.get(index)
    }

    /// Builds the event for a binding tuple and stamps `type` and `eventType`.
    #[must_use]
    pub fn realize(&self, bindings: &[Value]) -> EventDraft {
        let mut draft = (self.event)(bindings);
        draft.set(TYPE_KEY, EVENT_TYPE_MARKER);
        draft.set(EVENT_TYPE_KEY, self.name.as_str());
        draft
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("tagline", &self.tagline)
            .field("lvars", &self.lvars)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

/// An action whose precondition holds, with one binding tuple.
#[derive(Clone, Debug)]
pub struct PossibleAction<'a> {
    /// The satisfiable action.
    pub action: &'a Action,
    /// Values in the action's variable order. Empty for unconditional actions.
    pub bindings: Vec<Value>,
}

impl PossibleAction<'_> {
    /// Looks up a bound variable by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.action.binding(&self.bindings, name)
    }

    /// Realizes the action with these bindings.
    #[must_use]
    pub fn realize(&self) -> EventDraft {
        self.action.realize(&self.bindings)
    }
}
