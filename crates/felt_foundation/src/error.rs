//! Error types for the Felt system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

use crate::entity::EntityId;

/// The main error type for Felt operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a duplicate registration error.
    #[must_use]
    pub fn duplicate_registration(registry: &'static str, name: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateRegistration {
            registry,
            name: name.into(),
        })
    }

    /// Creates a malformed pattern error.
    #[must_use]
    pub fn malformed_pattern(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedPattern(message.into()))
    }

    /// Creates an entity not found error.
    #[must_use]
    pub fn entity_not_found(id: EntityId) -> Self {
        Self::new(ErrorKind::EntityNotFound(id))
    }

    /// Creates a parse error at the given byte offset.
    #[must_use]
    pub fn parse(message: impl Into<String>, offset: usize) -> Self {
        Self::new(ErrorKind::ParseError {
            message: message.into(),
            offset,
        })
    }

    /// Creates an unsupported clause error.
    #[must_use]
    pub fn unsupported_clause(clause: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedClause(clause.into()))
    }

    /// Creates a semantic limit exceeded error.
    #[must_use]
    pub fn limit_exceeded(limit: SemanticLimit) -> Self {
        Self::new(ErrorKind::LimitExceeded(limit))
    }

    /// Returns true if this error is a duplicate registration.
    #[must_use]
    pub fn is_duplicate_registration(&self) -> bool {
        matches!(self.kind, ErrorKind::DuplicateRegistration { .. })
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// A pattern, action, or effect handler name was registered twice.
    #[error("a {registry} named {name} has already been registered")]
    DuplicateRegistration {
        /// Which registry rejected the name.
        registry: &'static str,
        /// The rejected name.
        name: String,
    },

    /// A sifting pattern cannot be executed.
    #[error("invalid sifting pattern: {0}")]
    MalformedPattern(String),

    /// No sifting pattern is registered under the given name.
    #[error("there is no registered sifting pattern named {0}")]
    UnknownPattern(String),

    /// An effect is missing keys its handler requires.
    #[error(
        "incorrect keys for {effect_type} effect\n  Expected keys: {}\n  Actual keys: {}\n  Missing keys: {}",
        .expected.join(", "),
        .actual.join(", "),
        .missing.join(", ")
    )]
    EffectKeys {
        /// The effect's type.
        effect_type: String,
        /// Required keys, including the reserved ones.
        expected: Vec<String>,
        /// Keys the effect actually carries.
        actual: Vec<String>,
        /// Required keys that are absent.
        missing: Vec<String>,
    },

    /// No effect handler is registered for the effect's type (strict mode).
    #[error("unrecognized effect type: {0}")]
    UnrecognizedEffectType(String),

    /// The rule text yielded no rule names (strict mode).
    #[error("no query rules found")]
    UnrecognizedRuleSet,

    /// A simple clause does not have 1 to 3 parts (strict mode).
    #[error("invalid query line: {0}")]
    InvalidClauseShape(String),

    /// Entity was not found in storage.
    #[error("entity not found: {0:?}")]
    EntityNotFound(EntityId),

    /// Nil cannot be stored as an attribute value.
    #[error("cannot store nil for attribute {0}")]
    NilValue(String),

    /// Parse error in query or rule text.
    #[error("parse error at offset {offset}: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Byte offset into the source text.
        offset: usize,
    },

    /// A query projects a variable that no clause binds.
    #[error("unbound variable in query: ?{0}")]
    UnboundVariable(String),

    /// The query engine does not understand a clause.
    #[error("unsupported clause: {0}")]
    UnsupportedClause(String),

    /// Semantic limit exceeded (kill switch triggered).
    #[error("limit exceeded: {0}")]
    LimitExceeded(SemanticLimit),

    /// Snapshot encoding or decoding failed.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Semantic limits (kill switches) that can be exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticLimit {
    /// Maximum nested rule expansion depth exceeded.
    MaxRuleDepth {
        /// The configured limit.
        limit: usize,
        /// The rule being expanded when the limit was hit.
        rule: Option<String>,
    },
}

impl fmt::Display for SemanticLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxRuleDepth { limit, rule } => {
                write!(f, "max rule depth ({limit}) exceeded")?;
                if let Some(rule) = rule {
                    write!(f, " in rule {rule}")?;
                }
                Ok(())
            }
        }
    }
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Pattern, action, or event name.
    pub source: Option<String>,
    /// Line of pattern text being processed.
    pub line: Option<String>,
    /// Stack of operations that led to the error.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source name.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the offending line of pattern text.
    #[must_use]
    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.line = Some(line.into());
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "in {source}")?;
        }
        if let Some(line) = &self.line {
            write!(f, " at line {line:?}")?;
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  in {frame}")?;
            }
        }
        Ok(())
    }
}
