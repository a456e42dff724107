//! Reader for the EDN-style text used by queries and rule sets.
//!
//! The reader converts source text into a tree of [`Form`]s. Commas are
//! whitespace and `;` starts a comment that runs to the end of the line.

use std::fmt;

use felt_foundation::{Error, Result, Value};

/// A form read from query or rule text.
#[derive(Clone, Debug, PartialEq)]
pub enum Form {
    /// `( ... )`
    List(Vec<Form>),
    /// `[ ... ]`
    Vector(Vec<Form>),
    /// Bare symbol such as `?x`, `_`, `$`, or `<`.
    Symbol(String),
    /// `:name`, stored without the colon.
    Keyword(String),
    /// Double-quoted string with escapes resolved.
    Str(String),
    /// Integer literal.
    Int(i64),
    /// Floating point literal.
    Float(f64),
    /// `true` or `false`.
    Bool(bool),
    /// `nil`.
    Nil,
}

impl Form {
    /// Returns the symbol name if this form is a symbol.
    #[must_use]
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Self::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the logic variable name (without `?`) if this form is one.
    #[must_use]
    pub fn as_variable(&self) -> Option<&str> {
        self.as_symbol()
            .and_then(|s| s.strip_prefix('?'))
            .filter(|s| !s.is_empty())
    }

    /// Converts a literal form into a value.
    ///
    /// Returns `None` for lists, vectors, and symbols.
    #[must_use]
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Self::Keyword(k) => Some(Value::keyword(k)),
            Self::Str(s) => Some(Value::string(s)),
            Self::Int(n) => Some(Value::Int(*n)),
            Self::Float(n) => Some(Value::Float(*n)),
            Self::Bool(b) => Some(Value::Bool(*b)),
            Self::Nil => Some(Value::Nil),
            Self::List(_) | Self::Vector(_) | Self::Symbol(_) => None,
        }
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn seq(f: &mut fmt::Formatter<'_>, items: &[Form]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }
        match self {
            Self::List(items) => {
                write!(f, "(")?;
                seq(f, items)?;
                write!(f, ")")
            }
            Self::Vector(items) => {
                write!(f, "[")?;
                seq(f, items)?;
                write!(f, "]")
            }
            Self::Symbol(s) => write!(f, "{s}"),
            Self::Keyword(k) => write!(f, ":{k}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Nil => write!(f, "nil"),
        }
    }
}

/// Reader over a source string.
pub struct Reader<'src> {
    /// Source text being read.
    source: &'src str,
    /// Current byte offset in source.
    position: usize,
}

impl<'src> Reader<'src> {
    /// Creates a new reader for the given source.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            position: 0,
        }
    }

    /// Reads every top-level form in `source`.
    ///
    /// # Errors
    /// Returns a parse error on unbalanced delimiters, unterminated strings,
    /// or malformed numbers.
    pub fn read_all(source: &str) -> Result<Vec<Form>> {
        let mut reader = Reader::new(source);
        let mut forms = Vec::new();
        while let Some(form) = reader.next_form()? {
            forms.push(form);
        }
        Ok(forms)
    }

    /// Reads exactly one form, rejecting trailing input.
    ///
    /// # Errors
    /// Returns a parse error if the source is empty, malformed, or holds
    /// more than one form.
    pub fn read_one(source: &str) -> Result<Form> {
        let mut reader = Reader::new(source);
        let form = reader
            .next_form()?
            .ok_or_else(|| Error::parse("expected a form", 0))?;
        if reader.next_form()?.is_some() {
            return Err(Error::parse("unexpected trailing input", reader.position));
        }
        Ok(form)
    }

    /// Returns the next form, or `None` at end of input.
    ///
    /// # Errors
    /// Returns a parse error on malformed input.
    pub fn next_form(&mut self) -> Result<Option<Form>> {
        self.skip_whitespace();
        let Some(c) = self.peek_char() else {
            return Ok(None);
        };
        let start = self.position;
        let form = match c {
            '(' => {
                self.advance();
                Form::List(self.read_seq(')')?)
            }
            '[' => {
                self.advance();
                Form::Vector(self.read_seq(']')?)
            }
            ')' | ']' => {
                return Err(Error::parse(format!("unexpected '{c}'"), start));
            }
            '"' => self.read_string()?,
            ':' => {
                self.advance();
                let name = self.read_token();
                if name.is_empty() {
                    return Err(Error::parse("empty keyword", start));
                }
                Form::Keyword(name.to_string())
            }
            _ => {
                let token = self.read_token();
                classify_token(token, start)?
            }
        };
        Ok(Some(form))
    }

    fn read_seq(&mut self, close: char) -> Result<Vec<Form>> {
        let open_at = self.position - 1;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek_char() {
                None => {
                    return Err(Error::parse(
                        format!("unclosed delimiter, expected '{close}'"),
                        open_at,
                    ));
                }
                Some(c) if c == close => {
                    self.advance();
                    return Ok(items);
                }
                Some(_) => {
                    if let Some(form) = self.next_form()? {
                        items.push(form);
                    }
                }
            }
        }
    }

    fn read_string(&mut self) -> Result<Form> {
        let start = self.position;
        self.advance();
        let mut out = String::new();
        loop {
            match self.advance() {
                None => return Err(Error::parse("unterminated string", start)),
                Some('"') => return Ok(Form::Str(out)),
                Some('\\') => match self.advance() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(other) => out.push(other),
                    None => return Err(Error::parse("unterminated string", start)),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn read_token(&mut self) -> &'src str {
        let source = self.source;
        let start = self.position;
        while let Some(c) = self.peek_char() {
            if is_terminator(c) {
                break;
            }
            self.advance();
        }
        &source[start..self.position]
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() || c == ',' {
                self.advance();
            } else if c == ';' {
                while let Some(c) = self.advance() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.position..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.position += c.len_utf8();
        Some(c)
    }
}

fn is_terminator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '(' | ')' | '[' | ']' | '"' | ';')
}

fn classify_token(token: &str, offset: usize) -> Result<Form> {
    match token {
        "true" => return Ok(Form::Bool(true)),
        "false" => return Ok(Form::Bool(false)),
        "nil" => return Ok(Form::Nil),
        _ => {}
    }
    if looks_numeric(token) {
        if let Ok(n) = token.parse::<i64>() {
            return Ok(Form::Int(n));
        }
        return token
            .parse::<f64>()
            .map(Form::Float)
            .map_err(|_| Error::parse(format!("invalid number: {token}"), offset));
    }
    Ok(Form::Symbol(token.to_string()))
}

fn looks_numeric(token: &str) -> bool {
    let digits = token.strip_prefix(['-', '+']).unwrap_or(token);
    digits.starts_with(|c: char| c.is_ascii_digit())
        || (digits.starts_with('.') && digits[1..].starts_with(|c: char| c.is_ascii_digit()))
}
