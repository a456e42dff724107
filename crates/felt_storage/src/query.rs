//! Datalog queries over a [`Database`].
//!
//! Queries use the shape the pattern compiler emits:
//!
//! ```text
//! [:find ?a ?b :in $ % :where [?a "likes" ?b] (not [?b "hates" ?a])]
//! ```
//!
//! Solutions come back in index scan order and are not deduplicated.

use std::cmp::Ordering;

use felt_foundation::{Error, ErrorKind, Result, SemanticLimit, Value};

use crate::database::Database;
use crate::reader::{Form, Reader};
use crate::rules::RuleSet;

/// Maximum depth of nested rule expansion before evaluation gives up.
pub const MAX_RULE_DEPTH: usize = 64;

/// Variable bindings for one partial solution.
type Env = im::HashMap<String, Value>;

// =============================================================================
// Query Types
// =============================================================================

/// One position in a clause.
#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    /// Logic variable, named without the `?`.
    Var(String),
    /// `_`, matches anything and binds nothing.
    Blank,
    /// Literal value.
    Const(Value),
}

/// A parsed `:where` clause.
#[derive(Clone, Debug, PartialEq)]
pub enum WhereClause {
    /// `[e a v]` with the attribute and value optional.
    Pattern {
        /// Entity position.
        e: Term,
        /// Attribute position.
        a: Term,
        /// Value position.
        v: Term,
    },
    /// `[(op args*)]`, keeps solutions where the predicate holds.
    Predicate {
        /// Predicate name.
        op: String,
        /// Arguments.
        args: Vec<Term>,
    },
    /// `[(op args*) ?out]`, binds the function result.
    Function {
        /// Function name.
        op: String,
        /// Arguments.
        args: Vec<Term>,
        /// Where the result goes.
        out: Term,
    },
    /// `(not clause+)`
    Not(Vec<WhereClause>),
    /// `(not-join [?v*] clause+)`
    NotJoin {
        /// Variables shared with the enclosing query.
        vars: Vec<String>,
        /// Negated clauses.
        clauses: Vec<WhereClause>,
    },
    /// `(or branch+)`, each branch a clause or `(and clause+)`.
    Or(Vec<Vec<WhereClause>>),
    /// `(rule-name args*)`
    RuleCall {
        /// Rule name.
        name: String,
        /// Arguments.
        args: Vec<Term>,
    },
}

/// A parsed query.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    /// Projected variables, in order.
    pub find: Vec<String>,
    /// Declared inputs (`$`, `%`).
    pub inputs: Vec<String>,
    /// Where clauses, in order.
    pub clauses: Vec<WhereClause>,
}

// =============================================================================
// Parsing
// =============================================================================

impl Query {
    /// Parses query text.
    ///
    /// # Errors
    /// Returns a parse error if the text is not a query vector, or an
    /// unsupported clause error for forms the evaluator cannot run.
    pub fn parse(text: &str) -> Result<Self> {
        let Form::Vector(items) = Reader::read_one(text)? else {
            return Err(Error::parse("query must be a vector", 0));
        };

        let mut query = Query {
            find: Vec::new(),
            inputs: Vec::new(),
            clauses: Vec::new(),
        };
        let mut section: Option<&str> = None;
        for item in &items {
            if let Form::Keyword(k) = item {
                match k.as_str() {
                    "find" | "in" | "where" => section = Some(k.as_str()),
                    other => {
                        return Err(Error::parse(format!("unknown query section :{other}"), 0));
                    }
                }
                continue;
            }
            match section {
                Some("find") => {
                    let var = item.as_variable().ok_or_else(|| {
                        Error::unsupported_clause(format!("find element {item}"))
                    })?;
                    query.find.push(var.to_string());
                }
                Some("in") => {
                    let input = item
                        .as_symbol()
                        .ok_or_else(|| Error::parse(format!("invalid input {item}"), 0))?;
                    query.inputs.push(input.to_string());
                }
                Some("where") => query.clauses.push(WhereClause::from_form(item)?),
                _ => {
                    return Err(Error::parse(
                        format!("expected :find before {item}"),
                        0,
                    ));
                }
            }
        }

        if query.find.is_empty() {
            return Err(Error::parse("query has no :find variables", 0));
        }
        Ok(query)
    }

    /// Runs the query against a database with the given rules.
    ///
    /// Returns one tuple per solution, components in `find` order.
    ///
    /// # Errors
    /// Returns an error if a projected or predicate variable is unbound, a
    /// rule is unknown, or rule expansion exceeds [`MAX_RULE_DEPTH`].
    pub fn execute(&self, db: &Database, rules: &RuleSet) -> Result<Vec<Vec<Value>>> {
        let evaluator = Evaluator { db, rules };
        let solutions = evaluator.run(&self.clauses, vec![Env::new()], 0)?;
        solutions
            .iter()
            .map(|env| {
                self.find
                    .iter()
                    .map(|var| {
                        env.get(var)
                            .cloned()
                            .ok_or_else(|| Error::new(ErrorKind::UnboundVariable(var.clone())))
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect()
    }
}

impl Term {
    fn from_form(form: &Form) -> Result<Self> {
        if let Some(var) = form.as_variable() {
            return Ok(Term::Var(var.to_string()));
        }
        if form.as_symbol() == Some("_") {
            return Ok(Term::Blank);
        }
        form.to_value()
            .map(Term::Const)
            .ok_or_else(|| Error::unsupported_clause(format!("term {form}")))
    }

    fn resolve(&self, env: &Env) -> Option<Value> {
        match self {
            Term::Var(name) => env.get(name).cloned(),
            Term::Blank => None,
            Term::Const(v) => Some(v.clone()),
        }
    }
}

impl WhereClause {
    /// Parses one clause form.
    ///
    /// # Errors
    /// Returns an unsupported clause error for unrecognized shapes.
    pub fn from_form(form: &Form) -> Result<Self> {
        match form {
            Form::Vector(items) => match items.as_slice() {
                [Form::List(call)] => {
                    let (op, args) = Self::call_parts(call, form)?;
                    Ok(WhereClause::Predicate { op, args })
                }
                [Form::List(call), out] => {
                    let (op, args) = Self::call_parts(call, form)?;
                    Ok(WhereClause::Function {
                        op,
                        args,
                        out: Term::from_form(out)?,
                    })
                }
                [e] => Ok(WhereClause::Pattern {
                    e: Term::from_form(e)?,
                    a: Term::Blank,
                    v: Term::Blank,
                }),
                [e, a] => Ok(WhereClause::Pattern {
                    e: Term::from_form(e)?,
                    a: Term::from_form(a)?,
                    v: Term::Blank,
                }),
                [e, a, v] => Ok(WhereClause::Pattern {
                    e: Term::from_form(e)?,
                    a: Term::from_form(a)?,
                    v: Term::from_form(v)?,
                }),
                _ => Err(Error::unsupported_clause(form.to_string())),
            },
            Form::List(items) => {
                let Some((head, rest)) = items.split_first() else {
                    return Err(Error::unsupported_clause(form.to_string()));
                };
                match head.as_symbol() {
                    Some("not") => Ok(WhereClause::Not(Self::from_forms(rest)?)),
                    Some("not-join") => {
                        let Some((Form::Vector(vars), body)) = rest.split_first() else {
                            return Err(Error::unsupported_clause(form.to_string()));
                        };
                        let vars = vars
                            .iter()
                            .map(|v| {
                                v.as_variable()
                                    .map(ToString::to_string)
                                    .ok_or_else(|| Error::unsupported_clause(form.to_string()))
                            })
                            .collect::<Result<_>>()?;
                        Ok(WhereClause::NotJoin {
                            vars,
                            clauses: Self::from_forms(body)?,
                        })
                    }
                    Some("or") => {
                        let branches = rest
                            .iter()
                            .map(|branch| match branch {
                                Form::List(inner)
                                    if inner.first().and_then(Form::as_symbol) == Some("and") =>
                                {
                                    Self::from_forms(&inner[1..])
                                }
                                other => Ok(vec![Self::from_form(other)?]),
                            })
                            .collect::<Result<_>>()?;
                        Ok(WhereClause::Or(branches))
                    }
                    Some(name) if !name.starts_with('?') && name != "and" => {
                        Ok(WhereClause::RuleCall {
                            name: name.to_string(),
                            args: rest.iter().map(Term::from_form).collect::<Result<_>>()?,
                        })
                    }
                    _ => Err(Error::unsupported_clause(form.to_string())),
                }
            }
            _ => Err(Error::unsupported_clause(form.to_string())),
        }
    }

    pub(crate) fn from_forms(forms: &[Form]) -> Result<Vec<Self>> {
        if forms.is_empty() {
            return Err(Error::unsupported_clause("empty clause body"));
        }
        forms.iter().map(Self::from_form).collect()
    }

    fn call_parts(call: &[Form], whole: &Form) -> Result<(String, Vec<Term>)> {
        let Some((op, args)) = call.split_first() else {
            return Err(Error::unsupported_clause(whole.to_string()));
        };
        let op = op
            .as_symbol()
            .ok_or_else(|| Error::unsupported_clause(whole.to_string()))?;
        let args = args.iter().map(Term::from_form).collect::<Result<_>>()?;
        Ok((op.to_string(), args))
    }
}

// =============================================================================
// Evaluation
// =============================================================================

struct Evaluator<'a> {
    db: &'a Database,
    rules: &'a RuleSet,
}

impl Evaluator<'_> {
    fn run(&self, clauses: &[WhereClause], mut envs: Vec<Env>, depth: usize) -> Result<Vec<Env>> {
        for clause in clauses {
            if envs.is_empty() {
                break;
            }
            envs = self.clause(clause, envs, depth)?;
        }
        Ok(envs)
    }

    fn clause(&self, clause: &WhereClause, envs: Vec<Env>, depth: usize) -> Result<Vec<Env>> {
        let mut out = Vec::new();
        match clause {
            WhereClause::Pattern { e, a, v } => {
                for env in envs {
                    self.pattern(e, a, v, &env, &mut out);
                }
            }
            WhereClause::Predicate { op, args } => {
                for env in envs {
                    if predicate(op, &resolve_all(args, &env)?)? {
                        out.push(env);
                    }
                }
            }
            WhereClause::Function { op, args, out: target } => {
                for mut env in envs {
                    let result = function(op, &resolve_all(args, &env)?)?;
                    if bind(&mut env, target, result) {
                        out.push(env);
                    }
                }
            }
            WhereClause::Not(clauses) => {
                for env in envs {
                    if self.run(clauses, vec![env.clone()], depth)?.is_empty() {
                        out.push(env);
                    }
                }
            }
            WhereClause::NotJoin { vars, clauses } => {
                for env in envs {
                    let joined: Env = env
                        .iter()
                        .filter(|(k, _)| vars.contains(k))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect();
                    if self.run(clauses, vec![joined], depth)?.is_empty() {
                        out.push(env);
                    }
                }
            }
            WhereClause::Or(branches) => {
                for env in envs {
                    for branch in branches {
                        out.extend(self.run(branch, vec![env.clone()], depth)?);
                    }
                }
            }
            WhereClause::RuleCall { name, args } => {
                for env in envs {
                    self.rule_call(name, args, &env, depth, &mut out)?;
                }
            }
        }
        Ok(out)
    }

    fn pattern(&self, e: &Term, a: &Term, v: &Term, env: &Env, out: &mut Vec<Env>) {
        let entity = match e.resolve(env) {
            Some(value) => match value.as_entity() {
                Some(id) => Some(id),
                None => return,
            },
            None => None,
        };
        let resolved = a.resolve(env);
        let attribute = match &resolved {
            Some(name) => match name.as_str().or_else(|| name.as_keyword()) {
                Some(name) => Some(name),
                None => return,
            },
            None => None,
        };
        let value = v.resolve(env);

        for datom in self.db.matching(entity, attribute, value.as_ref())
        {
            let mut next = env.clone();
            if bind(&mut next, e, Value::EntityRef(datom.e))
                && bind(&mut next, a, Value::String(datom.a.clone()))
                && bind(&mut next, v, datom.v)
            {
                out.push(next);
            }
        }
    }

    fn rule_call(
        &self,
        name: &str,
        args: &[Term],
        env: &Env,
        depth: usize,
        out: &mut Vec<Env>,
    ) -> Result<()> {
        let definitions = self
            .rules
            .get(name)
            .ok_or_else(|| Error::unsupported_clause(format!("unknown rule {name}")))?;
        if depth >= MAX_RULE_DEPTH {
            return Err(Error::limit_exceeded(SemanticLimit::MaxRuleDepth {
                limit: MAX_RULE_DEPTH,
                rule: Some(name.to_string()),
            }));
        }

        for rule in definitions {
            if rule.params.len() != args.len() {
                return Err(Error::unsupported_clause(format!(
                    "rule {name} takes {} arguments, got {}",
                    rule.params.len(),
                    args.len()
                )));
            }

            // The body runs in its own scope, seeded with the bound arguments.
            let mut scope = Env::new();
            let seeded = rule.params.iter().zip(args).all(|(param, arg)| {
                arg.resolve(env)
                    .is_none_or(|value| bind(&mut scope, &Term::Var(param.clone()), value))
            });
            if !seeded {
                continue;
            }

            for solution in self.run(&rule.body, vec![scope], depth + 1)? {
                let mut next = env.clone();
                let consistent = rule.params.iter().zip(args).all(|(param, arg)| {
                    solution
                        .get(param)
                        .is_none_or(|value| bind(&mut next, arg, value.clone()))
                });
                if consistent {
                    out.push(next);
                }
            }
        }
        Ok(())
    }
}

fn resolve_all(args: &[Term], env: &Env) -> Result<Vec<Value>> {
    args.iter()
        .map(|arg| match arg {
            Term::Var(name) => env
                .get(name)
                .cloned()
                .ok_or_else(|| Error::new(ErrorKind::UnboundVariable(name.clone()))),
            Term::Blank => Err(Error::unsupported_clause("_ as a function argument")),
            Term::Const(v) => Ok(v.clone()),
        })
        .collect()
}

/// Binds `value` to `term` in `env`, or checks it against an existing binding.
fn bind(env: &mut Env, term: &Term, value: Value) -> bool {
    match term {
        Term::Var(name) => match env.get(name) {
            Some(existing) => same(existing, &value),
            None => {
                env.insert(name.clone(), value);
                true
            }
        },
        Term::Blank => true,
        Term::Const(c) => same(c, &value),
    }
}

/// Equality that lets integer literals stand in for entity identities.
fn same(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::EntityRef(_), other) | (other, Value::EntityRef(_)) => {
            other.as_entity().is_some() && a.as_entity() == b.as_entity()
        }
        (Value::String(x), Value::Keyword(y)) | (Value::Keyword(x), Value::String(y)) => x == y,
        _ => false,
    }
}

fn predicate(op: &str, args: &[Value]) -> Result<bool> {
    let pairwise = |test: fn(Ordering) -> bool| {
        args.windows(2)
            .all(|w| w[0].compare(&w[1]).is_some_and(test))
    };
    let all_equal = || {
        args.windows(2)
            .all(|w| same(&w[0], &w[1]) || w[0].compare(&w[1]) == Some(Ordering::Equal))
    };
    Ok(match op {
        "=" | "==" => all_equal(),
        "!=" | "not=" => !all_equal(),
        "<" => pairwise(Ordering::is_lt),
        ">" => pairwise(Ordering::is_gt),
        "<=" => pairwise(Ordering::is_le),
        ">=" => pairwise(Ordering::is_ge),
        _ => return Err(Error::unsupported_clause(format!("predicate {op}"))),
    })
}

fn function(op: &str, args: &[Value]) -> Result<Value> {
    if op == "str" {
        return Ok(Value::string(
            args.iter().map(ToString::to_string).collect::<String>(),
        ));
    }
    if op == "identity" {
        return args
            .first()
            .cloned()
            .ok_or_else(|| Error::unsupported_clause("identity needs an argument"));
    }

    let numbers = args
        .iter()
        .map(|v| {
            v.as_number()
                .ok_or_else(|| Error::unsupported_clause(format!("({op} ...) on {}", v.type_name())))
        })
        .collect::<Result<Vec<f64>>>()?;
    let ints: Option<Vec<i64>> = args.iter().map(Value::as_int).collect();

    let result = match (op, ints) {
        ("+", Some(ints)) => ints.iter().try_fold(0i64, |acc, n| acc.checked_add(*n)).map(Value::Int),
        ("*", Some(ints)) => ints.iter().try_fold(1i64, |acc, n| acc.checked_mul(*n)).map(Value::Int),
        ("-", Some(ints)) => match ints.split_first() {
            Some((first, [])) => first.checked_neg().map(Value::Int),
            Some((first, rest)) => rest
                .iter()
                .try_fold(*first, |acc, n| acc.checked_sub(*n))
                .map(Value::Int),
            None => None,
        },
        ("+", None) => Some(Value::Float(numbers.iter().sum())),
        ("*", None) => Some(Value::Float(numbers.iter().product())),
        ("-", None) => match numbers.split_first() {
            Some((first, [])) => Some(Value::Float(-first)),
            Some((first, rest)) => Some(Value::Float(rest.iter().fold(*first, |acc, n| acc - n))),
            None => None,
        },
        ("/", _) => match numbers.split_first() {
            Some((first, rest)) if !rest.is_empty() => {
                Some(Value::Float(rest.iter().fold(*first, |acc, n| acc / n)))
            }
            _ => None,
        },
        _ => return Err(Error::unsupported_clause(format!("function {op}"))),
    };
    result.ok_or_else(|| Error::unsupported_clause(format!("({op} ...) overflowed or had no arguments")))
}
