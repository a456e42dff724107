//! The engine context: registries, possibility evaluation, and the
//! event/effect commit pipeline.
//!
//! A [`Felt`] value is created by the host, populated during a setup phase,
//! and then passed by reference to every evaluation. Every operation that
//! produces a store takes the prior version by reference and returns a new
//! one, so older versions stay valid for "what-if" queries.

use std::fmt;

use indexmap::IndexMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use felt_foundation::{EntityId, Error, ErrorContext, ErrorKind, Result, Value};
use felt_storage::{Database, FactStore, Schema, TxOp};

use crate::action::{Action, ActionSpec, PossibleAction};
use crate::config::FeltConfig;
use crate::effect::{Effect, EventDraft, TAG_ATTRIBUTE};
use crate::pattern::{Pattern, PatternCompiler};
use crate::registry::Registry;
use crate::rules::QueryRules;
use crate::util::rand_nth;

/// A pure store transformation registered for one effect type.
pub type EffectHandler<S> = dyn Fn(&S, &Effect) -> Result<S>;

/// Schema for stores driven by the event pipeline: `tag` is multi-valued.
#[must_use]
pub fn event_schema() -> Schema {
    Schema::new().with_many(TAG_ATTRIBUTE)
}

/// One match of a sifting pattern.
#[derive(Clone, Debug, PartialEq)]
pub struct Nugget {
    /// Name of the pattern that matched.
    pub pattern: Option<String>,
    /// Bound values keyed by variable name, in the pattern's variable order.
    pub vars: IndexMap<String, Value>,
}

impl Nugget {
    /// Returns the value bound to a variable.
    #[must_use]
    pub fn get(&self, lvar: &str) -> Option<&Value> {
        self.vars.get(lvar)
    }
}

/// The engine context.
pub struct Felt<S: FactStore = Database> {
    config: FeltConfig,
    query_rules: QueryRules,
    patterns: Registry<Pattern>,
    actions: Registry<Action>,
    effect_handlers: Registry<Box<EffectHandler<S>>>,
}

impl<S: FactStore> Default for Felt<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: FactStore> fmt::Debug for Felt<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Felt")
            .field("config", &self.config)
            .field("rule_names", &self.query_rules.names())
            .field("patterns", &self.patterns.len())
            .field("actions", &self.actions.len())
            .field("effect_handlers", &self.effect_handlers.len())
            .finish()
    }
}

impl<S: FactStore> Felt<S> {
    /// Creates an engine with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(FeltConfig::default())
    }

    /// Creates an engine with the given configuration.
    #[must_use]
    pub fn with_config(config: FeltConfig) -> Self {
        Self {
            config,
            query_rules: QueryRules::default(),
            patterns: Registry::new("sifting pattern"),
            actions: Registry::new("action"),
            effect_handlers: Registry::new("effect handler"),
        }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub fn config(&self) -> &FeltConfig {
        &self.config
    }

    // =========================================================================
    // Query rules
    // =========================================================================

    /// Installs the rule text passed to every query.
    ///
    /// Rule names recognized in the text make clauses headed by them compile
    /// verbatim. Only affects patterns and actions registered afterwards.
    ///
    /// # Errors
    /// In strict mode, returns an unrecognized rule set error if no rule
    /// names are found; the previous rules stay installed.
    pub fn set_query_rules(&mut self, rules: impl Into<String>) -> Result<()> {
        let rules = QueryRules::new(rules);
        if rules.names().is_empty() {
            if self.config.strict {
                return Err(Error::new(ErrorKind::UnrecognizedRuleSet));
            }
            tracing::warn!("no query rules found in rule text");
        }
        tracing::debug!(names = ?rules.names(), "installed query rules");
        self.query_rules = rules;
        Ok(())
    }

    /// Returns the installed rules.
    #[must_use]
    pub fn query_rules(&self) -> &QueryRules {
        &self.query_rules
    }

    /// Returns the recognized rule names.
    #[must_use]
    pub fn rule_names(&self) -> &[String] {
        self.query_rules.names()
    }

    /// Returns a compiler using the installed rule names and strictness.
    #[must_use]
    pub fn compiler(&self) -> PatternCompiler<'_> {
        PatternCompiler::new(&self.query_rules).with_strict(self.config.strict)
    }

    // =========================================================================
    // Sifting patterns
    // =========================================================================

    /// Compiles pattern lines without registering them.
    ///
    /// # Errors
    /// Returns an invalid clause shape error in strict mode.
    pub fn parse_sifting_pattern<L: AsRef<str>>(
        &self,
        lines: &[L],
        name: Option<&str>,
    ) -> Result<Pattern> {
        self.compiler().compile(lines, name)
    }

    /// Compiles and registers a named sifting pattern.
    ///
    /// # Errors
    /// Returns a duplicate registration error if the name is taken, or a
    /// compilation error; the registry is unchanged either way.
    pub fn register_sifting_pattern<L: AsRef<str>>(
        &mut self,
        name: &str,
        lines: &[L],
    ) -> Result<()> {
        if self.patterns.contains(name) {
            return Err(Error::duplicate_registration(self.patterns.kind(), name));
        }
        let pattern = self.parse_sifting_pattern(lines, Some(name))?;
        tracing::debug!(name, lvars = ?pattern.lvars, "registered sifting pattern");
        self.patterns.register(name, pattern)
    }

    /// Returns a registered sifting pattern.
    #[must_use]
    pub fn pattern(&self, name: &str) -> Option<&Pattern> {
        self.patterns.get(name)
    }

    /// Iterates registered sifting patterns in registration order.
    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.values()
    }

    /// Runs a pattern and returns one nugget per result tuple.
    ///
    /// # Errors
    /// Returns a malformed pattern error if the pattern has no query or
    /// variables, or its results do not line up with its variables. Query
    /// errors from the store are passed through.
    pub fn run_sifting_pattern(&self, store: &S, pattern: &Pattern) -> Result<Vec<Nugget>> {
        let label = pattern.name.as_deref().unwrap_or("<anonymous>");
        if pattern.query.is_empty() || pattern.lvars.is_empty() {
            return Err(Error::malformed_pattern(format!(
                "{label} has no compiled query or variable list"
            )));
        }

        let rows = store.query(&pattern.query, self.query_rules.source())?;
        rows.into_iter()
            .map(|row| {
                if row.len() != pattern.lvars.len() {
                    return Err(Error::malformed_pattern(format!(
                        "{label} expected {} values per match, got {}",
                        pattern.lvars.len(),
                        row.len()
                    )));
                }
                Ok(Nugget {
                    pattern: pattern.name.clone(),
                    vars: pattern.lvars.iter().cloned().zip(row).collect(),
                })
            })
            .collect()
    }

    /// Runs a registered pattern by name.
    ///
    /// # Errors
    /// Returns an unknown pattern error if no pattern has that name.
    pub fn run_sifting_pattern_by_name(&self, store: &S, name: &str) -> Result<Vec<Nugget>> {
        let pattern = self
            .patterns
            .get(name)
            .ok_or_else(|| Error::new(ErrorKind::UnknownPattern(name.to_string())))?;
        self.run_sifting_pattern(store, pattern)
    }

    /// Runs every registered pattern in registration order.
    ///
    /// # Errors
    /// Returns the first error any pattern produces.
    pub fn run_sifting_patterns(&self, store: &S) -> Result<Vec<Nugget>> {
        let mut nuggets = Vec::new();
        for pattern in self.patterns.values() {
            nuggets.extend(self.run_sifting_pattern(store, pattern)?);
        }
        Ok(nuggets)
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Compiles and registers an action.
    ///
    /// # Errors
    /// Returns a duplicate registration error if the name is taken, or a
    /// precondition compilation error; the registry is unchanged either way.
    pub fn register_action(&mut self, name: &str, spec: ActionSpec) -> Result<()> {
        if self.actions.contains(name) {
            return Err(Error::duplicate_registration(self.actions.kind(), name));
        }
        let action = Action::compile(name, spec, &self.compiler())?;
        tracing::debug!(
            name,
            lvars = ?action.lvars,
            unconditional = action.is_unconditional(),
            "registered action"
        );
        self.actions.register(name, action)
    }

    /// Returns a registered action.
    #[must_use]
    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.get(name)
    }

    /// Iterates registered actions in registration order.
    pub fn all_actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.values()
    }

    /// Returns every `(action, bindings)` pair currently satisfiable.
    ///
    /// Unconditional actions yield one pair with empty bindings. Duplicate
    /// tuples from the store are kept.
    ///
    /// # Errors
    /// Returns the first query error.
    pub fn possible_actions<'a>(
        &self,
        store: &S,
        actions: impl IntoIterator<Item = &'a Action>,
    ) -> Result<Vec<PossibleAction<'a>>> {
        let mut possible = Vec::new();
        for action in actions {
            possible.extend(
                self.bindings_for(store, action)?
                    .into_iter()
                    .map(|bindings| PossibleAction { action, bindings }),
            );
        }
        Ok(possible)
    }

    /// Like [`Felt::possible_actions`], grouped by action name.
    ///
    /// Actions with no satisfying tuple have no key.
    ///
    /// # Errors
    /// Returns the first query error.
    pub fn possible_actions_by_type<'a>(
        &self,
        store: &S,
        actions: impl IntoIterator<Item = &'a Action>,
    ) -> Result<IndexMap<&'a str, Vec<PossibleAction<'a>>>> {
        let mut grouped: IndexMap<&'a str, Vec<PossibleAction<'a>>> = IndexMap::new();
        for possible in self.possible_actions(store, actions)? {
            let action = possible.action;
            grouped.entry(action.name.as_str()).or_default().push(possible);
        }
        Ok(grouped)
    }

    fn bindings_for(&self, store: &S, action: &Action) -> Result<Vec<Vec<Value>>> {
        match &action.query {
            None => Ok(vec![Vec::new()]),
            Some(query) => store.query(query, self.query_rules.source()).map_err(|err| {
                err.with_context(ErrorContext::new().with_source(action.name.as_str()))
            }),
        }
    }

    // =========================================================================
    // Effects and events
    // =========================================================================

    /// Registers the handler for one effect type.
    ///
    /// # Errors
    /// Returns a duplicate registration error if a handler for that type
    /// exists.
    pub fn register_effect_handler(
        &mut self,
        effect_type: &str,
        handler: impl Fn(&S, &Effect) -> Result<S> + 'static,
    ) -> Result<()> {
        self.effect_handlers.register(effect_type, Box::new(handler))?;
        tracing::debug!(effect_type, "registered effect handler");
        Ok(())
    }

    /// Returns true if a handler is registered for `effect_type`.
    #[must_use]
    pub fn handles(&self, effect_type: &str) -> bool {
        self.effect_handlers.contains(effect_type)
    }

    /// Applies an effect through its handler.
    ///
    /// An effect without a handler leaves the store unchanged and is
    /// reported.
    ///
    /// # Errors
    /// Returns the handler's error, or in strict mode an unrecognized effect
    /// type error when no handler exists.
    pub fn process_effect(&self, store: &S, effect: &Effect) -> Result<S> {
        match self.effect_handlers.get(&effect.effect_type) {
            Some(handler) => handler(store, effect),
            None if self.config.strict => Err(Error::new(ErrorKind::UnrecognizedEffectType(
                effect.effect_type.clone(),
            ))),
            None => {
                tracing::warn!(effect_type = %effect.effect_type, "unrecognized effect type");
                Ok(store.clone())
            }
        }
    }

    /// Realizes an action into an event draft.
    #[must_use]
    pub fn realize_event(&self, action: &Action, bindings: &[Value]) -> EventDraft {
        action.realize(bindings)
    }

    /// Commits an event and folds its effects and tags into the store.
    ///
    /// The event's properties become one new entity. Each effect, in order,
    /// is caused by that entity, applied through its handler, and recorded
    /// as a `tag` equal to its type. Literal tags follow. `tag` is declared
    /// multi-valued on the store first, whatever schema it was built with.
    ///
    /// # Errors
    /// Returns the first commit or effect error; later effects are not
    /// applied.
    pub fn add_event(&self, store: &S, event: &EventDraft) -> Result<S> {
        let mut store = store
            .declare_many(TAG_ATTRIBUTE)?
            .commit(&[TxOp::Entity(event.properties.clone())])?;
        let id = store
            .most_recent_entity_id()
            .ok_or_else(|| Error::new(ErrorKind::Internal("event commit assigned no id".into())))?;
        tracing::trace!(%id, event_type = ?event.event_type(), "committed event");

        for effect in &event.effects {
            let mut effect = effect.clone();
            effect.cause = Some(id);
            store = self.process_effect(&store, &effect).map_err(|mut err| {
                let context = err.context.take().unwrap_or_default();
                err.context = Some(context.with_frame(format!("effect {}", effect.effect_type)));
                err
            })?;
            store = tag(&store, id, &effect.effect_type)?;
        }
        for literal in &event.tags {
            store = tag(&store, id, literal)?;
        }
        Ok(store)
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    /// Returns a fresh RNG seeded from the configuration.
    #[must_use]
    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.config.rng_seed)
    }

    /// Picks one possible action uniformly, realizes it, and commits it.
    ///
    /// Returns `None` when no registered action is possible.
    ///
    /// # Errors
    /// Returns the first evaluation or commit error.
    pub fn step<R: Rng + ?Sized>(
        &self,
        store: &S,
        rng: &mut R,
    ) -> Result<Option<(S, EventDraft)>> {
        let possible = self.possible_actions(store, self.all_actions())?;
        let Some(chosen) = rand_nth(rng, &possible) else {
            return Ok(None);
        };
        let event = chosen.realize();
        tracing::debug!(action = %chosen.action.name, "stepping");
        let next = self.add_event(store, &event)?;
        Ok(Some((next, event)))
    }
}

fn tag<S: FactStore>(store: &S, id: EntityId, tag: &str) -> Result<S> {
    store.commit(&[TxOp::Add {
        e: id,
        a: TAG_ATTRIBUTE.to_string(),
        v: Value::string(tag),
    }])
}
