//! Events and the effects they carry.
//!
//! An [`EventDraft`] is the structured record an action realizes into. Its
//! properties become one entity in the store; its effects are folded
//! through registered handlers and its tags are attached to that entity.

use std::collections::BTreeMap;

use felt_foundation::{EntityId, Error, ErrorKind, Result, Value};
use felt_storage::EntityMap;

/// Reserved effect key holding the effect's type.
pub const TYPE_KEY: &str = "type";

/// Reserved effect key holding the causing event's identity.
pub const CAUSE_KEY: &str = "cause";

/// Event property stamped with the literal `"event"`.
pub const EVENT_TYPE_MARKER: &str = "event";

/// Event property stamped with the realizing action's name.
pub const EVENT_TYPE_KEY: &str = "eventType";

/// Multi-valued attribute attached to committed events.
pub const TAG_ATTRIBUTE: &str = "tag";

// =============================================================================
// Effect
// =============================================================================

/// A typed instruction dispatched to the handler registered for its type.
#[derive(Clone, Debug, PartialEq)]
pub struct Effect {
    /// Handler name this effect dispatches to.
    pub effect_type: String,
    /// The committed event that caused this effect. Assigned by the pipeline.
    pub cause: Option<EntityId>,
    /// Everything else the handler reads.
    pub payload: BTreeMap<String, Value>,
}

impl Effect {
    /// Creates an effect of the given type with an empty payload.
    #[must_use]
    pub fn new(effect_type: impl Into<String>) -> Self {
        Self {
            effect_type: effect_type.into(),
            cause: None,
            payload: BTreeMap::new(),
        }
    }

    /// Adds a payload entry. Reserved keys are ignored with a warning.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key == TYPE_KEY || key == CAUSE_KEY {
            tracing::warn!(
                effect_type = %self.effect_type,
                key = %key,
                "ignoring reserved effect key"
            );
            return self;
        }
        self.payload.insert(key, value.into());
        self
    }

    /// Returns a payload value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Returns the causing event, or an error naming this effect if unset.
    ///
    /// # Errors
    /// Returns an internal error if the effect was never dispatched by an event.
    pub fn cause(&self) -> Result<EntityId> {
        self.cause.ok_or_else(|| {
            Error::new(ErrorKind::Internal(format!(
                "effect {} has no cause",
                self.effect_type
            )))
        })
    }

    /// Every key this effect carries: `type`, `cause` if set, then payload keys.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys = vec![TYPE_KEY.to_string()];
        if self.cause.is_some() {
            keys.push(CAUSE_KEY.to_string());
        }
        keys.extend(self.payload.keys().cloned());
        keys
    }
}

/// Validates an effect's keys for a handler.
///
/// `type` and `cause` are always required. Returns the keys that are in
/// neither `required` nor `optional`; these are reported but never fatal.
///
/// # Errors
/// Returns an effect keys error if a required key is missing.
pub fn check_effect_keys(
    effect: &Effect,
    required: &[&str],
    optional: &[&str],
) -> Result<Vec<String>> {
    let mut expected: Vec<String> = required.iter().map(ToString::to_string).collect();
    for reserved in [TYPE_KEY, CAUSE_KEY] {
        if !expected.iter().any(|k| k == reserved) {
            expected.push(reserved.to_string());
        }
    }

    let actual = effect.keys();
    let missing: Vec<String> = expected
        .iter()
        .filter(|k| !actual.contains(*k))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(Error::new(ErrorKind::EffectKeys {
            effect_type: effect.effect_type.clone(),
            expected,
            actual,
            missing,
        }));
    }

    let extra: Vec<String> = actual
        .into_iter()
        .filter(|k| !expected.contains(k) && !optional.contains(&k.as_str()))
        .collect();
    if !extra.is_empty() {
        tracing::warn!(
            effect_type = %effect.effect_type,
            keys = ?extra,
            "unexpected keys for effect"
        );
    }
    Ok(extra)
}

// =============================================================================
// EventDraft
// =============================================================================

/// A realized but uncommitted event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventDraft {
    /// Base properties committed as the event entity.
    pub properties: EntityMap,
    /// Effects folded in order after the entity is committed.
    pub effects: Vec<Effect>,
    /// Literal tags added after every effect.
    pub tags: Vec<String>,
}

impl EventDraft {
    /// Creates an empty draft.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a base property.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Appends an effect.
    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Appends a literal tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Sets a base property in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Returns a base property.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// The name of the action this draft was realized from, if stamped.
    #[must_use]
    pub fn event_type(&self) -> Option<&str> {
        self.get(EVENT_TYPE_KEY).and_then(Value::as_str)
    }
}
