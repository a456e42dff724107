//! Sifting patterns, actions, and effect-bearing events for Felt.
//!
//! This crate provides:
//! - [`PatternCompiler`] - Compiles line-oriented pattern text into datalog queries
//! - [`Felt`] - The engine context owning the pattern, action, and effect handler registries
//! - [`ActionSpec`] / [`Action`] - Optionally conditional actions realized into events
//! - [`EventDraft`] / [`Effect`] - Events and the effects they carry
//! - [`FeltConfig`] - Engine configuration

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod action;
pub mod clause;
pub mod config;
pub mod effect;
pub mod felt;
pub mod pattern;
pub mod registry;
pub mod rules;
pub mod util;

pub use action::{Action, ActionSpec, PossibleAction};
pub use clause::{Clause, compile_clause, find_lvars, quote_if_needed};
pub use config::FeltConfig;
pub use effect::{Effect, EventDraft, check_effect_keys};
pub use felt::{EffectHandler, Felt, Nugget, event_schema};
pub use pattern::{Pattern, PatternCompiler};
pub use registry::Registry;
pub use rules::{QueryRules, extract_rule_names};
