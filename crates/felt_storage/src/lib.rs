//! Immutable versioned fact database and datalog queries for Felt.
//!
//! This crate provides:
//! - [`Database`] - Persistent entity/attribute/value store with structural sharing
//! - [`FactStore`] - The contract the engine requires from a fact store
//! - [`Query`] - Parsed datalog queries and their evaluator
//! - [`RuleSet`] - Named query rules callable from `:where` clauses
//! - [`Form`] - EDN-style reader for query and rule text

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod database;
pub mod query;
pub mod reader;
pub mod rules;
#[cfg(feature = "serde")]
pub mod snapshot;
pub mod store;

pub use database::{Database, Datom, Entity, EntityMap, Schema, TxOp};
pub use query::{Query, Term, WhereClause};
pub use reader::{Form, Reader};
pub use rules::{Rule, RuleSet};
pub use store::FactStore;
