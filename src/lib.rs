//! Felt - sifting patterns and effect-bearing events over a fact database
//!
//! This crate re-exports all layers of the Felt system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: felt_engine     - Pattern compiler, registries, actions, events
//! Layer 1: felt_storage    - Immutable fact database and datalog queries
//! Layer 0: felt_foundation - Core types (Value, EntityId, Error)
//! ```

pub use felt_engine as engine;
pub use felt_foundation as foundation;
pub use felt_storage as storage;
