//! Core types, values, and errors for Felt.
//!
//! This crate provides:
//! - [`Value`] - The scalar value type stored in and returned by the fact database
//! - [`EntityId`] - Store-assigned entity identities
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod entity;
pub mod error;
pub mod value;

pub use entity::EntityId;
pub use error::{Error, ErrorContext, ErrorKind, SemanticLimit};
pub use value::Value;

/// Result type for Felt operations.
pub type Result<T> = std::result::Result<T, Error>;
