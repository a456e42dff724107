//! Entity identifiers assigned by the fact database.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identity of an entity in the fact database.
///
/// Identities are handed out by the store from a monotonically increasing
/// counter, so a greater ordinal always means a more recently created entity.
/// Zero is never allocated.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntityId(pub u64);

impl EntityId {
    /// The first identity a fresh store allocates.
    pub const FIRST: EntityId = EntityId(1);

    /// Creates an entity ID from its raw ordinal.
    #[must_use]
    pub const fn new(ordinal: u64) -> Self {
        Self(ordinal)
    }

    /// Returns the raw ordinal of this identity.
    #[must_use]
    pub const fn ordinal(self) -> u64 {
        self.0
    }

    /// Returns the identity allocated immediately after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(ordinal: u64) -> Self {
        Self(ordinal)
    }
}
