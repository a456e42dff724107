//! Append-only, name-keyed registries.

use indexmap::IndexMap;
use indexmap::map::Entry;

use felt_foundation::{Error, Result};

/// A name-keyed store that rejects duplicate names.
///
/// Entries are never replaced or removed, and iterate in registration order.
#[derive(Debug)]
pub struct Registry<T> {
    /// What this registry holds, for error messages.
    kind: &'static str,
    entries: IndexMap<String, T>,
}

impl<T> Registry<T> {
    /// Creates an empty registry for entries of the given kind.
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: IndexMap::new(),
        }
    }

    /// Registers `value` under `name`.
    ///
    /// # Errors
    /// Returns a duplicate registration error if `name` is taken; the
    /// registry keeps the existing entry.
    pub fn register(&mut self, name: impl Into<String>, value: T) -> Result<()> {
        match self.entries.entry(name.into()) {
            Entry::Occupied(entry) => Err(Error::duplicate_registration(self.kind, entry.key())),
            Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(())
            }
        }
    }

    /// Returns the entry registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(name)
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Iterates entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates values in registration order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the kind of entry this registry holds.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}
