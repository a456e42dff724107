//! The fact-store contract the engine is written against.

use felt_foundation::{EntityId, Result, Value};

use crate::database::{Database, TxOp};
use crate::query::Query;
use crate::rules::RuleSet;

/// An immutable, versioned fact store.
///
/// Every operation takes `&self` and returns a new version; the receiver is
/// never modified, so older versions stay valid for "what-if" evaluation.
pub trait FactStore: Clone {
    /// Evaluates query text against this version with the given rule text.
    ///
    /// Returns one tuple per solution in the engine's natural order,
    /// without deduplication.
    ///
    /// # Errors
    /// Returns an error if the query or rules cannot be parsed or evaluated.
    fn query(&self, query: &str, rules: &str) -> Result<Vec<Vec<Value>>>;

    /// Applies a sequence of operations and returns the new version.
    ///
    /// # Errors
    /// Returns an error if an operation is invalid for this store.
    fn commit(&self, ops: &[TxOp]) -> Result<Self>;

    /// Identity of the most recently committed entity.
    fn most_recent_entity_id(&self) -> Option<EntityId>;

    /// Returns a version where `attribute` holds any number of values, so
    /// adding a value never replaces an earlier one.
    ///
    /// # Errors
    /// Returns an error if the store cannot make the attribute multi-valued.
    fn declare_many(&self, attribute: &str) -> Result<Self>;
}

impl FactStore for Database {
    fn query(&self, query: &str, rules: &str) -> Result<Vec<Vec<Value>>> {
        let query = Query::parse(query)?;
        let rules = RuleSet::parse(rules)?;
        query.execute(self, &rules)
    }

    fn commit(&self, ops: &[TxOp]) -> Result<Self> {
        self.transact(ops)
    }

    fn most_recent_entity_id(&self) -> Option<EntityId> {
        self.last_allocated()
    }

    fn declare_many(&self, attribute: &str) -> Result<Self> {
        Ok(self.with_many(attribute))
    }
}
