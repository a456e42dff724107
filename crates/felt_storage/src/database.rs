//! Immutable fact database with structural sharing.
//!
//! A [`Database`] is a set of entity/attribute/value facts ([`Datom`]s) kept
//! in two persistent indices. Every commit returns a new `Database`; the
//! input version is untouched and stays queryable.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use felt_foundation::{EntityId, Error, ErrorKind, Result, Value};
use im::OrdSet;

/// Attribute name shared between indices.
pub type Attr = Arc<str>;

/// A whole entity to be committed: attribute name to value.
pub type EntityMap = BTreeMap<String, Value>;

/// A single fact: entity `e` has value `v` for attribute `a`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Datom {
    /// The entity the fact is about.
    pub e: EntityId,
    /// The attribute name.
    pub a: Attr,
    /// The value.
    pub v: Value,
}

/// One change inside a transaction.
#[derive(Clone, Debug, PartialEq)]
pub enum TxOp {
    /// Create a new entity with the given attributes. The store assigns a
    /// fresh identity.
    Entity(EntityMap),
    /// Add a value for an attribute of an existing entity.
    Add {
        /// Target entity.
        e: EntityId,
        /// Attribute name.
        a: String,
        /// Value to add.
        v: Value,
    },
    /// Retract one value of an attribute.
    Retract {
        /// Target entity.
        e: EntityId,
        /// Attribute name.
        a: String,
        /// Value to retract.
        v: Value,
    },
    /// Retract every fact about an entity and every reference to it.
    RetractEntity(EntityId),
}

/// Attribute cardinality declarations.
///
/// Attributes are cardinality-one unless declared many: adding a value to a
/// cardinality-one attribute replaces the previous value, while a
/// cardinality-many attribute accumulates a set of values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    many: OrdSet<Attr>,
}

impl Schema {
    /// Creates a schema where every attribute is cardinality-one.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an attribute as cardinality-many.
    #[must_use]
    pub fn with_many(mut self, attribute: &str) -> Self {
        self.many.insert(Attr::from(attribute));
        self
    }

    /// Returns true if the attribute is cardinality-many.
    #[must_use]
    pub fn is_many(&self, attribute: &str) -> bool {
        self.many.contains(attribute)
    }

    /// Iterates the cardinality-many attributes.
    pub fn many_attributes(&self) -> impl Iterator<Item = &str> {
        self.many.iter().map(AsRef::as_ref)
    }
}

/// An entity read back out of the store.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    /// The entity's identity.
    pub id: EntityId,
    /// Attribute values; cardinality-one attributes hold exactly one.
    pub attributes: BTreeMap<Attr, Vec<Value>>,
}

impl Entity {
    /// Returns the first value of an attribute.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute).and_then(|vs| vs.first())
    }

    /// Returns every value of an attribute.
    #[must_use]
    pub fn get_all(&self, attribute: &str) -> &[Value] {
        self.attributes.get(attribute).map_or(&[][..], Vec::as_slice)
    }
}

/// Immutable, versioned fact database.
///
/// Clone is O(1) due to structural sharing of the `im` indices.
#[derive(Clone, Debug)]
pub struct Database {
    /// Entity-attribute-value index.
    eav: OrdSet<(EntityId, Attr, Value)>,
    /// Attribute-entity-value index.
    aev: OrdSet<(Attr, EntityId, Value)>,
    /// Cardinality declarations.
    schema: Schema,
    /// Next identity to allocate.
    next_id: u64,
    /// Number of transactions committed so far.
    basis: u64,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    /// Creates an empty database with the default schema.
    #[must_use]
    pub fn new() -> Self {
        Self::with_schema(Schema::new())
    }

    /// Creates an empty database with the given schema.
    #[must_use]
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            eav: OrdSet::new(),
            aev: OrdSet::new(),
            schema,
            next_id: EntityId::FIRST.ordinal(),
            basis: 0,
        }
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns a version where `attribute` accumulates values instead of
    /// replacing them. Existing facts are kept.
    #[must_use]
    pub fn with_many(&self, attribute: &str) -> Self {
        if self.schema.is_many(attribute) {
            return self.clone();
        }
        let mut next = self.clone();
        next.schema = self.schema.clone().with_many(attribute);
        next
    }

    /// Returns the number of transactions that produced this version.
    #[must_use]
    pub fn basis(&self) -> u64 {
        self.basis
    }

    /// Returns the number of facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.eav.len()
    }

    /// Returns true if the database holds no facts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.eav.is_empty()
    }

    /// Returns the number of distinct entities that have at least one fact.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        let mut count = 0;
        let mut last = None;
        for (e, _, _) in &self.eav {
            if last != Some(*e) {
                count += 1;
                last = Some(*e);
            }
        }
        count
    }

    /// Iterates all facts in entity/attribute/value order.
    pub fn datoms(&self) -> impl Iterator<Item = Datom> + '_ {
        self.eav.iter().map(|(e, a, v)| Datom {
            e: *e,
            a: a.clone(),
            v: v.clone(),
        })
    }

    /// Returns the entity with the greatest identity that has any facts.
    ///
    /// Identities are allocated in increasing order, so this is the most
    /// recently created entity still present in the store.
    #[must_use]
    pub fn newest_entity_id(&self) -> Option<EntityId> {
        self.eav.get_max().map(|(e, _, _)| *e)
    }

    /// Returns the identity most recently handed out, whether or not it
    /// still has facts.
    #[must_use]
    pub fn last_allocated(&self) -> Option<EntityId> {
        (self.next_id > EntityId::FIRST.ordinal()).then(|| EntityId::new(self.next_id - 1))
    }

    /// Returns true if `id` has been allocated by this database.
    #[must_use]
    pub fn is_allocated(&self, id: EntityId) -> bool {
        id.ordinal() >= EntityId::FIRST.ordinal() && id.ordinal() < self.next_id
    }

    /// Reads an entity back as a map of attributes.
    ///
    /// Returns `None` if the entity has no facts.
    #[must_use]
    pub fn get_entity(&self, id: EntityId) -> Option<Entity> {
        let mut attributes: BTreeMap<Attr, Vec<Value>> = BTreeMap::new();
        for (_, a, v) in self.entity_facts(id) {
            attributes.entry(a.clone()).or_default().push(v.clone());
        }
        if attributes.is_empty() {
            None
        } else {
            Some(Entity { id, attributes })
        }
    }

    /// Returns the values of one attribute of an entity.
    #[must_use]
    pub fn values(&self, id: EntityId, attribute: &str) -> Vec<Value> {
        self.entity_facts(id)
            .filter(|(_, a, _)| a.as_ref() == attribute)
            .map(|(_, _, v)| v.clone())
            .collect()
    }

    /// Creates an entity and returns the new version with its identity.
    ///
    /// # Errors
    /// Returns an error if any attribute value is nil.
    pub fn create_entity(&self, entity: EntityMap) -> Result<(Self, EntityId)> {
        let id = EntityId::new(self.next_id);
        let db = self.transact(&[TxOp::Entity(entity)])?;
        Ok((db, id))
    }

    /// Adds a value for an attribute of an entity.
    ///
    /// # Errors
    /// Returns an error if the entity was never allocated or the value is nil.
    pub fn update_property(&self, id: EntityId, attribute: &str, value: Value) -> Result<Self> {
        self.transact(&[TxOp::Add {
            e: id,
            a: attribute.to_string(),
            v: value,
        }])
    }

    /// Adds several attribute values to an entity in one transaction.
    ///
    /// # Errors
    /// Returns an error if the entity was never allocated or any value is nil.
    pub fn update_properties(&self, id: EntityId, properties: &EntityMap) -> Result<Self> {
        let ops: Vec<_> = properties
            .iter()
            .map(|(a, v)| TxOp::Add {
                e: id,
                a: a.clone(),
                v: v.clone(),
            })
            .collect();
        self.transact(&ops)
    }

    /// Retracts one value of an attribute.
    ///
    /// # Errors
    /// Currently infallible; kept fallible for parity with other updates.
    pub fn delete_property(&self, id: EntityId, attribute: &str, value: Value) -> Result<Self> {
        self.transact(&[TxOp::Retract {
            e: id,
            a: attribute.to_string(),
            v: value,
        }])
    }

    /// Retracts an entity and every reference to it.
    ///
    /// # Errors
    /// Currently infallible; kept fallible for parity with other updates.
    pub fn delete_entity(&self, id: EntityId) -> Result<Self> {
        self.transact(&[TxOp::RetractEntity(id)])
    }

    /// Applies a sequence of operations and returns the resulting version.
    ///
    /// The operations are applied in order to a copy; on error nothing is
    /// committed and `self` is unchanged either way.
    ///
    /// # Errors
    /// Returns an error if an operation targets an unallocated entity or
    /// tries to store nil.
    pub fn transact(&self, ops: &[TxOp]) -> Result<Self> {
        let mut next = self.clone();
        for op in ops {
            next.apply(op)?;
        }
        next.basis += 1;
        tracing::trace!(
            ops = ops.len(),
            basis = next.basis,
            facts = next.len(),
            "committed transaction"
        );
        Ok(next)
    }

    /// Finds facts matching the given constraints, in index order.
    ///
    /// Uses the entity index when the entity is known, the attribute index
    /// when only the attribute is known, and a full scan otherwise.
    #[must_use]
    pub fn matching(
        &self,
        e: Option<EntityId>,
        a: Option<&str>,
        v: Option<&Value>,
    ) -> Vec<Datom> {
        let keep = |de: EntityId, da: &Attr, dv: &Value| {
            e.is_none_or(|e| e == de)
                && a.is_none_or(|a| a == da.as_ref())
                && v.is_none_or(|v| v == dv)
        };
        let datom = |de: EntityId, da: &Attr, dv: &Value| Datom {
            e: de,
            a: da.clone(),
            v: dv.clone(),
        };
        match (e, a) {
            (Some(e), _) => self
                .entity_facts(e)
                .filter(|(de, da, dv)| keep(*de, da, dv))
                .map(|(de, da, dv)| datom(*de, da, dv))
                .collect(),
            (None, Some(a)) => self
                .attribute_facts(a)
                .filter(|(da, de, dv)| keep(*de, da, dv))
                .map(|(da, de, dv)| datom(*de, da, dv))
                .collect(),
            (None, None) => self
                .eav
                .iter()
                .filter(|(de, da, dv)| keep(*de, da, dv))
                .map(|(de, da, dv)| datom(*de, da, dv))
                .collect(),
        }
    }

    fn entity_facts(&self, id: EntityId) -> impl Iterator<Item = &(EntityId, Attr, Value)> {
        let lower = (id, Attr::from(""), Value::Nil);
        self.eav
            .range((Bound::Included(lower), Bound::Unbounded))
            .take_while(move |(e, _, _)| *e == id)
    }

    fn attribute_facts<'a>(
        &'a self,
        attribute: &'a str,
    ) -> impl Iterator<Item = &'a (Attr, EntityId, Value)> + 'a {
        let lower = (Attr::from(attribute), EntityId::new(0), Value::Nil);
        self.aev
            .range((Bound::Included(lower), Bound::Unbounded))
            .take_while(move |(a, _, _)| a.as_ref() == attribute)
    }

    fn apply(&mut self, op: &TxOp) -> Result<()> {
        match op {
            TxOp::Entity(map) => {
                let id = EntityId::new(self.next_id);
                self.next_id += 1;
                for (a, v) in map {
                    self.add(id, a, v.clone())?;
                }
            }
            TxOp::Add { e, a, v } => {
                if !self.is_allocated(*e) {
                    return Err(Error::entity_not_found(*e));
                }
                self.add(*e, a, v.clone())?;
            }
            TxOp::Retract { e, a, v } => {
                self.remove(*e, &Attr::from(a.as_str()), v);
            }
            TxOp::RetractEntity(id) => {
                let own: Vec<_> = self.entity_facts(*id).cloned().collect();
                let refs: Vec<_> = self
                    .eav
                    .iter()
                    .filter(|(_, _, v)| *v == Value::EntityRef(*id))
                    .cloned()
                    .collect();
                for (e, a, v) in own.into_iter().chain(refs) {
                    self.remove(e, &a, &v);
                }
            }
        }
        Ok(())
    }

    fn add(&mut self, e: EntityId, attribute: &str, value: Value) -> Result<()> {
        if value.is_nil() {
            return Err(Error::new(ErrorKind::NilValue(attribute.to_string())));
        }
        let a = Attr::from(attribute);
        if !self.schema.is_many(attribute) {
            for old in self.values(e, attribute) {
                self.remove(e, &a, &old);
            }
        }
        self.eav.insert((e, a.clone(), value.clone()));
        self.aev.insert((a, e, value));
        Ok(())
    }

    fn remove(&mut self, e: EntityId, a: &Attr, v: &Value) {
        self.eav.remove(&(e, a.clone(), v.clone()));
        self.aev.remove(&(a.clone(), e, v.clone()));
    }

    #[cfg_attr(not(feature = "serde"), allow(dead_code))]
    pub(crate) fn from_parts(schema: Schema, datoms: Vec<Datom>, next_id: u64, basis: u64) -> Self {
        let mut db = Self::with_schema(schema);
        for Datom { e, a, v } in datoms {
            db.eav.insert((e, a.clone(), v.clone()));
            db.aev.insert((a, e, v));
        }
        db.next_id = next_id;
        db.basis = basis;
        db
    }

    #[cfg_attr(not(feature = "serde"), allow(dead_code))]
    pub(crate) fn next_id(&self) -> u64 {
        self.next_id
    }
}
