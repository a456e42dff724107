//! MessagePack snapshots of a database version.
//!
//! Only the current facts, schema, and counters are written; earlier
//! versions are not part of a snapshot.

use felt_foundation::{EntityId, Error, ErrorKind, Result, Value};
use serde::{Deserialize, Serialize};

use crate::database::{Attr, Database, Datom, Schema};

#[derive(Serialize, Deserialize)]
struct SnapshotData {
    many: Vec<String>,
    datoms: Vec<(EntityId, String, Value)>,
    next_id: u64,
    basis: u64,
}

impl Database {
    /// Encodes this version as MessagePack bytes.
    ///
    /// # Errors
    /// Returns a snapshot error if encoding fails.
    pub fn to_snapshot(&self) -> Result<Vec<u8>> {
        let data = SnapshotData {
            many: self.schema().many_attributes().map(str::to_string).collect(),
            datoms: self
                .datoms()
                .map(|d| (d.e, d.a.to_string(), d.v))
                .collect(),
            next_id: self.next_id(),
            basis: self.basis(),
        };
        rmp_serde::to_vec(&data).map_err(|e| Error::new(ErrorKind::Snapshot(e.to_string())))
    }

    /// Decodes a version previously written by [`Database::to_snapshot`].
    ///
    /// # Errors
    /// Returns a snapshot error if the bytes are not a valid snapshot.
    pub fn from_snapshot(bytes: &[u8]) -> Result<Self> {
        let data: SnapshotData = rmp_serde::from_slice(bytes)
            .map_err(|e| Error::new(ErrorKind::Snapshot(e.to_string())))?;
        let schema = data
            .many
            .iter()
            .fold(Schema::new(), |schema, a| schema.with_many(a));
        let datoms = data
            .datoms
            .into_iter()
            .map(|(e, a, v)| Datom {
                e,
                a: Attr::from(a),
                v,
            })
            .collect();
        Ok(Database::from_parts(schema, datoms, data.next_id, data.basis))
    }
}
