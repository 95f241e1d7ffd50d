use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::{
    channel::Snapshot,
    db::helpers::{parse_datetime, parse_owner, parse_value, to_u64},
    models::{MeasurementPatch, MeasurementRecord, NewMeasurement},
};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

struct RawDocument {
    id: String,
    value: f64,
    note: String,
    timestamp: String,
    owner: String,
}

impl RawDocument {
    fn decode(self) -> Result<MeasurementRecord> {
        Ok(MeasurementRecord {
            value: parse_value(self.value)?,
            note: self.note,
            timestamp: parse_datetime(&self.timestamp, "timestamp")?,
            owner: parse_owner(&self.owner)?,
            id: self.id,
        })
    }
}

pub struct DocumentRepository<'a> {
    conn: &'a Connection,
}

impl<'a> DocumentRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, collection: &str, document: &NewMeasurement) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.conn
            .execute(
                "INSERT INTO documents (id, collection, value, note, timestamp, owner)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    collection,
                    document.value.get(),
                    document.note,
                    document.timestamp.to_rfc3339(),
                    document.owner.as_str(),
                ],
            )
            .with_context(|| "failed to insert document")?;
        Ok(id)
    }

    /// Applies `patch` to the document. Returns `false` when the id is unknown.
    pub fn update(&self, collection: &str, id: &str, patch: &MeasurementPatch) -> Result<bool> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(value) = patch.value {
            updates.push("value = ?");
            params_vec.push(Box::new(value.get()));
        }
        if let Some(note) = patch.note.clone() {
            updates.push("note = ?");
            params_vec.push(Box::new(note));
        }

        if updates.is_empty() {
            return self.exists(collection, id);
        }

        let query = format!(
            "UPDATE documents SET {} WHERE id = ? AND collection = ?",
            updates.join(", ")
        );
        params_vec.push(Box::new(id.to_string()));
        params_vec.push(Box::new(collection.to_string()));

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|b| b.as_ref()).collect();

        let rows_affected = self
            .conn
            .execute(&query, params_refs.as_slice())
            .with_context(|| "failed to update document")?;
        Ok(rows_affected > 0)
    }

    pub fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let rows_affected = self
            .conn
            .execute(
                "DELETE FROM documents WHERE id = ?1 AND collection = ?2",
                params![id, collection],
            )
            .with_context(|| "failed to delete document")?;
        Ok(rows_affected > 0)
    }

    pub fn exists(&self, collection: &str, id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM documents WHERE id = ?1 AND collection = ?2",
                params![id, collection],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn bump_version(&self, collection: &str) -> Result<u64> {
        self.conn
            .execute(
                "INSERT INTO collection_versions (collection, version) VALUES (?1, 1)
                 ON CONFLICT(collection) DO UPDATE SET version = version + 1",
                params![collection],
            )
            .with_context(|| "failed to bump collection version")?;
        self.version(collection)
    }

    pub fn version(&self, collection: &str) -> Result<u64> {
        let version: Option<i64> = self
            .conn
            .query_row(
                "SELECT version FROM collection_versions WHERE collection = ?1",
                params![collection],
                |row| row.get(0),
            )
            .optional()?;
        to_u64(version.unwrap_or(0), "version")
    }

    /// Full listing of the collection in arrival order, tagged with its version.
    pub fn snapshot(&self, collection: &str) -> Result<Snapshot> {
        let version = self.version(collection)?;

        let mut stmt = self.conn.prepare(
            "SELECT id, value, note, timestamp, owner
             FROM documents
             WHERE collection = ?1
             ORDER BY rowid ASC",
        )?;
        let mut rows = stmt.query(params![collection])?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let raw = RawDocument {
                id: row.get(0)?,
                value: row.get(1)?,
                note: row.get(2)?,
                timestamp: row.get(3)?,
                owner: row.get(4)?,
            };
            let id = raw.id.clone();
            match raw.decode() {
                Ok(record) => records.push(record),
                Err(err) => log_warn!("skipping undecodable document {id}: {err:#}"),
            }
        }

        Ok(Snapshot {
            seq: Some(version),
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::migrations::run_migrations,
        models::{GlucoseValue, Profile},
    };
    use chrono::Utc;

    fn open() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        conn
    }

    fn reading(value: f64, owner: Profile) -> NewMeasurement {
        NewMeasurement {
            value: GlucoseValue::new(value).unwrap(),
            note: String::new(),
            timestamp: Utc::now(),
            owner,
        }
    }

    #[test]
    fn snapshot_keeps_arrival_order_and_scopes_by_collection() {
        let conn = open();
        let repo = DocumentRepository::new(&conn);
        let first = repo.insert("readings", &reading(110.0, Profile::Dad)).unwrap();
        repo.insert("other", &reading(90.0, Profile::Mom)).unwrap();
        let second = repo.insert("readings", &reading(130.0, Profile::Mom)).unwrap();

        let snapshot = repo.snapshot("readings").unwrap();
        let ids: Vec<_> = snapshot.records.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn update_reports_missing_documents() {
        let conn = open();
        let repo = DocumentRepository::new(&conn);
        let id = repo.insert("readings", &reading(110.0, Profile::Son)).unwrap();

        let patch = MeasurementPatch {
            value: Some(GlucoseValue::new(99.0).unwrap()),
            note: Some("walk".into()),
        };
        assert!(repo.update("readings", &id, &patch).unwrap());
        assert!(!repo.update("readings", "missing", &patch).unwrap());

        let record = &repo.snapshot("readings").unwrap().records[0];
        assert_eq!(record.value.get(), 99.0);
        assert_eq!(record.note, "walk");
        assert_eq!(record.owner, Profile::Son);
    }

    #[test]
    fn versions_only_move_forward() {
        let conn = open();
        let repo = DocumentRepository::new(&conn);
        assert_eq!(repo.version("readings").unwrap(), 0);
        assert_eq!(repo.bump_version("readings").unwrap(), 1);
        assert_eq!(repo.bump_version("readings").unwrap(), 2);
        assert_eq!(repo.snapshot("readings").unwrap().seq, Some(2));
    }

    #[test]
    fn undecodable_rows_are_skipped() {
        let conn = open();
        conn.execute(
            "INSERT INTO documents (id, collection, value, note, timestamp, owner)
             VALUES ('bad', 'readings', 100, '', 'yesterday', 'mom')",
            [],
        )
        .unwrap();
        let repo = DocumentRepository::new(&conn);
        repo.insert("readings", &reading(120.0, Profile::Mom)).unwrap();

        let snapshot = repo.snapshot("readings").unwrap();
        assert_eq!(snapshot.records.len(), 1);
        assert_ne!(snapshot.records[0].id, "bad");
    }
}
