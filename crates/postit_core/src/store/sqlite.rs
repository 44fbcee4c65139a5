//! SQLite-backed collection backend.
//!
//! # Responsibility
//! - Persist collection children as JSON text in the `children` table.
//! - Keep merge read-modify-write atomic per call.
//!
//! # Invariants
//! - Rows whose JSON cannot be parsed are logged and left out of `load`;
//!   they never abort a snapshot.

use crate::db::{open_db, open_db_in_memory};
use crate::store::backend::{merge_child, CollectionBackend};
use crate::store::{ChildKey, StoreResult};
use log::warn;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Durable backend over one SQLite connection.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Opens (or creates) a collection database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl CollectionBackend for SqliteBackend {
    fn load(&self, collection: &str) -> StoreResult<BTreeMap<ChildKey, Value>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, value
             FROM children
             WHERE collection = ?1
             ORDER BY key ASC;",
        )?;
        let mut rows = stmt.query([collection])?;
        let mut children = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let key: String = row.get("key")?;
            let raw: String = row.get("value")?;
            match serde_json::from_str::<Value>(&raw) {
                Ok(value) => {
                    children.insert(key, value);
                }
                Err(err) => warn!(
                    "event=child_load module=store status=skipped collection={collection} key={key} error={err}"
                ),
            }
        }
        Ok(children)
    }

    fn put(&mut self, collection: &str, key: &str, value: &Value) -> StoreResult<()> {
        if value.is_null() {
            return self.delete(collection, key);
        }
        let raw = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT INTO children (collection, key, value)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (collection, key) DO UPDATE SET value = excluded.value;",
            params![collection, key, raw],
        )?;
        Ok(())
    }

    fn merge(
        &mut self,
        collection: &str,
        key: &str,
        fields: &Map<String, Value>,
    ) -> StoreResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing: Option<String> = tx
            .query_row(
                "SELECT value FROM children WHERE collection = ?1 AND key = ?2;",
                params![collection, key],
                |row| row.get(0),
            )
            .optional()?;
        let existing = existing.and_then(|raw| serde_json::from_str::<Value>(&raw).ok());

        match merge_child(existing, fields) {
            Some(merged) => {
                tx.execute(
                    "INSERT INTO children (collection, key, value)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT (collection, key) DO UPDATE SET value = excluded.value;",
                    params![collection, key, serde_json::to_string(&merged)?],
                )?;
            }
            None => {
                tx.execute(
                    "DELETE FROM children WHERE collection = ?1 AND key = ?2;",
                    params![collection, key],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete(&mut self, collection: &str, key: &str) -> StoreResult<()> {
        self.conn.execute(
            "DELETE FROM children WHERE collection = ?1 AND key = ?2;",
            params![collection, key],
        )?;
        Ok(())
    }
}
