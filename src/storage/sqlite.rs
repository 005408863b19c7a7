//! SQLite storage backend for encrypted payloads

use super::traits::{
    payload_key, Identity, OpenStore, PayloadStore, SaveReceipt, StorageError, StorageResult,
    StoredPayload,
};
use crate::crypto::Ciphertext;
use crate::graph::fresh_id;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed payload store
///
/// One row per (identity, entry) holding the ciphertext envelope as text.
/// Thread-safe via internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS payloads (
                storage_key TEXT PRIMARY KEY,
                namespace TEXT NOT NULL,
                entry_id TEXT NOT NULL,
                ciphertext TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_payloads_namespace
                ON payloads(namespace, entry_id);

            -- Enable WAL mode so backlink scans can read during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("connection mutex poisoned".to_string()))
    }

    fn query_payloads(&self, identity: &Identity) -> StorageResult<Vec<StoredPayload>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT entry_id, ciphertext FROM payloads WHERE namespace = ?1 ORDER BY entry_id",
        )?;
        let rows = stmt.query_map(params![identity.namespace()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut payloads = Vec::new();
        for row in rows {
            let (entry_id, ciphertext) = row?;
            payloads.push(StoredPayload {
                entry_id,
                ciphertext: Ciphertext::new(ciphertext),
            });
        }
        Ok(payloads)
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl PayloadStore for SqliteStore {
    async fn save(
        &self,
        identity: &Identity,
        ciphertext: &Ciphertext,
        entry_id: Option<&str>,
    ) -> StorageResult<SaveReceipt> {
        let entry_id = entry_id.map(str::to_string).unwrap_or_else(|| fresh_id("entry"));
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO payloads (storage_key, namespace, entry_id, ciphertext, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(storage_key) DO UPDATE SET
                ciphertext = excluded.ciphertext,
                updated_at = excluded.updated_at
            "#,
            params![
                payload_key(identity, &entry_id),
                identity.namespace(),
                entry_id,
                ciphertext.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(SaveReceipt { id: entry_id })
    }

    async fn load(&self, identity: &Identity, entry_id: &str) -> StorageResult<Option<Ciphertext>> {
        let conn = self.lock()?;
        let ciphertext: Option<String> = conn
            .query_row(
                "SELECT ciphertext FROM payloads WHERE storage_key = ?1",
                params![payload_key(identity, entry_id)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ciphertext.map(Ciphertext::new))
    }

    async fn list_ids(&self, identity: &Identity) -> StorageResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT entry_id FROM payloads WHERE namespace = ?1 ORDER BY entry_id")?;
        let ids = stmt
            .query_map(params![identity.namespace()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    async fn load_all(&self, identity: &Identity) -> StorageResult<Vec<StoredPayload>> {
        self.query_payloads(identity)
    }

    async fn delete(&self, identity: &Identity, entry_id: &str) -> StorageResult<bool> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM payloads WHERE storage_key = ?1",
            params![payload_key(identity, entry_id)],
        )?;
        Ok(removed > 0)
    }
}
