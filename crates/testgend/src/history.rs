//! History store - SQLite-backed log of completed generations.
//!
//! Append-only: records are inserted once a generation completes and never
//! updated afterwards. Reads are point lookups by id and a newest-first
//! listing for the index page. Concurrency control is the connection mutex;
//! there is no read-modify-write anywhere.

use crate::error::GenError;
use crate::types::HistoryRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct HistoryStore {
    conn: Arc<Mutex<Connection>>,
}

impl HistoryStore {
    /// Open or create the store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open history database: {:?}", path))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS history (
                id TEXT PRIMARY KEY,
                code TEXT NOT NULL,
                language TEXT NOT NULL,
                framework TEXT NOT NULL,
                provider TEXT NOT NULL,
                requirements TEXT NOT NULL,
                tests TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_history_created_at ON history(created_at)",
            [],
        )?;
        Ok(())
    }

    /// Insert a record and return its store-assigned id.
    pub fn append(&self, record: &HistoryRecord) -> Result<String, GenError> {
        let id = uuid::Uuid::new_v4().to_string();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO history (id, code, language, framework, provider, requirements, tests, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                id,
                record.code,
                record.language,
                record.framework,
                record.provider,
                record.requirements,
                record.tests,
                record.created_at.to_rfc3339(),
            ],
        )?;
        debug!("History: appended record {}", id);
        Ok(id)
    }

    /// Point lookup by id.
    pub fn get(&self, id: &str) -> Result<Option<HistoryRecord>, GenError> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                "SELECT id, code, language, framework, provider, requirements, tests, created_at
                 FROM history WHERE id = ?1",
                params![id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// All records, newest first.
    pub fn list(&self) -> Result<Vec<HistoryRecord>, GenError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, code, language, framework, provider, requirements, tests, created_at
             FROM history ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], row_to_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<usize, GenError> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<HistoryRecord> {
    let created_at: String = row.get(7)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    Ok(HistoryRecord {
        id: row.get(0)?,
        code: row.get(1)?,
        language: row.get(2)?,
        framework: row.get(3)?,
        provider: row.get(4)?,
        requirements: row.get(5)?,
        tests: row.get(6)?,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(code: &str, created_at: DateTime<Utc>) -> HistoryRecord {
        HistoryRecord {
            id: String::new(), // assigned by the store
            code: code.to_string(),
            language: "python".to_string(),
            framework: "pytest".to_string(),
            provider: "ollama".to_string(),
            requirements: String::new(),
            tests: "def test_a():\n    assert True".to_string(),
            created_at,
        }
    }

    #[test]
    fn append_and_get() {
        let store = HistoryStore::open_in_memory().unwrap();
        let id = store.append(&sample("def f(): pass", Utc::now())).unwrap();

        let found = store.get(&id).unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.code, "def f(): pass");
        assert_eq!(found.framework, "pytest");
    }

    #[test]
    fn get_unknown_id_is_none() {
        let store = HistoryStore::open_in_memory().unwrap();
        assert!(store.get("no-such-id").unwrap().is_none());
    }

    #[test]
    fn list_is_newest_first() {
        let store = HistoryStore::open_in_memory().unwrap();
        let base = Utc::now();
        for i in 0..3 {
            let record = sample(&format!("code-{}", i), base + chrono::Duration::seconds(i));
            store.append(&record).unwrap();
        }

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].code, "code-2");
        assert_eq!(listed[2].code, "code-0");
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");

        let id = {
            let store = HistoryStore::open(&path).unwrap();
            store.append(&sample("persisted", Utc::now())).unwrap()
        };

        let store = HistoryStore::open(&path).unwrap();
        assert_eq!(store.get(&id).unwrap().unwrap().code, "persisted");
    }
}
