//! SQLite-backed store for the `markers` and `simulation_results`
//! collections: WAL mode set up once via `execute_batch`, prepared/cached
//! statements for inserts, a single `Connection` behind a mutex so writes
//! serialize (read consistency across separate operations is not
//! required).
//!
//! Both collections share one id/timestamp/JSON-payload table shape rather
//! than fixed columns per collection — the payload is value-carrying JSON
//! with no referential integrity, closer to a narrow key-value table than
//! typed columns.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use crate::error::OutputResult;
use crate::row::StoredRecord;

const MARKERS_TABLE: &str = "markers";
const RESULTS_TABLE: &str = "simulation_results";

/// Persists the two collections the simulation core doesn't own itself.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) `traffic_sim.db` under `dir` and initialize the
    /// schema.
    pub fn open(dir: &Path) -> OutputResult<Self> {
        let conn = Connection::open(dir.join("traffic_sim.db"))?;
        Self::from_connection(conn)
    }

    /// In-memory store, used by tests so no filesystem state leaks between
    /// runs.
    pub fn open_in_memory() -> OutputResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> OutputResult<Self> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS {MARKERS_TABLE} (
                 id         TEXT PRIMARY KEY,
                 created_at TEXT NOT NULL,
                 payload    TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS {RESULTS_TABLE} (
                 id         TEXT PRIMARY KEY,
                 created_at TEXT NOT NULL,
                 payload    TEXT NOT NULL
             );"
        ))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn insert_marker(&self, payload: serde_json::Value) -> OutputResult<StoredRecord> {
        self.insert(MARKERS_TABLE, payload)
    }

    /// Ordered by insertion (`created_at`, then `id` to break ties within
    /// the same second).
    pub fn list_markers(&self) -> OutputResult<Vec<StoredRecord>> {
        self.list(MARKERS_TABLE)
    }

    pub fn clear_markers(&self) -> OutputResult<()> {
        self.clear(MARKERS_TABLE)
    }

    pub fn insert_result(&self, payload: serde_json::Value) -> OutputResult<StoredRecord> {
        self.insert(RESULTS_TABLE, payload)
    }

    pub fn list_results(&self) -> OutputResult<Vec<StoredRecord>> {
        self.list(RESULTS_TABLE)
    }

    fn insert(&self, table: &str, payload: serde_json::Value) -> OutputResult<StoredRecord> {
        let record = StoredRecord {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            payload,
        };
        let serialized = serde_json::to_string(&record.payload)?;

        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare_cached(&format!(
            "INSERT INTO {table} (id, created_at, payload) VALUES (?1, ?2, ?3)"
        ))?;
        stmt.execute(params![record.id, record.created_at, serialized])?;

        Ok(record)
    }

    fn list(&self, table: &str) -> OutputResult<Vec<StoredRecord>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt =
            conn.prepare_cached(&format!("SELECT id, created_at, payload FROM {table} ORDER BY created_at, id"))?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let created_at: String = row.get(1)?;
            let payload_raw: String = row.get(2)?;
            Ok((id, created_at, payload_raw))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, created_at, payload_raw) = row?;
            let payload = serde_json::from_str(&payload_raw)?;
            records.push(StoredRecord { id, created_at, payload });
        }
        Ok(records)
    }

    fn clear(&self, table: &str) -> OutputResult<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(&format!("DELETE FROM {table}"), [])?;
        Ok(())
    }
}
