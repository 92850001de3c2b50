//! SQLite storage for processed voice recordings

use super::traits::{StorageError, StorageResult};
use crate::graph::NodeId;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A recording about to be inserted
#[derive(Debug, Clone)]
pub struct NewRecording {
    pub audio_path: String,
    pub transcription: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub insight: String,
    pub node_id: Option<NodeId>,
}

/// A stored recording
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recording {
    pub id: i64,
    pub audio_path: String,
    pub transcription: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub insight: String,
    pub node_id: Option<NodeId>,
    pub created_at: DateTime<Utc>,
}

type RecordingRow = (i64, String, String, String, String, String, Option<i64>, String);

/// SQLite-backed recording store
///
/// Thread-safe via internal mutex on the connection.
pub struct RecordingStore {
    conn: Mutex<Connection>,
}

impl RecordingStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
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

    /// Create an in-memory store (useful for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS recordings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                audio_path TEXT NOT NULL,
                transcription TEXT NOT NULL,
                summary TEXT NOT NULL,
                tags_json TEXT NOT NULL,
                insight TEXT NOT NULL,
                node_id INTEGER,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_recordings_created
                ON recordings(created_at);

            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    /// Insert a recording, returning its row id
    pub fn insert(&self, recording: &NewRecording) -> StorageResult<i64> {
        let conn = self.lock();
        let tags_json = serde_json::to_string(&recording.tags)?;
        let node_id = recording.node_id.map(node_id_to_sql).transpose()?;

        conn.execute(
            r#"
            INSERT INTO recordings (audio_path, transcription, summary, tags_json, insight, node_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                recording.audio_path,
                recording.transcription,
                recording.summary,
                tags_json,
                recording.insight,
                node_id,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Load a recording by ID
    pub fn get(&self, id: i64) -> StorageResult<Option<Recording>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT id, audio_path, transcription, summary, tags_json, insight, node_id, created_at
                 FROM recordings WHERE id = ?1",
                params![id],
                Self::read_row,
            )
            .optional()?;
        row.map(Self::row_to_recording).transpose()
    }

    /// Most recent recordings first
    pub fn list_recent(&self, limit: usize) -> StorageResult<Vec<Recording>> {
        let conn = self.lock();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = conn.prepare(
            "SELECT id, audio_path, transcription, summary, tags_json, insight, node_id, created_at
             FROM recordings ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], Self::read_row)?;

        let mut recordings = Vec::new();
        for row in rows {
            recordings.push(Self::row_to_recording(row?)?);
        }
        Ok(recordings)
    }

    pub fn count(&self) -> StorageResult<usize> {
        let conn = self.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM recordings", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordingRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
        ))
    }

    fn row_to_recording(row: RecordingRow) -> StorageResult<Recording> {
        let (id, audio_path, transcription, summary, tags_json, insight, node_id, created_at) = row;
        Ok(Recording {
            id,
            audio_path,
            transcription,
            summary,
            tags: serde_json::from_str(&tags_json)?,
            insight,
            node_id: node_id.and_then(|n| u64::try_from(n).ok()).map(NodeId::new),
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| StorageError::DateParse(e.to_string()))?
                .with_timezone(&Utc),
        })
    }
}

fn node_id_to_sql(id: NodeId) -> StorageResult<i64> {
    i64::try_from(id.get())
        .map_err(|e| StorageError::Database(rusqlite::Error::ToSqlConversionFailure(Box::new(e))))
}
