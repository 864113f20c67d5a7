//! SQLite store for memories and session records.
//!
//! Uses a single SQLite database file with two tables:
//! - `memories`: the agent's long-term notes, ranked by importance
//! - `sessions`: one row per finished session with its action log as JSON

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use freeagent_core::error::StorageError;
use freeagent_core::memory::{MemoryBackend, MemoryEntry, NewMemory, MAX_IMPORTANCE, MIN_IMPORTANCE};
use freeagent_core::message::SessionId;
use freeagent_core::session::{ActionLogEntry, SessionRecord, SessionSink};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// A SQLite-backed `MemoryBackend` + `SessionSink`.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// Parent directories, tables and indexes are created automatically.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::Storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {}", path.display());
        Ok(store)
    }

    /// An ephemeral in-process database.
    ///
    /// Every `:memory:` connection is its own database, so the pool is
    /// pinned to a single connection.
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StorageError::Storage(format!("Invalid SQLite URL: {e}")))?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run schema migrations.
    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id           TEXT PRIMARY KEY,
                started_at   TEXT NOT NULL,
                ended_at     TEXT,
                summary      TEXT NOT NULL,
                termination  TEXT NOT NULL,
                turns_used   INTEGER NOT NULL DEFAULT 0,
                actions_json TEXT NOT NULL DEFAULT '[]'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::MigrationFailed(format!("sessions table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                category   TEXT NOT NULL,
                content    TEXT NOT NULL,
                importance INTEGER NOT NULL DEFAULT 3,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::MigrationFailed(format!("memories table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_memories_importance ON memories(importance DESC, id DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::MigrationFailed(format!("importance index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn parse_time(column: &str, value: &str) -> Result<DateTime<Utc>, StorageError> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StorageError::QueryFailed(format!("{column} column: {e}")))
    }

    /// Parse a `MemoryEntry` from a SQLite row.
    fn row_to_memory(row: &sqlx::sqlite::SqliteRow) -> Result<MemoryEntry, StorageError> {
        let created_at: String = row
            .try_get("created_at")
            .map_err(|e| StorageError::QueryFailed(format!("created_at column: {e}")))?;
        let importance: i64 = row
            .try_get("importance")
            .map_err(|e| StorageError::QueryFailed(format!("importance column: {e}")))?;

        Ok(MemoryEntry {
            id: row
                .try_get("id")
                .map_err(|e| StorageError::QueryFailed(format!("id column: {e}")))?,
            category: row
                .try_get("category")
                .map_err(|e| StorageError::QueryFailed(format!("category column: {e}")))?,
            content: row
                .try_get("content")
                .map_err(|e| StorageError::QueryFailed(format!("content column: {e}")))?,
            importance: importance.clamp(MIN_IMPORTANCE as i64, MAX_IMPORTANCE as i64) as u8,
            created_at: Self::parse_time("created_at", &created_at)?,
        })
    }

    /// Parse a `SessionRecord` from a SQLite row.
    fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<SessionRecord, StorageError> {
        let get = |column: &str| -> Result<String, StorageError> {
            row.try_get(column)
                .map_err(|e| StorageError::QueryFailed(format!("{column} column: {e}")))
        };

        let ended_at: Option<String> = row
            .try_get("ended_at")
            .map_err(|e| StorageError::QueryFailed(format!("ended_at column: {e}")))?;
        let turns_used: i64 = row
            .try_get("turns_used")
            .map_err(|e| StorageError::QueryFailed(format!("turns_used column: {e}")))?;
        let actions: Vec<ActionLogEntry> = serde_json::from_str(&get("actions_json")?)
            .map_err(|e| StorageError::QueryFailed(format!("actions_json column: {e}")))?;

        Ok(SessionRecord {
            id: SessionId(get("id")?),
            started_at: Self::parse_time("started_at", &get("started_at")?)?,
            ended_at: ended_at
                .as_deref()
                .map(|t| Self::parse_time("ended_at", t))
                .transpose()?,
            summary: get("summary")?,
            actions,
            termination: Some(get("termination")?.parse()?),
            turns_used: u32::try_from(turns_used).unwrap_or(0),
        })
    }

    /// Escape LIKE wildcards so the query matches literally.
    fn like_pattern(query: &str) -> String {
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{escaped}%")
    }
}

#[async_trait]
impl MemoryBackend for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn store(&self, memory: NewMemory) -> Result<MemoryEntry, StorageError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO memories (category, content, importance, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&memory.category)
        .bind(&memory.content)
        .bind(memory.importance as i64)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Storage(format!("INSERT failed: {e}")))?;

        let id = result.last_insert_rowid();
        debug!(id, category = %memory.category, "Stored memory");
        Ok(MemoryEntry {
            id,
            category: memory.category,
            content: memory.content,
            importance: memory.importance,
            created_at,
        })
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MemoryEntry>, StorageError> {
        let pattern = Self::like_pattern(query.trim());
        let rows = sqlx::query(
            r#"
            SELECT * FROM memories
            WHERE content LIKE ?1 ESCAPE '\' OR category LIKE ?1 ESCAPE '\'
            ORDER BY importance DESC, id DESC
            LIMIT ?2
            "#,
        )
        .bind(&pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("Memory search: {e}")))?;

        rows.iter().map(Self::row_to_memory).collect()
    }

    async fn top(&self, limit: usize) -> Result<Vec<MemoryEntry>, StorageError> {
        let rows = sqlx::query("SELECT * FROM memories ORDER BY importance DESC, id DESC LIMIT ?1")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("Top memories: {e}")))?;

        rows.iter().map(Self::row_to_memory).collect()
    }

    async fn delete(&self, id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM memories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Storage(format!("DELETE failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<usize, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM memories")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("COUNT failed: {e}")))?;
        let n: i64 = row
            .try_get("n")
            .map_err(|e| StorageError::QueryFailed(format!("count column: {e}")))?;
        Ok(n as usize)
    }
}

#[async_trait]
impl SessionSink for SqliteStore {
    async fn append(&self, record: &SessionRecord) -> Result<(), StorageError> {
        let termination = record
            .termination
            .ok_or_else(|| StorageError::Storage(format!("session {} is still open", record.id)))?;
        let actions_json = serde_json::to_string(&record.actions)
            .map_err(|e| StorageError::Storage(format!("Actions serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO sessions (id, started_at, ended_at, summary, termination, turns_used, actions_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&record.id.0)
        .bind(record.started_at.to_rfc3339())
        .bind(record.ended_at.map(|t| t.to_rfc3339()))
        .bind(&record.summary)
        .bind(termination.as_str())
        .bind(record.turns_used as i64)
        .bind(&actions_json)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Storage(format!("Session INSERT failed: {e}")))?;

        debug!(session_id = %record.id, actions = record.actions.len(), "Stored session record");
        Ok(())
    }

    async fn recent(&self, n: usize) -> Result<Vec<SessionRecord>, StorageError> {
        let rows = sqlx::query("SELECT * FROM sessions ORDER BY rowid DESC LIMIT ?1")
            .bind(n as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("Recent sessions: {e}")))?;

        let mut records = rows
            .iter()
            .map(Self::row_to_session)
            .collect::<Result<Vec<_>, _>>()?;
        records.reverse();
        Ok(records)
    }

    async fn session_count(&self) -> Result<usize, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM sessions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("COUNT failed: {e}")))?;
        let n: i64 = row
            .try_get("n")
            .map_err(|e| StorageError::QueryFailed(format!("count column: {e}")))?;
        Ok(n as usize)
    }
}
