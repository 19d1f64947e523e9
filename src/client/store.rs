//! Durable client-side storage. The mutation queue, the pending
//! time-event log and the entity cache share one local SQLite file, so an
//! offline action is on disk before its optimistic result is shown.

use crate::db::events::{ts_from_db, ts_to_db};
use crate::errors::{AppError, AppResult};
use crate::models::{EventKind, Method, OfflineMutation, TimeEvent};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Handle shared by the queue, the event log and the orchestrator. Locked
/// only around individual statements, never across a network call.
pub type SharedStore = Arc<Mutex<ClientStore>>;

pub struct ClientStore {
    pub conn: Connection,
}

impl ClientStore {
    pub fn open(path: &str) -> AppResult<Self> {
        let conn = Connection::open(Path::new(path))?;
        let store = Self { conn };
        store.apply_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.apply_schema()?;
        Ok(store)
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    fn apply_schema(&self) -> AppResult<()> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS mutation_queue (
                    id        INTEGER PRIMARY KEY AUTOINCREMENT,
                    path      TEXT NOT NULL,
                    method    TEXT NOT NULL CHECK(method IN ('GET','POST','PUT','PATCH','DELETE')),
                    body      TEXT,
                    temp_id   TEXT,
                    queued_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS mutation_refs (
                    mutation_id INTEGER NOT NULL REFERENCES mutation_queue(id) ON DELETE CASCADE,
                    temp_id     TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_mutation_refs_temp ON mutation_refs(temp_id);

                CREATE TABLE IF NOT EXISTS pending_events (
                    id        TEXT PRIMARY KEY,
                    user_id   TEXT NOT NULL,
                    kind      TEXT NOT NULL CHECK(kind IN
                                ('clock_in','clock_out','start_task','stop_task','break_start','break_end')),
                    timestamp TEXT NOT NULL,
                    task_id   TEXT,
                    team_id   TEXT,
                    note      TEXT,
                    logged_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS entity_cache (
                    id         TEXT PRIMARY KEY,
                    entity     TEXT NOT NULL,
                    body       TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA foreign_keys = ON;
                "#,
            )
            .map_err(|e| AppError::Migration(e.to_string()))
    }

    // ---------------------------
    // Mutation queue
    // ---------------------------

    /// Durably append a mutation; `refs` are the temp ids its path or body
    /// reference, tracked so reconciliation can find it without scanning.
    pub fn insert_mutation(
        &mut self,
        path: &str,
        method: Method,
        body: Option<&Value>,
        temp_id: Option<&str>,
        refs: &[String],
    ) -> AppResult<OfflineMutation> {
        let queued_at = Utc::now();
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO mutation_queue (path, method, body, temp_id, queued_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                path,
                method.to_db_str(),
                body.map(|b| b.to_string()),
                temp_id,
                ts_to_db(queued_at),
            ],
        )?;
        let id = tx.last_insert_rowid();
        for temp in refs {
            tx.execute(
                "INSERT INTO mutation_refs (mutation_id, temp_id) VALUES (?1, ?2)",
                params![id, temp],
            )?;
        }
        tx.commit()?;

        Ok(OfflineMutation {
            id,
            path: path.to_string(),
            method,
            body: body.cloned(),
            queued_at,
            temp_id: temp_id.map(str::to_string),
        })
    }

    fn map_mutation(row: &Row) -> rusqlite::Result<(i64, String, String, Option<String>, String, Option<String>)> {
        Ok((
            row.get("id")?,
            row.get("path")?,
            row.get("method")?,
            row.get("body")?,
            row.get("queued_at")?,
            row.get("temp_id")?,
        ))
    }

    fn decode_mutation(
        (id, path, method_str, body_str, queued_str, temp_id): (
            i64,
            String,
            String,
            Option<String>,
            String,
            Option<String>,
        ),
    ) -> AppResult<OfflineMutation> {
        let method =
            Method::from_db_str(&method_str).ok_or(AppError::InvalidMethod(method_str))?;
        let body = match body_str {
            Some(raw) => Some(serde_json::from_str(&raw)?),
            None => None,
        };
        Ok(OfflineMutation {
            id,
            path,
            method,
            body,
            queued_at: ts_from_db(&queued_str)?,
            temp_id,
        })
    }

    /// Head of the queue, FIFO by insertion rowid.
    pub fn oldest_mutation(&self) -> AppResult<Option<OfflineMutation>> {
        let row = self
            .conn
            .query_row(
                "SELECT * FROM mutation_queue ORDER BY id ASC LIMIT 1",
                [],
                Self::map_mutation,
            )
            .optional()?;
        row.map(Self::decode_mutation).transpose()
    }

    pub fn pending_mutations(&self) -> AppResult<Vec<OfflineMutation>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM mutation_queue ORDER BY id ASC")?;
        let rows = stmt.query_map([], Self::map_mutation)?;

        let mut out = Vec::new();
        for r in rows {
            out.push(Self::decode_mutation(r?)?);
        }
        Ok(out)
    }

    pub fn delete_mutation(&self, id: i64) -> AppResult<()> {
        self.conn
            .execute("DELETE FROM mutation_queue WHERE id = ?1", params![id])?;
        self.conn
            .execute("DELETE FROM mutation_refs WHERE mutation_id = ?1", params![id])?;
        Ok(())
    }

    /// Session is unrecoverable: drop everything still queued.
    pub fn clear_mutations(&self) -> AppResult<usize> {
        self.conn.execute("DELETE FROM mutation_refs", [])?;
        let n = self.conn.execute("DELETE FROM mutation_queue", [])?;
        Ok(n)
    }

    /// Ids of still-pending mutations whose path or body reference `temp_id`.
    pub fn mutations_referencing(&self, temp_id: &str) -> AppResult<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT mutation_id FROM mutation_refs WHERE temp_id = ?1 ORDER BY mutation_id ASC",
        )?;
        let rows = stmt.query_map(params![temp_id], |row| row.get::<_, i64>(0))?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn load_mutation(&self, id: i64) -> AppResult<Option<OfflineMutation>> {
        let row = self
            .conn
            .query_row(
                "SELECT * FROM mutation_queue WHERE id = ?1",
                params![id],
                Self::map_mutation,
            )
            .optional()?;
        row.map(Self::decode_mutation).transpose()
    }

    /// Rewrite a pending mutation in place after reconciliation and replace
    /// its tracked references.
    pub fn rewrite_mutation(
        &mut self,
        id: i64,
        path: &str,
        body: Option<&Value>,
        refs: &[String],
    ) -> AppResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE mutation_queue SET path = ?2, body = ?3 WHERE id = ?1",
            params![id, path, body.map(|b| b.to_string())],
        )?;
        tx.execute(
            "DELETE FROM mutation_refs WHERE mutation_id = ?1",
            params![id],
        )?;
        for temp in refs {
            tx.execute(
                "INSERT INTO mutation_refs (mutation_id, temp_id) VALUES (?1, ?2)",
                params![id, temp],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    // ---------------------------
    // Pending time events
    // ---------------------------

    /// Append-only: an event row is written once and only ever removed by
    /// a server acknowledgment.
    pub fn insert_pending_event(&self, ev: &TimeEvent) -> AppResult<()> {
        self.conn.execute(
            "INSERT INTO pending_events (id, user_id, kind, timestamp, task_id, team_id, note, logged_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                ev.id,
                ev.user_id,
                ev.kind.to_db_str(),
                ts_to_db(ev.timestamp),
                ev.task_id,
                ev.team_id,
                ev.note,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn pending_events(&self) -> AppResult<Vec<TimeEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, kind, timestamp, task_id, team_id, note
             FROM pending_events ORDER BY timestamp ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?;

        let mut out = Vec::new();
        for r in rows {
            let (id, user_id, kind_str, ts_str, task_id, team_id, note) = r?;
            let kind = EventKind::from_db_str(&kind_str)
                .ok_or(AppError::InvalidEventKind(kind_str))?;
            out.push(TimeEvent {
                id,
                user_id,
                kind,
                timestamp: ts_from_db(&ts_str)?,
                task_id,
                team_id,
                note,
            });
        }
        Ok(out)
    }

    pub fn delete_events(&mut self, ids: &[String]) -> AppResult<usize> {
        let tx = self.conn.transaction()?;
        let mut n = 0;
        for id in ids {
            n += tx.execute("DELETE FROM pending_events WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(n)
    }

    /// Swap a temp foreign key on not-yet-synced events for its canonical id.
    pub fn rewrite_event_refs(&self, temp_id: &str, canonical_id: &str) -> AppResult<usize> {
        let tasks = self.conn.execute(
            "UPDATE pending_events SET task_id = ?2 WHERE task_id = ?1",
            params![temp_id, canonical_id],
        )?;
        let teams = self.conn.execute(
            "UPDATE pending_events SET team_id = ?2 WHERE team_id = ?1",
            params![temp_id, canonical_id],
        )?;
        Ok(tasks + teams)
    }

    // ---------------------------
    // Entity cache
    // ---------------------------

    pub fn put_entity(&self, id: &str, entity: &str, body: &Value) -> AppResult<()> {
        self.conn.execute(
            "INSERT INTO entity_cache (id, entity, body, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                 entity     = excluded.entity,
                 body       = excluded.body,
                 updated_at = excluded.updated_at",
            params![id, entity, body.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get_entity(&self, id: &str) -> AppResult<Option<(String, Value)>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT entity, body FROM entity_cache WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((entity, raw)) => Ok(Some((entity, serde_json::from_str(&raw)?))),
        }
    }

    pub fn delete_entity(&self, id: &str) -> AppResult<()> {
        self.conn
            .execute("DELETE FROM entity_cache WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Candidate cache rows whose body may reference `temp_id`. The LIKE
    /// filter narrows the scan; the caller re-checks with an exact token
    /// walk before rewriting.
    pub fn entities_mentioning(&self, temp_id: &str) -> AppResult<Vec<(String, String, Value)>> {
        let pattern = format!("%{}%", temp_id);
        let mut stmt = self.conn.prepare(
            "SELECT id, entity, body FROM entity_cache WHERE id = ?1 OR body LIKE ?2",
        )?;
        let rows = stmt.query_map(params![temp_id, pattern], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut out = Vec::new();
        for r in rows {
            let (id, entity, raw) = r?;
            out.push((id, entity, serde_json::from_str(&raw)?));
        }
        Ok(out)
    }

    /// Re-key a cached entity from its temp id to the canonical one.
    pub fn rekey_entity(&self, temp_id: &str, canonical_id: &str) -> AppResult<()> {
        self.conn.execute(
            "UPDATE entity_cache SET id = ?2 WHERE id = ?1",
            params![temp_id, canonical_id],
        )?;
        Ok(())
    }

    pub fn update_entity_body(&self, id: &str, body: &Value) -> AppResult<()> {
        self.conn.execute(
            "UPDATE entity_cache SET body = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, body.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
