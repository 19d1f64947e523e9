//! SQLite connection wrapper for the server store.

use crate::db::initialize::init_db;
use crate::errors::AppResult;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Handle shared between the axum handlers and the side-effect worker.
/// One transaction per ingestion batch; the mutex serializes concurrent
/// batches from overlapping client retries.
pub type SharedDb = Arc<Mutex<Connection>>;

pub struct DbPool {
    pub conn: Connection,
}

impl DbPool {
    /// Open (creating if needed) and migrate the server database.
    pub fn open(path: &str) -> AppResult<Self> {
        let conn = Connection::open(Path::new(path))?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    pub fn into_shared(self) -> SharedDb {
        Arc::new(Mutex::new(self.conn))
    }
}
