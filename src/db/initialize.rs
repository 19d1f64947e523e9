use crate::db::migrate::run_pending_migrations;
use crate::errors::AppResult;
use rusqlite::Connection;

/// Initialize the server store: durability pragmas first, then whatever
/// schema migrations are still pending. Safe to call on every open.
pub fn init_db(conn: &Connection) -> AppResult<()> {
    // journal_mode returns the resulting mode as a row, so it cannot go
    // through execute_batch.
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    run_pending_migrations(conn)?;
    Ok(())
}
