//! Open the conversation DB with WAL and migrations.

use anyhow::{Context, Result};
use std::path::Path;

use super::layout;
use super::migrations;

/// Opens the DB inside a conduit dir (e.g. ~/.conduit or workspace/.conduit).
/// Creates dirs if needed, enables WAL, runs migrations.
pub fn open_db_at(conduit_dir: &Path) -> Result<rusqlite::Connection> {
    let db_path = layout::ensure_conduit_dir_at(conduit_dir)?;
    let conn = rusqlite::Connection::open(&db_path).context("open conduit.db")?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
    migrations::run_all(&conn)?;
    Ok(conn)
}

/// Opens the workspace DB (creates .conduit/logs if needed).
pub fn open_db(workspace_root: &Path) -> Result<rusqlite::Connection> {
    open_db_at(&workspace_root.join(".conduit"))
}
