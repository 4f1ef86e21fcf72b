//! `.conduit/` directory layout.
//!
//! - `conduit.db` + WAL: conversation log.
//! - `logs/`: log files written by the CLI.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Basename of the conversation DB (SQLite creates .db-wal and .db-shm alongside).
pub const CONDUIT_DB: &str = "conduit.db";
/// Subdir for log files.
pub const LOGS_DIR: &str = "logs";

/// Ensures `conduit_dir` and `conduit_dir/logs` exist; returns path to conduit.db.
pub fn ensure_conduit_dir_at(conduit_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(conduit_dir).context("create conduit dir")?;
    std::fs::create_dir_all(conduit_dir.join(LOGS_DIR)).context("create logs dir")?;
    Ok(conduit_dir.join(CONDUIT_DB))
}

/// Ensures `.conduit` and `.conduit/logs` exist under the workspace root.
pub fn ensure_conduit_dir(workspace_root: &Path) -> Result<PathBuf> {
    ensure_conduit_dir_at(&workspace_root.join(".conduit"))
}
