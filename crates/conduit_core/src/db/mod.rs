//! Workspace SQLite DB under `.conduit/`.
//!
//! - `conduit.db` + WAL: append-only conversation log.
//! - `logs/`: log files written by the CLI.

mod connection;
mod conversation_log;
mod layout;
mod migrations;

pub use connection::{open_db, open_db_at};
pub use conversation_log::SqliteStore;
pub use layout::{ensure_conduit_dir, ensure_conduit_dir_at, CONDUIT_DB, LOGS_DIR};
pub use migrations::run_all as run_migrations;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_conduit_dir_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path();
        let db_path = ensure_conduit_dir(repo).unwrap();
        assert_eq!(db_path, repo.join(".conduit").join(CONDUIT_DB));
        assert!(repo.join(".conduit").is_dir());
        assert!(repo.join(".conduit").join(LOGS_DIR).is_dir());
    }

    #[test]
    fn open_db_runs_migrations() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open_db(dir.path()).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        run_migrations(&conn).unwrap();
    }
}
