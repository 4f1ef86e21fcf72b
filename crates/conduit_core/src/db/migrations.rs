//! SQL schema for the conversation DB. Applied on open.

/// Conversation log: one row per message, the message itself stored as JSON.
pub const MESSAGES: &str = "
CREATE TABLE IF NOT EXISTS messages (
    conversation_id TEXT NOT NULL,
    seq INTEGER NOT NULL,
    role TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (conversation_id, seq)
);
";

/// Run all migrations on an open connection.
pub fn run_all(conn: &rusqlite::Connection) -> anyhow::Result<()> {
    conn.execute_batch(MESSAGES)?;
    Ok(())
}
