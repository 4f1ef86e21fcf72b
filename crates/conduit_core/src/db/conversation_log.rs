//! Conversation log persistence in the `messages` table.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::params;
use tracing::{debug, warn};

use super::{open_db, open_db_at};
use crate::conversation::ConversationId;
use crate::error::{CoreError, Result};
use crate::message::Message;
use crate::store::ConversationStore;

/// SQLite-backed append/read log.
pub struct SqliteStore {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteStore {
    /// Open (or create) the log under `workspace_root/.conduit`.
    pub fn open(workspace_root: &Path) -> Result<Self> {
        let conn = open_db(workspace_root)?;
        debug!(root = %workspace_root.display(), "conversation log opened");
        Ok(Self::from_connection(conn))
    }

    /// Open (or create) the log inside an explicit conduit dir.
    pub fn open_at(conduit_dir: &Path) -> Result<Self> {
        Ok(Self::from_connection(open_db_at(conduit_dir)?))
    }

    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, rusqlite::Connection>> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Store("connection mutex poisoned".to_string()))
    }

    /// Ids of all stored conversations, most recently written first.
    pub fn conversation_ids(&self) -> Result<Vec<ConversationId>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT conversation_id FROM messages GROUP BY conversation_id ORDER BY MAX(created_at) DESC",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let ids = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids.into_iter().map(ConversationId).collect())
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn append(&self, conversation_id: &ConversationId, message: &Message) -> Result<()> {
        let body = serde_json::to_string(message)?;
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT INTO messages (conversation_id, seq, role, body, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                conversation_id.as_str(),
                message.seq as i64,
                message.role.as_str(),
                body,
                message.created_at.to_rfc3339(),
            ],
        );
        if let Err(e) = inserted {
            warn!(conversation.id = %conversation_id, seq = message.seq, error = %e, "append failed");
            return Err(e.into());
        }
        Ok(())
    }

    async fn read(&self, conversation_id: &ConversationId) -> Result<Vec<Message>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT body FROM messages WHERE conversation_id = ?1 ORDER BY seq")?;
        let rows = stmt.query_map(params![conversation_id.as_str()], |row| {
            row.get::<_, String>(0)
        })?;
        let bodies = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        bodies
            .iter()
            .map(|body| serde_json::from_str::<Message>(body).map_err(CoreError::from))
            .collect()
    }
}
