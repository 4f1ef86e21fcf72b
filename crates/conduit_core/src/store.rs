//! Conversation persistence seam.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use crate::conversation::ConversationId;
use crate::error::{CoreError, Result};
use crate::message::Message;

/// Append-only message log keyed by conversation.
///
/// `read` returns messages in creation order. Messages are stored whole,
/// opaque metadata included, so a reloaded conversation replays to a vendor
/// byte for byte.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn append(&self, conversation_id: &ConversationId, message: &Message) -> Result<()>;

    async fn read(&self, conversation_id: &ConversationId) -> Result<Vec<Message>>;
}

/// Process-local store for tests and one-shot runs.
#[derive(Default)]
pub struct InMemoryStore {
    conversations: RwLock<HashMap<ConversationId, Vec<Message>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn append(&self, conversation_id: &ConversationId, message: &Message) -> Result<()> {
        let mut conversations = self.conversations.write().await;
        let log = conversations.entry(conversation_id.clone()).or_default();
        if log.iter().any(|m| m.seq == message.seq) {
            warn!(conversation.id = %conversation_id, seq = message.seq, "duplicate message rejected");
            return Err(CoreError::Store(format!(
                "message {} already stored for {}",
                message.seq, conversation_id
            )));
        }
        log.push(message.clone());
        Ok(())
    }

    async fn read(&self, conversation_id: &ConversationId) -> Result<Vec<Message>> {
        let conversations = self.conversations.read().await;
        let mut messages = conversations
            .get(conversation_id)
            .cloned()
            .unwrap_or_default();
        messages.sort_by_key(|m| m.seq);
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Conversation;

    #[tokio::test]
    async fn test_in_memory_append_read() {
        let store = InMemoryStore::new();
        let id = ConversationId::from("c");
        let mut conv = Conversation::with_id(id.clone());
        conv.push(Message::user("hello"));
        conv.push(Message::assistant("hi"));

        // Out of order on purpose; reads come back by seq.
        store.append(&id, &conv.messages[1]).await.unwrap();
        store.append(&id, &conv.messages[0]).await.unwrap();

        let loaded = store.read(&id).await.unwrap();
        assert_eq!(loaded, conv.messages);
        assert_eq!(store.conversation_count().await, 1);
    }

    #[tokio::test]
    async fn test_in_memory_rejects_duplicate_seq() {
        let store = InMemoryStore::new();
        let id = ConversationId::from("c");
        let msg = Message::user("hello");
        store.append(&id, &msg).await.unwrap();
        assert!(matches!(
            store.append(&id, &msg).await,
            Err(CoreError::Store(_))
        ));
    }

    #[tokio::test]
    async fn test_in_memory_isolated_by_id() {
        let store = InMemoryStore::new();
        store
            .append(&ConversationId::from("a"), &Message::user("a"))
            .await
            .unwrap();
        assert!(store
            .read(&ConversationId::from("b"))
            .await
            .unwrap()
            .is_empty());
    }
}
