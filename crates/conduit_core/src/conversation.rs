use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::message::{Message, Role};
use crate::tool_call::ToolCall;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered, append-only sequence of messages for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::with_id(ConversationId::new())
    }

    pub fn with_id(id: ConversationId) -> Self {
        Self {
            id,
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Rebuild a conversation from stored messages, ordered by `seq`.
    pub fn from_messages(id: ConversationId, mut messages: Vec<Message>) -> Self {
        messages.sort_by_key(|m| m.seq);
        let created_at = messages.first().map_or_else(Utc::now, |m| m.created_at);
        Self {
            id,
            messages,
            created_at,
        }
    }

    /// Append a message, assigning its creation order.
    pub fn push(&mut self, mut message: Message) -> &Message {
        message.seq = self.next_seq();
        message.recount();
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    fn next_seq(&self) -> u64 {
        self.messages.last().map_or(0, |m| m.seq + 1)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn estimated_tokens(&self) -> u64 {
        self.messages.iter().map(|m| m.token_count).sum()
    }

    /// Text of the latest user message.
    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// Content of the latest assistant message.
    pub fn final_answer(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    /// Provider that produced the most recent assistant message.
    pub fn active_provider(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.role == Role::Assistant)
            .find_map(|m| m.provider.as_deref())
    }

    /// Drop every piece of opaque metadata not produced by `provider`.
    ///
    /// Returns the number of metadata entries removed.
    pub fn strip_foreign_metadata(&mut self, provider: &str) -> usize {
        let mut removed = 0;
        for message in &mut self.messages {
            let before = removed;
            if message.metadata.as_ref().is_some_and(|m| !m.is_from(provider)) {
                message.metadata = None;
                removed += 1;
            }
            for call in &mut message.tool_calls {
                if call.metadata.as_ref().is_some_and(|m| !m.is_from(provider)) {
                    call.metadata = None;
                    removed += 1;
                }
            }
            if removed > before {
                message.recount();
            }
        }
        removed
    }

    /// Tool calls of the last assistant message that have no result yet.
    pub fn pending_tool_calls(&self) -> Vec<&ToolCall> {
        let Some(pos) = self.messages.iter().rposition(|m| m.role == Role::Assistant) else {
            return Vec::new();
        };
        let answered: Vec<&str> = self.messages[pos + 1..]
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        self.messages[pos]
            .tool_calls
            .iter()
            .filter(|c| !answered.contains(&c.id.as_str()))
            .collect()
    }

    /// Check that every tool message answers exactly one call of the nearest
    /// preceding assistant message.
    pub fn validate_tool_pairing(&self) -> Result<()> {
        let mut current: Option<(usize, Vec<&str>)> = None;
        for (index, message) in self.messages.iter().enumerate() {
            match message.role {
                Role::Assistant => {
                    current = Some((
                        index,
                        message.tool_calls.iter().map(|c| c.id.as_str()).collect(),
                    ));
                }
                Role::Tool => {
                    let id = message.tool_call_id.as_deref().unwrap_or("");
                    let Some((_, open)) = current.as_mut() else {
                        return Err(CoreError::ToolPairing {
                            index,
                            tool_call_id: id.to_string(),
                        });
                    };
                    match open.iter().position(|c| *c == id) {
                        Some(found) => {
                            open.remove(found);
                        }
                        None => {
                            return Err(CoreError::ToolPairing {
                                index,
                                tool_call_id: id.to_string(),
                            })
                        }
                    }
                }
                Role::User | Role::System => {}
            }
        }
        Ok(())
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
