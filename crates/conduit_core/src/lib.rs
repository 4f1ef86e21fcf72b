pub mod conversation;
pub mod db;
pub mod error;
pub mod event;
pub mod message;
pub mod metadata;
pub mod store;
pub mod tool_call;

pub use conversation::{Conversation, ConversationId};
pub use db::SqliteStore;
pub use error::{CoreError, Result};
pub use event::RunEvent;
pub use message::{Message, Role, TokenUsage, Transform};
pub use metadata::{OpaqueMetadata, RawJson};
pub use store::{ConversationStore, InMemoryStore};
pub use tool_call::{ToolCall, ToolSchema};
