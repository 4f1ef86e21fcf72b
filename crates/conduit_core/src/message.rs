use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metadata::OpaqueMetadata;
use crate::tool_call::ToolCall;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
        }
    }
}

/// Marker recording the single transformation applied to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    Compressed {
        original_tokens: u64,
        compressed_tokens: u64,
    },
    Pruned {
        files: Vec<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_tokens: Option<u64>,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            cache_read_tokens: None,
        }
    }

    pub fn with_cache_read(mut self, tokens: u64) -> Self {
        self.cache_read_tokens = Some(tokens);
        self
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        if let Some(cached) = other.cache_read_tokens {
            *self.cache_read_tokens.get_or_insert(0) += cached;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<OpaqueMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub is_error: bool,
    /// Provider id that produced an assistant message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub token_count: u64,
    /// Creation order within the conversation, assigned on append.
    pub seq: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        let mut msg = Self {
            role,
            content: content.into(),
            metadata: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
            is_error: false,
            provider: None,
            token_count: 0,
            seq: 0,
            created_at: Utc::now(),
            transform: None,
        };
        msg.recount();
        msg
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Tool-role message answering the call with `call_id`.
    pub fn tool_result(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.tool_call_id = Some(call_id.into());
        msg.tool_name = Some(tool_name.into());
        msg.is_error = is_error;
        msg
    }

    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = calls;
        self.recount();
        self
    }

    pub fn with_metadata(mut self, metadata: OpaqueMetadata) -> Self {
        self.metadata = Some(metadata);
        self.recount();
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn is_transformed(&self) -> bool {
        self.transform.is_some()
    }

    /// Recompute `token_count` from content, tool calls and metadata, at
    /// roughly four bytes per token.
    pub fn recount(&mut self) {
        let mut bytes = self.content.len();
        for call in &self.tool_calls {
            bytes += call.name.len() + call.arguments.len();
            bytes += call.metadata.as_ref().map_or(0, OpaqueMetadata::raw_len);
        }
        bytes += self.metadata.as_ref().map_or(0, OpaqueMetadata::raw_len);
        self.token_count = (bytes / 4) as u64;
    }

    /// Replace content with a summary and tag the message as compressed.
    ///
    /// Returns `false` without touching anything if the message already
    /// carries a transformation marker.
    pub fn mark_compressed(&mut self, summary: impl Into<String>) -> bool {
        if self.is_transformed() {
            return false;
        }
        let original_tokens = self.token_count;
        self.content = summary.into();
        self.recount();
        self.transform = Some(Transform::Compressed {
            original_tokens,
            compressed_tokens: self.token_count,
        });
        true
    }

    /// Replace content with a placeholder and tag the message as pruned.
    pub fn mark_pruned(&mut self, placeholder: impl Into<String>, files: Vec<String>) -> bool {
        if self.is_transformed() {
            return false;
        }
        self.content = placeholder.into();
        self.recount();
        self.transform = Some(Transform::Pruned { files });
        true
    }
}
