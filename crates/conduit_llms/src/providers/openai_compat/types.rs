//! OpenAI-compatible chat completion wire types.
//!
//! Outbound messages carry vendor metadata as extra keys, so they serialize
//! by hand. Inbound messages are read as a map of raw values so metadata
//! fields are never re-encoded.

use std::collections::HashMap;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ChatTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

#[derive(Debug)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    /// `None` serializes as `null` (assistant turns that only call tools).
    pub content: Option<&'a str>,
    pub tool_calls: Vec<ChatToolCall<'a>>,
    pub tool_call_id: Option<&'a str>,
    /// Message-scoped metadata, emitted verbatim.
    pub extra: Vec<(&'a str, &'a RawValue)>,
}

impl Serialize for ChatMessage<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("role", self.role)?;
        map.serialize_entry("content", &self.content)?;
        for (name, raw) in &self.extra {
            map.serialize_entry(name, raw)?;
        }
        if !self.tool_calls.is_empty() {
            map.serialize_entry("tool_calls", &self.tool_calls)?;
        }
        if let Some(id) = self.tool_call_id {
            map.serialize_entry("tool_call_id", id)?;
        }
        map.end()
    }
}

#[derive(Debug)]
pub struct ChatToolCall<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub arguments: &'a str,
    /// Tool-call-scoped metadata, emitted verbatim beside `function`.
    pub extra: Vec<(&'a str, &'a RawValue)>,
}

#[derive(Serialize)]
struct FunctionRef<'a> {
    name: &'a str,
    arguments: &'a str,
}

impl Serialize for ChatToolCall<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", self.id)?;
        map.serialize_entry("type", "function")?;
        map.serialize_entry(
            "function",
            &FunctionRef {
                name: self.name,
                arguments: self.arguments,
            },
        )?;
        for (name, raw) in &self.extra {
            map.serialize_entry(name, raw)?;
        }
        map.end()
    }
}

#[derive(Debug, Serialize)]
pub struct ChatTool<'a> {
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub function: ChatFunctionDef<'a>,
}

#[derive(Debug, Serialize)]
pub struct ChatFunctionDef<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub parameters: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// Kept raw so metadata fields survive untouched.
    pub message: HashMap<String, Box<RawValue>>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub prompt_tokens_details: Option<PromptTokensDetails>,
    /// DeepSeek reports cache hits at the top level.
    #[serde(default)]
    pub prompt_cache_hit_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PromptTokensDetails {
    #[serde(default)]
    pub cached_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseFunction {
    #[serde(default)]
    pub name: String,
    /// A JSON string on most vendors, an object on some.
    #[serde(default)]
    pub arguments: Option<Box<RawValue>>,
}
