//! Normalized request/response shapes shared by every wire format.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use conduit_core::{Message, OpaqueMetadata, TokenUsage, ToolCall, ToolSchema};

/// Sampling knobs passed through to the vendor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Overrides the profile's default model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl SamplingParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }
}

/// One exchange to send, borrowed from the caller's conversation.
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub tools: &'a [ToolSchema],
    pub sampling: &'a SamplingParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    /// Map the vendor's stop reason (OpenAI or Anthropic spelling).
    pub fn from_wire(reason: Option<&str>) -> Self {
        match reason {
            None | Some("stop") | Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
            Some("tool_calls") | Some("tool_use") | Some("function_call") => {
                FinishReason::ToolCalls
            }
            Some("length") | Some("max_tokens") => FinishReason::Length,
            Some("content_filter") | Some("refusal") => FinishReason::ContentFilter,
            Some(other) => FinishReason::Other(other.to_string()),
        }
    }
}

/// A decoded vendor reply, before pricing and timing.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateResponse {
    pub content: String,
    pub metadata: Option<OpaqueMetadata>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: TokenUsage,
    pub model: String,
    pub finish_reason: FinishReason,
}

/// Normalized reply handed to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub provider: String,
    pub model: String,
    pub content: String,
    pub metadata: Option<OpaqueMetadata>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: TokenUsage,
    pub cost_usd: f64,
    pub latency: Duration,
    pub finish_reason: FinishReason,
}

impl ModelResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Assistant message carrying content, tool calls and metadata unchanged.
    pub fn to_message(&self) -> Message {
        let mut message = Message::assistant(self.content.clone())
            .with_provider(self.provider.clone())
            .with_tool_calls(self.tool_calls.clone());
        if let Some(metadata) = &self.metadata {
            message = message.with_metadata(metadata.clone());
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::{RawJson, Role};

    #[test]
    fn test_finish_reason_from_wire() {
        assert_eq!(FinishReason::from_wire(Some("end_turn")), FinishReason::Stop);
        assert_eq!(FinishReason::from_wire(Some("tool_use")), FinishReason::ToolCalls);
        assert_eq!(FinishReason::from_wire(Some("max_tokens")), FinishReason::Length);
        assert_eq!(
            FinishReason::from_wire(Some("pause_turn")),
            FinishReason::Other("pause_turn".into())
        );
    }

    #[test]
    fn test_to_message_keeps_metadata() {
        let meta = OpaqueMetadata::new("deepseek")
            .with_field("reasoning", RawJson::from_raw(r#""think""#).unwrap());
        let response = ModelResponse {
            provider: "deepseek".into(),
            model: "deepseek-reasoner".into(),
            content: "answer".into(),
            metadata: Some(meta.clone()),
            tool_calls: vec![ToolCall::new("c1", "read", "{}")],
            usage: TokenUsage::new(1, 2),
            cost_usd: 0.0,
            latency: Duration::from_millis(5),
            finish_reason: FinishReason::ToolCalls,
        };

        let message = response.to_message();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.provider.as_deref(), Some("deepseek"));
        assert_eq!(message.metadata, Some(meta));
        assert_eq!(message.tool_calls.len(), 1);
    }

    #[test]
    fn test_sampling_builder() {
        let params = SamplingParams::new()
            .with_model("m")
            .with_temperature(0.0)
            .with_max_tokens(256);
        assert_eq!(params.model.as_deref(), Some("m"));
        assert_eq!(params.temperature, Some(0.0));
        assert_eq!(params.max_tokens, Some(256));
        assert_eq!(params.top_p, None);
    }
}
