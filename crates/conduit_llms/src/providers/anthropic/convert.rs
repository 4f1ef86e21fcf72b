//! Conversion between conduit messages and Anthropic Messages types

use serde_json::value::RawValue;
use tracing::debug;

use conduit_core::{Message, OpaqueMetadata, RawJson, Role, TokenUsage, ToolCall};

use super::types::{
    Block, BlockHead, MessagesRequest, MessagesResponse, TextBlock, ToolDef, ToolUseBlock, Turn,
};
use crate::error::PermanentProviderError;
use crate::profile::{MetadataScope, ProviderProfile};
use crate::providers::{encode_failure, malformed, synth_call_id};
use crate::types::{FinishReason, GenerateRequest, GenerateResponse};

/// Used when neither the request nor the profile sets an output bound.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Convert a generate request into a Messages API body
pub fn encode_request(
    profile: &ProviderProfile,
    request: &GenerateRequest<'_>,
) -> Result<Vec<u8>, PermanentProviderError> {
    let mut system = Vec::new();
    let mut turns: Vec<Turn<'_>> = Vec::new();

    for message in request.messages {
        match message.role {
            Role::System => system.push(message.content.as_str()),
            Role::User => {
                if !message.content.is_empty() {
                    push_blocks(&mut turns, "user", vec![Block::Text(&message.content)]);
                }
            }
            Role::Tool => push_blocks(
                &mut turns,
                "user",
                vec![Block::ToolResult {
                    tool_use_id: message.tool_call_id.as_deref().unwrap_or_default(),
                    content: &message.content,
                    is_error: message.is_error,
                }],
            ),
            Role::Assistant => {
                let mut blocks = thinking_blocks(profile, message)?;
                if !message.content.is_empty() {
                    blocks.push(Block::Text(&message.content));
                }
                for call in &message.tool_calls {
                    blocks.push(Block::ToolUse {
                        id: &call.id,
                        name: &call.name,
                        input: tool_input(call)?,
                    });
                }
                if !blocks.is_empty() {
                    push_blocks(&mut turns, "assistant", blocks);
                }
            }
        }
    }

    let tools = request
        .tools
        .iter()
        .map(|tool| ToolDef {
            name: &tool.name,
            description: &tool.description,
            input_schema: &tool.parameters,
        })
        .collect();

    let body = MessagesRequest {
        model: request.model,
        max_tokens: request
            .sampling
            .max_tokens
            .or(profile.max_output_tokens)
            .unwrap_or(DEFAULT_MAX_TOKENS),
        system: (!system.is_empty()).then(|| system.join("\n\n")),
        messages: turns,
        tools,
        temperature: request.sampling.temperature,
        top_p: request.sampling.top_p,
    };
    serde_json::to_vec(&body).map_err(encode_failure)
}

/// Consecutive same-role messages merge into one turn.
fn push_blocks<'a>(turns: &mut Vec<Turn<'a>>, role: &'static str, blocks: Vec<Block<'a>>) {
    match turns.last_mut() {
        Some(last) if last.role == role => last.content.extend(blocks),
        _ => turns.push(Turn {
            role,
            content: blocks,
        }),
    }
}

/// Stored thinking blocks of this provider, in received order.
fn thinking_blocks<'a>(
    profile: &ProviderProfile,
    message: &'a Message,
) -> Result<Vec<Block<'a>>, PermanentProviderError> {
    let Some(key) = profile.content_block_key() else {
        return Ok(Vec::new());
    };
    let Some(raw) = message
        .metadata
        .as_ref()
        .filter(|m| m.is_from(&profile.id))
        .and_then(|m| m.get(key))
    else {
        return Ok(Vec::new());
    };
    let blocks: Vec<&'a RawValue> =
        serde_json::from_str(raw.as_str()).map_err(encode_failure)?;
    Ok(blocks.into_iter().map(Block::Raw).collect())
}

fn tool_input(call: &ToolCall) -> Result<&RawValue, PermanentProviderError> {
    let text = if call.arguments.trim().is_empty() {
        "{}"
    } else {
        call.arguments.as_str()
    };
    serde_json::from_str(text).map_err(|e| PermanentProviderError::MalformedRequest {
        status: 0,
        payload: format!("tool call '{}' has invalid arguments: {e}", call.id),
    })
}

/// Convert a Messages API body into the normalized response
pub fn decode_response(
    profile: &ProviderProfile,
    body: &str,
) -> Result<GenerateResponse, PermanentProviderError> {
    let response: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| malformed(format!("invalid messages response: {e}"), body))?;

    let block_types: Vec<&str> = profile
        .fields(MetadataScope::ContentBlock)
        .map(|f| f.wire_name.as_str())
        .collect();

    let mut content = String::new();
    let mut kept: Vec<&str> = Vec::new();
    let mut tool_calls = Vec::new();

    for block in &response.content {
        let head: BlockHead = serde_json::from_str(block.get())
            .map_err(|e| malformed(format!("content block without type: {e}"), body))?;
        match head.kind.as_str() {
            "text" => {
                let text: TextBlock = serde_json::from_str(block.get())
                    .map_err(|e| malformed(format!("invalid text block: {e}"), body))?;
                content.push_str(&text.text);
            }
            "tool_use" => {
                let tool: ToolUseBlock = serde_json::from_str(block.get())
                    .map_err(|e| malformed(format!("invalid tool_use block: {e}"), body))?;
                let id = if tool.id.is_empty() {
                    synth_call_id()
                } else {
                    tool.id
                };
                tool_calls.push(ToolCall::new(id, tool.name, tool.input.get()));
            }
            kind if block_types.contains(&kind) => kept.push(block.get()),
            other => debug!(kind = other, "ignoring content block"),
        }
    }

    let metadata = match profile.content_block_key() {
        Some(key) if !kept.is_empty() => {
            let raw = RawJson::from_raw(format!("[{}]", kept.join(",")))
                .map_err(|e| malformed(format!("invalid thinking block: {e}"), body))?;
            Some(OpaqueMetadata::new(profile.id.clone()).with_field(key, raw))
        }
        _ => None,
    };

    let usage = response
        .usage
        .map(|usage| {
            let mut total = TokenUsage::new(usage.input_tokens, usage.output_tokens);
            total.cache_read_tokens = usage.cache_read_input_tokens;
            total
        })
        .unwrap_or_default();

    let finish_reason = if tool_calls.is_empty() {
        FinishReason::from_wire(response.stop_reason.as_deref())
    } else {
        FinishReason::ToolCalls
    };

    Ok(GenerateResponse {
        content,
        metadata,
        tool_calls,
        usage,
        model: response.model.clone().unwrap_or_default(),
        finish_reason,
    })
}
