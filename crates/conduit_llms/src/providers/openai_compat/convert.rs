//! Conversion between conduit messages and OpenAI-compatible chat types

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::value::RawValue;

use conduit_core::{Message, OpaqueMetadata, RawJson, Role, TokenUsage, ToolCall};

use super::types::{
    ChatFunctionDef, ChatMessage, ChatRequest, ChatResponse, ChatTool, ChatToolCall,
    ResponseFunction,
};
use crate::error::PermanentProviderError;
use crate::profile::{MetadataScope, ProviderProfile};
use crate::providers::{encode_failure, malformed, outbound_fields, synth_call_id};
use crate::types::{FinishReason, GenerateRequest, GenerateResponse};

/// Convert a generate request into a chat completion body
pub fn encode_request(
    profile: &ProviderProfile,
    request: &GenerateRequest<'_>,
) -> Result<Vec<u8>, PermanentProviderError> {
    let messages = request
        .messages
        .iter()
        .map(|message| to_chat_message(profile, message))
        .collect();

    let tools = request
        .tools
        .iter()
        .map(|tool| ChatTool {
            type_: "function",
            function: ChatFunctionDef {
                name: &tool.name,
                description: &tool.description,
                parameters: &tool.parameters,
            },
        })
        .collect();

    let body = ChatRequest {
        model: request.model,
        messages,
        tools,
        temperature: request.sampling.temperature,
        max_tokens: request.sampling.max_tokens.or(profile.max_output_tokens),
        top_p: request.sampling.top_p,
    };
    serde_json::to_vec(&body).map_err(encode_failure)
}

fn to_chat_message<'a>(profile: &'a ProviderProfile, message: &'a Message) -> ChatMessage<'a> {
    match message.role {
        Role::Assistant => {
            let tool_calls = message
                .tool_calls
                .iter()
                .map(|call| ChatToolCall {
                    id: &call.id,
                    name: &call.name,
                    arguments: if call.arguments.trim().is_empty() {
                        "{}"
                    } else {
                        &call.arguments
                    },
                    extra: outbound_fields(profile, call.metadata.as_ref(), MetadataScope::ToolCall),
                })
                .collect::<Vec<_>>();
            let content = if message.content.is_empty() && !tool_calls.is_empty() {
                None
            } else {
                Some(message.content.as_str())
            };
            ChatMessage {
                role: "assistant",
                content,
                tool_calls,
                tool_call_id: None,
                extra: outbound_fields(profile, message.metadata.as_ref(), MetadataScope::Message),
            }
        }
        Role::Tool => ChatMessage {
            role: "tool",
            content: Some(&message.content),
            tool_calls: Vec::new(),
            tool_call_id: message.tool_call_id.as_deref(),
            extra: Vec::new(),
        },
        Role::User | Role::System => ChatMessage {
            role: message.role.as_str(),
            content: Some(&message.content),
            tool_calls: Vec::new(),
            tool_call_id: None,
            extra: Vec::new(),
        },
    }
}

#[derive(Deserialize)]
struct TextPart {
    #[serde(default)]
    text: Option<String>,
}

/// `content` is a string, null, or (on a few vendors) an array of text parts.
fn content_text(raw: Option<&RawValue>, body: &str) -> Result<String, PermanentProviderError> {
    let Some(raw) = raw else {
        return Ok(String::new());
    };
    if let Ok(text) = serde_json::from_str::<Option<String>>(raw.get()) {
        return Ok(text.unwrap_or_default());
    }
    serde_json::from_str::<Vec<TextPart>>(raw.get())
        .map(|parts| parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .map_err(|e| malformed(format!("unsupported message content: {e}"), body))
}

fn is_null(raw: &RawValue) -> bool {
    raw.get().trim() == "null"
}

/// Move every `scope` field named in the profile out of `source`.
fn take_metadata(
    profile: &ProviderProfile,
    source: &mut HashMap<String, Box<RawValue>>,
    scope: MetadataScope,
) -> Option<OpaqueMetadata> {
    let mut metadata = OpaqueMetadata::new(profile.id.clone());
    for field in profile.fields(scope) {
        if let Some(raw) = source.remove(&field.wire_name) {
            if !is_null(&raw) {
                metadata.insert(field.key.clone(), RawJson::from(raw));
            }
        }
    }
    (!metadata.is_empty()).then_some(metadata)
}

/// Arguments arrive as a JSON string holding JSON, or as the object itself.
fn arguments_text(raw: Option<Box<RawValue>>, body: &str) -> Result<String, PermanentProviderError> {
    match raw {
        None => Ok("{}".to_string()),
        Some(raw) if is_null(&raw) => Ok("{}".to_string()),
        Some(raw) if raw.get().trim_start().starts_with('"') => {
            serde_json::from_str::<String>(raw.get())
                .map_err(|e| malformed(format!("invalid tool arguments: {e}"), body))
        }
        Some(raw) => Ok(raw.get().to_string()),
    }
}

fn decode_tool_call(
    profile: &ProviderProfile,
    mut call: HashMap<String, Box<RawValue>>,
    body: &str,
) -> Result<ToolCall, PermanentProviderError> {
    let id = match call.get("id") {
        Some(raw) => serde_json::from_str::<Option<String>>(raw.get())
            .map_err(|e| malformed(format!("invalid tool call id: {e}"), body))?
            .filter(|id| !id.is_empty()),
        None => None,
    }
    .unwrap_or_else(synth_call_id);

    let function = call
        .get("function")
        .ok_or_else(|| malformed("tool call without function", body))?;
    let function: ResponseFunction = serde_json::from_str(function.get())
        .map_err(|e| malformed(format!("invalid tool call function: {e}"), body))?;
    if function.name.is_empty() {
        return Err(malformed("tool call without name", body));
    }
    let arguments = arguments_text(function.arguments, body)?;

    let mut tool_call = ToolCall::new(id, function.name, arguments);
    if let Some(metadata) = take_metadata(profile, &mut call, MetadataScope::ToolCall) {
        tool_call = tool_call.with_metadata(metadata);
    }
    Ok(tool_call)
}

/// Convert a chat completion body into the normalized response
pub fn decode_response(
    profile: &ProviderProfile,
    body: &str,
) -> Result<GenerateResponse, PermanentProviderError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| malformed(format!("invalid chat completion: {e}"), body))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| malformed("response has no choices", body))?;
    let mut message = choice.message;

    let content = content_text(message.get("content").map(|raw| &**raw), body)?;
    let metadata = take_metadata(profile, &mut message, MetadataScope::Message);

    let tool_calls = match message.remove("tool_calls") {
        Some(raw) if !is_null(&raw) => {
            let calls: Vec<HashMap<String, Box<RawValue>>> = serde_json::from_str(raw.get())
                .map_err(|e| malformed(format!("invalid tool_calls: {e}"), body))?;
            calls
                .into_iter()
                .map(|call| decode_tool_call(profile, call, body))
                .collect::<Result<Vec<_>, _>>()?
        }
        _ => Vec::new(),
    };

    let usage = response
        .usage
        .map(|usage| {
            let cached = usage
                .prompt_tokens_details
                .and_then(|d| d.cached_tokens)
                .or(usage.prompt_cache_hit_tokens);
            let mut total = TokenUsage::new(usage.prompt_tokens, usage.completion_tokens);
            total.cache_read_tokens = cached;
            total
        })
        .unwrap_or_default();

    let finish_reason = if tool_calls.is_empty() {
        FinishReason::from_wire(choice.finish_reason.as_deref())
    } else {
        FinishReason::ToolCalls
    };

    Ok(GenerateResponse {
        content,
        metadata,
        tool_calls,
        usage,
        model: response.model.unwrap_or_default(),
        finish_reason,
    })
}
