//! Wire codecs, one module per wire format.
//!
//! Codecs translate between `conduit_core` messages and vendor JSON. They are
//! pure: no I/O, no retries. Opaque metadata is emitted only when its
//! provider tag matches the target profile and its key is named in that
//! profile's extraction table.

pub mod anthropic;
pub mod openai_compat;

use serde_json::value::RawValue;
use tracing::warn;

use conduit_core::{Message, OpaqueMetadata, Role};

use crate::error::PermanentProviderError;
use crate::profile::{MetadataScope, ProviderProfile, WireFormat};
use crate::types::{GenerateRequest, GenerateResponse};

/// Serialize `request` into the profile's wire format.
pub fn encode_request(
    profile: &ProviderProfile,
    request: &GenerateRequest<'_>,
) -> Result<Vec<u8>, PermanentProviderError> {
    for message in request.messages {
        check_required_metadata(profile, message);
    }
    match profile.wire_format {
        WireFormat::OpenaiChat => openai_compat::encode_request(profile, request),
        WireFormat::AnthropicMessages => anthropic::encode_request(profile, request),
    }
}

/// Parse a success body into the normalized shape.
pub fn decode_response(
    profile: &ProviderProfile,
    body: &str,
) -> Result<GenerateResponse, PermanentProviderError> {
    match profile.wire_format {
        WireFormat::OpenaiChat => openai_compat::decode_response(profile, body),
        WireFormat::AnthropicMessages => anthropic::decode_response(profile, body),
    }
}

/// `(wire_name, raw)` pairs of `metadata` that may go back to `profile` at `scope`.
pub(crate) fn outbound_fields<'a>(
    profile: &'a ProviderProfile,
    metadata: Option<&'a OpaqueMetadata>,
    scope: MetadataScope,
) -> Vec<(&'a str, &'a RawValue)> {
    let Some(metadata) = metadata.filter(|m| m.is_from(&profile.id)) else {
        return Vec::new();
    };
    profile
        .fields(scope)
        .filter_map(|field| {
            metadata
                .get(&field.key)
                .map(|raw| (field.wire_name.as_str(), raw.as_raw()))
        })
        .collect()
}

/// Warn when a vendor that requires metadata on tool-call turns is about to
/// receive one of its own turns without any. Nothing is synthesized.
fn check_required_metadata(profile: &ProviderProfile, message: &Message) {
    if !profile.metadata_required_on_tool_call
        || message.role != Role::Assistant
        || !message.has_tool_calls()
        || message.provider.as_deref() != Some(profile.id.as_str())
    {
        return;
    }
    let has_any = [MetadataScope::Message, MetadataScope::ContentBlock]
        .into_iter()
        .any(|scope| !outbound_fields(profile, message.metadata.as_ref(), scope).is_empty())
        || message.tool_calls.iter().any(|call| {
            !outbound_fields(profile, call.metadata.as_ref(), MetadataScope::ToolCall).is_empty()
        });
    if !has_any {
        warn!(
            provider = %profile.id,
            seq = message.seq,
            "tool-call turn has no opaque metadata; vendor may reject the request"
        );
    }
}

/// Fresh id for a tool call the vendor left unnamed.
pub(crate) fn synth_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

pub(crate) fn malformed(reason: impl Into<String>, body: &str) -> PermanentProviderError {
    PermanentProviderError::malformed_response(reason, body)
}

pub(crate) fn encode_failure(err: serde_json::Error) -> PermanentProviderError {
    PermanentProviderError::MalformedRequest {
        status: 0,
        payload: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{AuthConfig, MetadataField};
    use conduit_core::RawJson;

    fn profile() -> ProviderProfile {
        ProviderProfile::new(
            "deepseek",
            WireFormat::OpenaiChat,
            "http://x",
            AuthConfig::bearer("t"),
            "m",
        )
        .with_metadata_field(MetadataField::new(
            "reasoning_content",
            "reasoning",
            MetadataScope::Message,
        ))
    }

    #[test]
    fn test_outbound_fields_filters_provider_and_key() {
        let profile = profile();
        let own = OpaqueMetadata::new("deepseek")
            .with_field("reasoning", RawJson::from_raw(r#""r""#).unwrap())
            .with_field("unlisted", RawJson::from_raw("1").unwrap());
        let fields = outbound_fields(&profile, Some(&own), MetadataScope::Message);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, "reasoning_content");
        assert_eq!(fields[0].1.get(), r#""r""#);

        let foreign = OpaqueMetadata::new("zai")
            .with_field("reasoning", RawJson::from_raw(r#""r""#).unwrap());
        assert!(outbound_fields(&profile, Some(&foreign), MetadataScope::Message).is_empty());
        assert!(outbound_fields(&profile, None, MetadataScope::Message).is_empty());
    }

    #[test]
    fn test_synth_call_id_unique() {
        assert_ne!(synth_call_id(), synth_call_id());
        assert!(synth_call_id().starts_with("call_"));
    }
}
