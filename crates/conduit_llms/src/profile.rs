//! Provider profiles: static per-vendor descriptors loaded from TOML.
//!
//! A profile names the wire format, endpoint, credentials and the table of
//! vendor fields that carry opaque metadata. Adding a vendor that speaks an
//! existing wire format is a matter of adding a `[[provider]]` entry.

use std::collections::{BTreeMap, HashSet};
use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::PermanentProviderError;
use crate::pricing::{ModelPrice, PriceTable};

const BUILTIN_PROFILES: &str = include_str!("profiles.toml");

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("failed to read profile table: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse profile table: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate provider id '{0}'")]
    Duplicate(String),

    #[error("invalid profile '{provider}': {reason}")]
    Invalid { provider: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// OpenAI-compatible `/chat/completions`.
    OpenaiChat,
    /// Anthropic `/v1/messages`.
    AnthropicMessages,
}

impl WireFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::OpenaiChat => "openai_chat",
            WireFormat::AnthropicMessages => "anthropic_messages",
        }
    }
}

/// Where a metadata field lives in the vendor's message shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataScope {
    /// Beside `content` on the assistant message.
    Message,
    /// Beside `function` on an individual tool call.
    ToolCall,
    /// Content blocks of the given `type`, kept in order.
    ContentBlock,
}

/// One row of the extraction table: vendor field name to internal key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataField {
    pub wire_name: String,
    pub key: String,
    pub scope: MetadataScope,
}

impl MetadataField {
    pub fn new(wire_name: impl Into<String>, key: impl Into<String>, scope: MetadataScope) -> Self {
        Self {
            wire_name: wire_name.into(),
            key: key.into(),
            scope,
        }
    }
}

/// Credentials for a provider.
///
/// `token` is either a literal or `$VAR`, resolved from the environment at
/// request time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_auth_header")]
    pub header: String,
    /// Prefix placed before the token, e.g. `Bearer`. Empty sends the bare token.
    #[serde(default = "default_auth_scheme")]
    pub scheme: String,
    pub token: String,
}

fn default_auth_header() -> String {
    "Authorization".to_string()
}

fn default_auth_scheme() -> String {
    "Bearer".to_string()
}

impl AuthConfig {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            header: default_auth_header(),
            scheme: default_auth_scheme(),
            token: token.into(),
        }
    }

    /// Bare token under a custom header, e.g. `x-api-key`.
    pub fn api_key(header: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            scheme: String::new(),
            token: token.into(),
        }
    }

    /// The token with any `$VAR` reference resolved.
    pub fn resolve_token(&self) -> Result<String, String> {
        match self.token.strip_prefix('$') {
            Some(var) => match env::var(var) {
                Ok(value) if !value.is_empty() => Ok(value),
                _ => Err(format!("environment variable {var} is not set")),
            },
            None if self.token.is_empty() => Err("empty token".to_string()),
            None => Ok(self.token.clone()),
        }
    }

    /// Full header value including the scheme.
    pub fn header_value(&self) -> Result<String, String> {
        let token = self.resolve_token()?;
        if self.scheme.is_empty() {
            Ok(token)
        } else {
            Ok(format!("{} {}", self.scheme, token))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub id: String,
    pub wire_format: WireFormat,
    /// Full request URL.
    pub endpoint: String,
    pub auth: AuthConfig,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub default_model: String,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    #[serde(default)]
    pub metadata: Vec<MetadataField>,
    /// Vendor rejects tool-call turns that come back without their metadata.
    #[serde(default)]
    pub metadata_required_on_tool_call: bool,
    #[serde(default)]
    pub prices: PriceTable,
}

impl ProviderProfile {
    pub fn new(
        id: impl Into<String>,
        wire_format: WireFormat,
        endpoint: impl Into<String>,
        auth: AuthConfig,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            wire_format,
            endpoint: endpoint.into(),
            auth,
            headers: BTreeMap::new(),
            default_model: default_model.into(),
            max_output_tokens: None,
            metadata: Vec::new(),
            metadata_required_on_tool_call: false,
            prices: PriceTable::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_metadata_field(mut self, field: MetadataField) -> Self {
        self.metadata.push(field);
        self
    }

    pub fn with_price(mut self, model: impl Into<String>, price: ModelPrice) -> Self {
        self.prices.insert(model.into(), price);
        self
    }

    pub fn with_metadata_required(mut self, required: bool) -> Self {
        self.metadata_required_on_tool_call = required;
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    /// Extraction rows for one scope, in table order.
    pub fn fields(&self, scope: MetadataScope) -> impl Iterator<Item = &MetadataField> {
        self.metadata.iter().filter(move |f| f.scope == scope)
    }

    /// Wire names this vendor's metadata travels under.
    pub fn metadata_wire_names(&self) -> Vec<&str> {
        self.metadata.iter().map(|f| f.wire_name.as_str()).collect()
    }

    pub fn auth_header(&self) -> Result<(String, String), PermanentProviderError> {
        let value = self
            .auth
            .header_value()
            .map_err(|detail| PermanentProviderError::MissingCredentials {
                provider: self.id.clone(),
                detail,
            })?;
        Ok((self.auth.header.clone(), value))
    }

    pub fn has_credentials(&self) -> bool {
        self.auth.resolve_token().is_ok()
    }

    fn validate(&self) -> Result<(), ProfileError> {
        let invalid = |reason: String| ProfileError::Invalid {
            provider: self.id.clone(),
            reason,
        };
        if self.id.trim().is_empty() {
            return Err(invalid("empty id".to_string()));
        }
        if self.endpoint.trim().is_empty() {
            return Err(invalid("empty endpoint".to_string()));
        }
        let mut keys = HashSet::new();
        let mut wire_names = HashSet::new();
        for field in &self.metadata {
            if !wire_names.insert((field.scope, field.wire_name.as_str())) {
                return Err(invalid(format!(
                    "metadata field '{}' listed twice",
                    field.wire_name
                )));
            }
            if field.scope != MetadataScope::ContentBlock
                && !keys.insert((field.scope, field.key.as_str()))
            {
                return Err(invalid(format!("metadata key '{}' listed twice", field.key)));
            }
            if self.wire_format == WireFormat::OpenaiChat
                && field.scope == MetadataScope::ContentBlock
            {
                return Err(invalid(format!(
                    "content_block field '{}' needs the anthropic_messages format",
                    field.wire_name
                )));
            }
        }
        let mut block_keys = self.fields(MetadataScope::ContentBlock).map(|f| &f.key);
        if let Some(first) = block_keys.next() {
            if block_keys.any(|k| k != first) {
                return Err(invalid(
                    "content_block fields must share one key".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Internal key under which content blocks are stored, in received order.
    pub fn content_block_key(&self) -> Option<&str> {
        self.fields(MetadataScope::ContentBlock)
            .next()
            .map(|f| f.key.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(default, rename = "provider")]
    providers: Vec<ProviderProfile>,
}

/// Read-only set of profiles keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ProviderTable {
    profiles: Vec<ProviderProfile>,
}

impl ProviderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The vendor table compiled into the crate.
    pub fn builtin() -> Result<Self, ProfileError> {
        Self::from_toml_str(BUILTIN_PROFILES)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ProfileError> {
        let file: TableFile = toml::from_str(content)?;
        let mut table = Self::new();
        for profile in file.providers {
            table.insert(profile)?;
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn insert(&mut self, profile: ProviderProfile) -> Result<(), ProfileError> {
        profile.validate()?;
        if self.get(&profile.id).is_some() {
            return Err(ProfileError::Duplicate(profile.id));
        }
        self.profiles.push(profile);
        Ok(())
    }

    /// Add or replace a profile.
    pub fn upsert(&mut self, profile: ProviderProfile) -> Result<(), ProfileError> {
        profile.validate()?;
        match self.profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
        Ok(())
    }

    /// Entries of `other` replace same-id entries of `self`.
    pub fn merge(mut self, other: ProviderTable) -> Result<Self, ProfileError> {
        for profile in other.profiles {
            self.upsert(profile)?;
        }
        Ok(self)
    }

    pub fn get(&self, id: &str) -> Option<&ProviderProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn profile(&self, id: &str) -> Result<&ProviderProfile, PermanentProviderError> {
        self.get(id)
            .ok_or_else(|| PermanentProviderError::UnknownProvider(id.to_string()))
    }

    pub fn ids(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_loads() {
        let table = ProviderTable::builtin().unwrap();
        for id in ["openai", "deepseek", "zai", "gemini", "anthropic"] {
            assert!(table.get(id).is_some(), "missing builtin profile {id}");
        }

        let gemini = table.get("gemini").unwrap();
        assert_eq!(gemini.wire_format, WireFormat::OpenaiChat);
        assert!(gemini.metadata_required_on_tool_call);
        assert_eq!(gemini.fields(MetadataScope::ToolCall).count(), 1);

        let anthropic = table.get("anthropic").unwrap();
        assert_eq!(anthropic.wire_format, WireFormat::AnthropicMessages);
        assert_eq!(anthropic.auth.header, "x-api-key");
        assert!(anthropic.headers.contains_key("anthropic-version"));
        assert_eq!(anthropic.fields(MetadataScope::ContentBlock).count(), 2);
    }

    #[test]
    fn test_from_toml_str() {
        let table = ProviderTable::from_toml_str(
            r#"
            [[provider]]
            id = "local"
            wire_format = "openai_chat"
            endpoint = "http://localhost:8080/v1/chat/completions"
            default_model = "qwen"
            auth = { token = "sk-local" }

            [[provider.metadata]]
            wire_name = "reasoning_content"
            key = "reasoning"
            scope = "message"

            [provider.prices.qwen]
            input_per_mtok = 0.1
            output_per_mtok = 0.2
            "#,
        )
        .unwrap();

        let local = table.get("local").unwrap();
        assert_eq!(local.auth.header, "Authorization");
        assert_eq!(local.auth.scheme, "Bearer");
        assert_eq!(local.metadata[0].scope, MetadataScope::Message);
        assert!(local.prices.contains_key("qwen"));
        assert!(!local.metadata_required_on_tool_call);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let entry = r#"
            [[provider]]
            id = "a"
            wire_format = "openai_chat"
            endpoint = "http://x"
            default_model = "m"
            auth = { token = "t" }
        "#;
        let doubled = format!("{entry}{entry}");
        assert!(matches!(
            ProviderTable::from_toml_str(&doubled),
            Err(ProfileError::Duplicate(id)) if id == "a"
        ));
    }

    #[test]
    fn test_content_block_needs_anthropic_format() {
        let profile = ProviderProfile::new(
            "bad",
            WireFormat::OpenaiChat,
            "http://x",
            AuthConfig::bearer("t"),
            "m",
        )
        .with_metadata_field(MetadataField::new("thinking", "thinking", MetadataScope::ContentBlock));
        let mut table = ProviderTable::new();
        assert!(matches!(
            table.insert(profile),
            Err(ProfileError::Invalid { .. })
        ));
    }

    #[test]
    fn test_repeated_metadata_field_rejected() {
        let base = || {
            ProviderProfile::new(
                "dup",
                WireFormat::OpenaiChat,
                "http://x",
                AuthConfig::bearer("t"),
                "m",
            )
        };

        let same_wire_name = base()
            .with_metadata_field(MetadataField::new("reasoning_content", "reasoning", MetadataScope::Message))
            .with_metadata_field(MetadataField::new("reasoning_content", "thoughts", MetadataScope::Message));
        assert!(matches!(
            ProviderTable::new().insert(same_wire_name),
            Err(ProfileError::Invalid { .. })
        ));

        let same_key = base()
            .with_metadata_field(MetadataField::new("reasoning_content", "reasoning", MetadataScope::Message))
            .with_metadata_field(MetadataField::new("reasoning", "reasoning", MetadataScope::Message));
        assert!(matches!(
            ProviderTable::new().insert(same_key),
            Err(ProfileError::Invalid { .. })
        ));

        // one wire name may appear at both scopes
        let both_scopes = base()
            .with_metadata_field(MetadataField::new("extra_content", "signature", MetadataScope::Message))
            .with_metadata_field(MetadataField::new("extra_content", "signature", MetadataScope::ToolCall));
        assert!(ProviderTable::new().insert(both_scopes).is_ok());
    }

    #[test]
    fn test_resolve_token_from_env() {
        // SAFETY: no other test reads or writes this variable.
        unsafe { env::set_var("CONDUIT_TEST_PROFILE_TOKEN", "secret") };
        let auth = AuthConfig::bearer("$CONDUIT_TEST_PROFILE_TOKEN");
        assert_eq!(auth.header_value().unwrap(), "Bearer secret");
        unsafe { env::remove_var("CONDUIT_TEST_PROFILE_TOKEN") };

        let missing = AuthConfig::bearer("$CONDUIT_TEST_PROFILE_TOKEN_UNSET");
        assert!(missing.resolve_token().is_err());

        let key = AuthConfig::api_key("x-api-key", "literal");
        assert_eq!(key.header_value().unwrap(), "literal");
    }

    #[test]
    fn test_missing_credentials_error() {
        let profile = ProviderProfile::new(
            "p",
            WireFormat::OpenaiChat,
            "http://x",
            AuthConfig::bearer("$CONDUIT_TEST_NEVER_SET_TOKEN"),
            "m",
        );
        assert!(!profile.has_credentials());
        assert!(matches!(
            profile.auth_header(),
            Err(PermanentProviderError::MissingCredentials { .. })
        ));
    }

    #[test]
    fn test_merge_overrides_by_id() {
        let base = ProviderTable::builtin().unwrap();
        let count = base.len();
        let mut overrides = ProviderTable::new();
        overrides
            .insert(
                base.get("openai")
                    .unwrap()
                    .clone()
                    .with_endpoint("http://proxy/v1/chat/completions"),
            )
            .unwrap();

        let merged = base.merge(overrides).unwrap();
        assert_eq!(merged.len(), count);
        assert_eq!(
            merged.get("openai").unwrap().endpoint,
            "http://proxy/v1/chat/completions"
        );
    }
}
