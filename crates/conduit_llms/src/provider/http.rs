//! reqwest-backed provider for every wire format.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::Client;
use tracing::debug;

use super::Provider;
use crate::error::{classify_status, parse_retry_after, Result};
use crate::profile::ProviderProfile;
use crate::providers::{decode_response, encode_request};
use crate::types::{GenerateRequest, GenerateResponse};

/// Sends requests over a shared, pooled HTTP client.
#[derive(Debug, Clone, Default)]
pub struct HttpProvider {
    client: Client,
}

impl HttpProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn generate(
        &self,
        profile: &ProviderProfile,
        request: GenerateRequest<'_>,
    ) -> Result<GenerateResponse> {
        let body = encode_request(profile, &request)?;
        let (auth_header, auth_value) = profile.auth_header()?;

        let mut builder = self
            .client
            .post(&profile.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(auth_header.as_str(), auth_value);
        for (name, value) in &profile.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        debug!(
            provider = %profile.id,
            model = request.model,
            messages = request.messages.len(),
            bytes = body.len(),
            "sending provider request"
        );
        let response = builder.body(body).send().await?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let text = response.text().await?;

        if !status.is_success() {
            return Err(classify_status(
                status.as_u16(),
                text,
                retry_after,
                &profile.metadata_wire_names(),
            ));
        }
        Ok(decode_response(profile, &text)?)
    }
}
