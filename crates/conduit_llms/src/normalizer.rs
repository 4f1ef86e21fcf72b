//! The provider-normalizing client.
//!
//! Wraps a [`Provider`] with the profile table, retry policy, per-attempt
//! timeout and pricing, and hands back a [`ModelResponse`] that carries no
//! vendor-specific shape.

use std::sync::Arc;
use std::time::{Duration, Instant};

use conduit_observability::{provider_span, record_duration, record_error};
use tracing::{info, warn, Instrument};

use conduit_core::{Message, TokenUsage, ToolSchema};

use crate::error::{PermanentProviderError, ProviderError, Result, TransientProviderError};
use crate::pricing::estimate_cost;
use crate::profile::{ProviderProfile, ProviderTable};
use crate::provider::{HttpProvider, Provider};
use crate::retry::RetryPolicy;
use crate::types::{GenerateRequest, GenerateResponse, ModelResponse, SamplingParams};

/// Default bound on a single provider attempt.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone)]
pub struct Normalizer {
    provider: Arc<dyn Provider>,
    table: Arc<ProviderTable>,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl Normalizer {
    /// Normalizer sending real HTTP requests.
    pub fn new(table: ProviderTable) -> Self {
        Self::with_provider(table, Arc::new(HttpProvider::new()))
    }

    pub fn with_provider(table: ProviderTable, provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            table: Arc::new(table),
            retry: RetryPolicy::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn table(&self) -> &ProviderTable {
        &self.table
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn profile(&self, id: &str) -> Result<&ProviderProfile> {
        Ok(self.table.profile(id)?)
    }

    /// Call the provider named `profile_id` with the conversation so far.
    pub async fn call(
        &self,
        profile_id: &str,
        messages: &[Message],
        tools: &[ToolSchema],
        sampling: &SamplingParams,
    ) -> Result<ModelResponse> {
        let profile = self.profile(profile_id)?;
        self.call_profile(profile, messages, tools, sampling).await
    }

    /// Like [`call`](Self::call) with an explicit profile, which need not be
    /// in the table.
    pub async fn call_profile(
        &self,
        profile: &ProviderProfile,
        messages: &[Message],
        tools: &[ToolSchema],
        sampling: &SamplingParams,
    ) -> Result<ModelResponse> {
        let model = sampling.model.as_deref().unwrap_or(&profile.default_model);
        let span = provider_span!(profile.id, model);
        self.call_with_retries(profile, model, messages, tools, sampling)
            .instrument(span)
            .await
    }

    async fn call_with_retries(
        &self,
        profile: &ProviderProfile,
        model: &str,
        messages: &[Message],
        tools: &[ToolSchema],
        sampling: &SamplingParams,
    ) -> Result<ModelResponse> {
        let request = GenerateRequest {
            model,
            messages,
            tools,
            sampling,
        };

        let started = Instant::now();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let outcome =
                match tokio::time::timeout(self.call_timeout, self.provider.generate(profile, request))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(TransientProviderError::Timeout(self.call_timeout).into()),
                };

            let err = match outcome {
                Ok(response) => {
                    return Ok(self.finish(profile, model, response, started.elapsed()));
                }
                Err(ProviderError::Transient(err)) => err,
                Err(permanent) => {
                    record_error(&permanent);
                    return Err(permanent);
                }
            };

            if attempt >= self.retry.max_attempts {
                let exhausted: ProviderError = PermanentProviderError::RetriesExhausted {
                    attempts: attempt,
                    last: err,
                }
                .into();
                record_error(&exhausted);
                return Err(exhausted);
            }

            let delay = self.retry.delay_for(attempt, err.retry_after());
            warn!(
                provider = %profile.id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient provider failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn finish(
        &self,
        profile: &ProviderProfile,
        requested_model: &str,
        response: GenerateResponse,
        latency: Duration,
    ) -> ModelResponse {
        let model = if response.model.is_empty() {
            requested_model.to_string()
        } else {
            response.model
        };
        let cost_usd = price(profile, &model, requested_model, &response.usage);
        record_duration("duration_ms", latency);

        info!(
            provider = %profile.id,
            model = %model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            tool_calls = response.tool_calls.len(),
            cost_usd,
            latency_ms = latency.as_millis() as u64,
            "provider call completed"
        );

        ModelResponse {
            provider: profile.id.clone(),
            model,
            content: response.content,
            metadata: response.metadata,
            tool_calls: response.tool_calls,
            usage: response.usage,
            cost_usd,
            latency,
            finish_reason: response.finish_reason,
        }
    }
}

/// Vendors often echo a dated model id; fall back to the id that was asked for.
fn price(profile: &ProviderProfile, model: &str, requested: &str, usage: &TokenUsage) -> f64 {
    estimate_cost(&profile.prices, model, usage)
        .or_else(|| estimate_cost(&profile.prices, requested, usage))
        .unwrap_or_else(|| {
            warn!(
                provider = %profile.id,
                model,
                "no price for model; reporting zero cost"
            );
            0.0
        })
}
