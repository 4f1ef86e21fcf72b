//! One model call: provider isolation, context fitting, then the normalizer.

use conduit_core::{RunEvent, ToolSchema};
use conduit_llms::{ModelResponse, ProviderError, SamplingParams};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::context::fit_to_window;

use super::agent_loop::RunState;
use super::Orchestrator;

pub(super) enum ModelStep {
    Response(ModelResponse),
    Cancelled,
    Failed(ProviderError),
}

impl Orchestrator {
    pub(super) async fn model_step(
        &self,
        state: &mut RunState<'_>,
        profile_id: &str,
        tools: &[ToolSchema],
        sampling: &SamplingParams,
        cancel: &CancellationToken,
    ) -> ModelStep {
        self.isolate_provider(state, profile_id).await;

        let fitted = fit_to_window(
            &mut state.conversation,
            &self.compressor,
            profile_id,
            self.config.token_threshold,
            self.config.keep_last_n,
            cancel,
        )
        .await;
        if let Some(report) = fitted {
            let compression = &report.compression;
            state.charge(&compression.usage, compression.cost_usd);
            if compression.compressed > 0 {
                self.emit(RunEvent::Compressed {
                    messages: compression.compressed,
                    tokens_before: compression.tokens_before,
                    tokens_after: compression.tokens_after,
                })
                .await;
            }
            if report.prune.pruned > 0 {
                self.emit(RunEvent::Pruned {
                    messages: report.prune.pruned,
                    files: report.prune.files.clone(),
                })
                .await;
            }
            if compression.cancelled {
                return ModelStep::Cancelled;
            }
        }

        let call = self
            .normalizer
            .call(profile_id, &state.conversation.messages, tools, sampling);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => ModelStep::Cancelled,
            result = call => match result {
                Ok(response) => ModelStep::Response(response),
                Err(e) => ModelStep::Failed(e),
            },
        }
    }

    /// Drop opaque metadata produced by any provider other than `profile_id`.
    async fn isolate_provider(&self, state: &mut RunState<'_>, profile_id: &str) {
        let previous = state.conversation.active_provider().map(str::to_string);
        let removed = state.conversation.strip_foreign_metadata(profile_id);
        if removed == 0 {
            return;
        }
        info!(
            from = previous.as_deref().unwrap_or("unknown"),
            to = profile_id,
            removed,
            "provider changed, foreign metadata stripped"
        );
        self.emit(RunEvent::MetadataStripped {
            provider: profile_id.to_string(),
            removed,
        })
        .await;
    }
}
