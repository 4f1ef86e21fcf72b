//! `conduit run`: one prompt against a stored conversation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use conduit_core::{ConversationId, RunEvent};
use conduit_llms::{Normalizer, ProviderTable};
use conduit_runtime::{Orchestrator, RunError, RunResult, RuntimeConfig, TerminationReason};
use conduit_toolbus::ToolBus;
use indicatif::ProgressBar;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{open_store, workspace_root};
use crate::output;

const DEFAULT_PROVIDER: &str = "deepseek";

pub struct RunArgs {
    pub prompt: String,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub conversation: Option<String>,
    pub workdir: Option<PathBuf>,
    pub max_iterations: Option<u32>,
    pub token_threshold: Option<u64>,
    pub max_tokens: Option<u32>,
}

impl RunArgs {
    /// Environment config with command line flags on top.
    fn runtime_config(&self) -> Result<RuntimeConfig> {
        Ok(self.apply_flags(RuntimeConfig::from_env()?))
    }

    fn apply_flags(&self, mut config: RuntimeConfig) -> RuntimeConfig {
        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }
        if let Some(max) = self.max_iterations {
            config = config.with_max_tool_iterations(max);
        }
        if let Some(threshold) = self.token_threshold {
            config = config.with_token_threshold(threshold);
        }
        if let Some(max_tokens) = self.max_tokens {
            config = config.with_max_tokens(max_tokens);
        }
        config
    }
}

pub async fn handle(args: RunArgs, table: ProviderTable) -> Result<()> {
    let provider = args
        .provider
        .clone()
        .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());
    let profile = table.profile(&provider)?;
    if !profile.has_credentials() {
        output::warning(&format!("no API key found for {provider}; the call will fail"));
    }

    let config = args.runtime_config()?;
    let root = workspace_root(args.workdir.clone())?;
    let store = Arc::new(open_store(&root)?);
    let conversation_id = args
        .conversation
        .as_deref()
        .map(ConversationId::from)
        .unwrap_or_default();

    let (event_tx, event_rx) = mpsc::channel(64);
    let orchestrator = Orchestrator::new(
        Normalizer::new(table),
        Arc::new(ToolBus::new()),
        config,
    )
    .with_store(store)
    .with_events(event_tx);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let spinner = output::spinner(&format!("Running on {provider}..."));
    let progress = tokio::spawn(show_progress(event_rx, spinner.clone()));

    let outcome = orchestrator
        .submit(&conversation_id, args.prompt, &provider, cancel)
        .await;
    // Dropping the orchestrator closes the event channel.
    drop(orchestrator);
    let _ = progress.await;
    spinner.finish_and_clear();

    match outcome {
        Ok(result) => {
            report(&result, &conversation_id);
            Ok(())
        }
        Err(err) => {
            if let Some(partial) = err.partial() {
                output::warning(&format!(
                    "run stopped with {} messages stored in {conversation_id}",
                    partial.len()
                ));
            }
            Err(describe_error(err)).context(format!("run on {provider}"))
        }
    }
}

async fn show_progress(mut events: mpsc::Receiver<RunEvent>, spinner: ProgressBar) {
    while let Some(event) = events.recv().await {
        if let Some(text) = describe_event(&event) {
            spinner.set_message(text);
        }
    }
}

/// One-line status for a run event.
fn describe_event(event: &RunEvent) -> Option<String> {
    let text = match event {
        RunEvent::IterationStart { iteration } => format!("waiting for model (step {iteration})"),
        RunEvent::ModelResponse { tool_calls: 0, .. } => return None,
        RunEvent::ModelResponse { tool_calls, .. } => format!("model requested {tool_calls} tool call(s)"),
        RunEvent::ToolStart { name, .. } => format!("running {name}"),
        RunEvent::ToolDone {
            name,
            is_error,
            duration_ms,
            ..
        } => {
            let status = if *is_error { "failed" } else { "done" };
            format!("{name} {status} in {duration_ms}ms")
        }
        RunEvent::Compressed {
            messages,
            tokens_before,
            tokens_after,
        } => format!("compressed {messages} message(s): {tokens_before} → {tokens_after} tokens"),
        RunEvent::Pruned { messages, files } => {
            format!("pruned {messages} tool output(s) unrelated to {}", files.join(", "))
        }
        RunEvent::MetadataStripped { provider, removed } => {
            format!("dropped {removed} metadata entr(ies) from other providers for {provider}")
        }
        RunEvent::Finished { .. } => return None,
    };
    Some(text)
}

fn describe_error(err: RunError) -> anyhow::Error {
    match err {
        RunError::IterationLimitExceeded { limit, .. } => anyhow::anyhow!(
            "stopped after {limit} tool rounds; raise --max-iterations to continue"
        ),
        other => other.into(),
    }
}

fn report(result: &RunResult, conversation_id: &ConversationId) {
    if result.termination == TerminationReason::Cancelled {
        output::warning("run cancelled; open tool calls were answered and stored");
    }
    if let Some(answer) = result.final_answer().filter(|a| !a.is_empty()) {
        output::body(answer);
    }
    output::dim("");
    output::kv("conversation", conversation_id.as_str());
    output::kv("model calls", &result.iterations.to_string());
    output::kv(
        "tokens",
        &format!(
            "{} in / {} out",
            result.usage.input_tokens, result.usage.output_tokens
        ),
    );
    output::kv("cost", &format!("${:.6}", result.cost_usd));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_event() {
        assert_eq!(
            describe_event(&RunEvent::tool_done("c1", "read", false, 12)).as_deref(),
            Some("read done in 12ms")
        );
        assert_eq!(
            describe_event(&RunEvent::iteration_start(2)).as_deref(),
            Some("waiting for model (step 2)")
        );
        assert!(describe_event(&RunEvent::finished("completed")).is_none());
    }

    #[test]
    fn test_flags_override_base_config() {
        let args = RunArgs {
            prompt: "hi".into(),
            provider: None,
            model: Some("deepseek-chat".into()),
            conversation: None,
            workdir: None,
            max_iterations: Some(3),
            token_threshold: Some(5000),
            max_tokens: None,
        };
        let base = RuntimeConfig::new().with_keep_last_n(7);
        let config = args.apply_flags(base);
        assert_eq!(config.model.as_deref(), Some("deepseek-chat"));
        assert_eq!(config.max_tool_iterations, 3);
        assert_eq!(config.token_threshold, 5000);
        // unset flags leave the base alone
        assert_eq!(config.keep_last_n, 7);
    }
}
