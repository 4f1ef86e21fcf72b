//! The tool-calling orchestrator.
//!
//! Split into focused submodules:
//! - **agent_loop** — `run`, `run_stored` and the per-conversation state machine
//! - **llm** — provider isolation, context fitting and the model call
//! - **tools** — concurrent tool execution with timeouts and cancellation

mod agent_loop;
mod llm;
mod tools;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use conduit_core::{Conversation, ConversationStore, RunEvent, TokenUsage};
use conduit_llms::Normalizer;
use conduit_toolbus::ToolRegistry;

use crate::config::RuntimeConfig;
use crate::context::{Compressor, DefaultPrompts, PromptRenderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The model answered without requesting tools.
    Completed,
    /// The cancellation token fired; every open tool call was answered.
    Cancelled,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::Completed => "completed",
            TerminationReason::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub conversation: Conversation,
    /// Usage across every model call of the run, summarization included
    pub usage: TokenUsage,
    pub cost_usd: f64,
    pub termination: TerminationReason,
    /// Model calls made
    pub iterations: u32,
}

impl RunResult {
    pub fn final_answer(&self) -> Option<&str> {
        self.conversation.final_answer()
    }
}

/// Drives conversations through model calls and tool execution.
///
/// Cheap to share: the normalizer, registry and store are reference
/// counted, so one orchestrator can serve many conversations concurrently.
#[derive(Clone)]
pub struct Orchestrator {
    normalizer: Normalizer,
    registry: Arc<dyn ToolRegistry>,
    compressor: Compressor,
    config: RuntimeConfig,
    store: Option<Arc<dyn ConversationStore>>,
    event_tx: Option<mpsc::Sender<RunEvent>>,
}

impl Orchestrator {
    pub fn new(
        normalizer: Normalizer,
        registry: Arc<dyn ToolRegistry>,
        config: RuntimeConfig,
    ) -> Self {
        let compressor = Compressor::new(
            normalizer.clone(),
            Arc::new(DefaultPrompts),
            config.summary_sampling(),
        );
        Self {
            normalizer,
            registry,
            compressor,
            config,
            store: None,
            event_tx: None,
        }
    }

    /// Use custom summarization instructions.
    pub fn with_prompts(mut self, prompts: Arc<dyn PromptRenderer>) -> Self {
        self.compressor = Compressor::new(
            self.normalizer.clone(),
            prompts,
            self.config.summary_sampling(),
        );
        self
    }

    /// Store backing [`run_stored`](Self::run_stored).
    pub fn with_store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Progress events. The receiver must be drained or the run stalls once
    /// the channel is full.
    pub fn with_events(mut self, event_tx: mpsc::Sender<RunEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    async fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }
}
