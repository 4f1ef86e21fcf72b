//! Run entry points and the per-conversation state machine.

use std::sync::Arc;

use conduit_core::{
    Conversation, ConversationId, ConversationStore, Message, RunEvent, TokenUsage, ToolCall,
};
use conduit_llms::ModelResponse;
use conduit_observability::{conversation_span, record_error};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

use crate::error::{Result, RunError};

use super::llm::ModelStep;
use super::tools::ToolRound;
use super::{Orchestrator, RunResult, TerminationReason};

const INTERRUPTED_RESULT: &str = "not executed: the run stopped before this tool call was answered";

enum LoopState {
    AwaitingModel,
    HasResponse(ModelResponse),
    ExecutingTools(Vec<ToolCall>),
    AppendingResults(ToolRound),
    Done(TerminationReason),
}

/// Mutable state owned by one run.
pub(super) struct RunState<'a> {
    pub(super) conversation: Conversation,
    pub(super) usage: TokenUsage,
    pub(super) cost_usd: f64,
    pub(super) iterations: u32,
    tool_rounds: u32,
    sink: Option<&'a dyn ConversationStore>,
}

impl<'a> RunState<'a> {
    fn new(conversation: Conversation, sink: Option<&'a dyn ConversationStore>) -> Self {
        Self {
            conversation,
            usage: TokenUsage::default(),
            cost_usd: 0.0,
            iterations: 0,
            tool_rounds: 0,
            sink,
        }
    }

    pub(super) fn charge(&mut self, usage: &TokenUsage, cost_usd: f64) {
        self.usage.add(usage);
        self.cost_usd += cost_usd;
    }

    /// Append to the conversation and, for stored runs, to the log.
    ///
    /// A failed store append is taken back out of the conversation, so the
    /// error carries exactly what the log holds.
    async fn append(&mut self, message: Message) -> Result<()> {
        let id = self.conversation.id.clone();
        let appended = self.conversation.push(message);
        let Some(store) = self.sink else {
            return Ok(());
        };
        if let Err(source) = store.append(&id, appended).await {
            self.conversation.messages.pop();
            record_error(&source);
            return Err(RunError::Persist {
                source,
                partial: Box::new(self.conversation.clone()),
            });
        }
        Ok(())
    }

    /// Answer tool calls an earlier, interrupted run left without a result.
    async fn answer_open_calls(&mut self) -> Result<()> {
        let open: Vec<ToolCall> = self
            .conversation
            .pending_tool_calls()
            .into_iter()
            .cloned()
            .collect();
        if open.is_empty() {
            return Ok(());
        }
        warn!(open = open.len(), "answering tool calls left open by an earlier run");
        for call in open {
            self.append(Message::tool_result(call.id, call.name, INTERRUPTED_RESULT, true))
                .await?;
        }
        Ok(())
    }
}

impl Orchestrator {
    /// Run `conversation` against provider `profile_id` until the model stops
    /// requesting tools, the iteration cap is hit or `cancel` fires.
    pub async fn run(
        &self,
        conversation: Conversation,
        profile_id: &str,
        cancel: CancellationToken,
    ) -> Result<RunResult> {
        let span = conversation_span!(conversation.id, "run");
        self.drive(RunState::new(conversation, None), profile_id, cancel)
            .instrument(span)
            .await
    }

    /// Like [`run`](Self::run) for a conversation held in the configured
    /// store. Every message created by the run is appended to the store with
    /// its original content.
    pub async fn run_stored(
        &self,
        conversation_id: &ConversationId,
        profile_id: &str,
        cancel: CancellationToken,
    ) -> Result<RunResult> {
        let store = self.require_store()?;
        let messages = store.read(conversation_id).await?;
        if messages.is_empty() {
            return Err(RunError::Config(format!(
                "conversation {conversation_id} has no messages"
            )));
        }
        let conversation = Conversation::from_messages(conversation_id.clone(), messages);

        let span = conversation_span!(conversation_id, "run_stored");
        self.drive(
            RunState::new(conversation, Some(&**store)),
            profile_id,
            cancel,
        )
        .instrument(span)
        .await
    }

    /// Append a user message to a stored conversation, then run it as
    /// [`run_stored`](Self::run_stored) does.
    pub async fn submit(
        &self,
        conversation_id: &ConversationId,
        prompt: impl Into<String>,
        profile_id: &str,
        cancel: CancellationToken,
    ) -> Result<RunResult> {
        let store = self.require_store()?;
        let conversation =
            Conversation::from_messages(conversation_id.clone(), store.read(conversation_id).await?);
        let mut state = RunState::new(conversation, Some(&**store));
        // open calls must be answered before the new prompt lands after them
        state.answer_open_calls().await?;
        state.append(Message::user(prompt)).await?;

        let span = conversation_span!(conversation_id, "submit");
        self.drive(state, profile_id, cancel).instrument(span).await
    }

    fn require_store(&self) -> Result<&Arc<dyn ConversationStore>> {
        self.store
            .as_ref()
            .ok_or_else(|| RunError::Config("no conversation store configured".to_string()))
    }

    async fn drive(
        &self,
        mut state: RunState<'_>,
        profile_id: &str,
        cancel: CancellationToken,
    ) -> Result<RunResult> {
        state.answer_open_calls().await?;

        let tools = self.registry.list();
        let sampling = self.config.sampling();
        let limit = self.config.max_tool_iterations;
        info!(
            profile = profile_id,
            messages = state.conversation.len(),
            tools = tools.len(),
            "starting run"
        );

        let mut step = LoopState::AwaitingModel;
        let termination = loop {
            step = match step {
                LoopState::AwaitingModel => {
                    if cancel.is_cancelled() {
                        LoopState::Done(TerminationReason::Cancelled)
                    } else {
                        state.iterations += 1;
                        self.emit(RunEvent::iteration_start(state.iterations)).await;
                        match self
                            .model_step(&mut state, profile_id, &tools, &sampling, &cancel)
                            .await
                        {
                            ModelStep::Response(response) => LoopState::HasResponse(response),
                            ModelStep::Cancelled => LoopState::Done(TerminationReason::Cancelled),
                            ModelStep::Failed(source) => {
                                record_error(&source);
                                self.emit(RunEvent::finished("provider_error")).await;
                                return Err(RunError::Provider {
                                    source,
                                    partial: Box::new(state.conversation),
                                });
                            }
                        }
                    }
                }
                LoopState::HasResponse(response) => {
                    state.charge(&response.usage, response.cost_usd);
                    self.emit(RunEvent::ModelResponse {
                        tool_calls: response.tool_calls.len(),
                        input_tokens: response.usage.input_tokens,
                        output_tokens: response.usage.output_tokens,
                        cost_usd: response.cost_usd,
                    })
                    .await;

                    let calls = response.tool_calls.clone();
                    state.append(response.to_message()).await?;

                    if calls.is_empty() {
                        LoopState::Done(TerminationReason::Completed)
                    } else if state.tool_rounds >= limit {
                        for call in &calls {
                            state
                                .append(Message::tool_result(
                                    call.id.clone(),
                                    call.name.clone(),
                                    format!("not executed: tool iteration limit of {limit} reached"),
                                    true,
                                ))
                                .await?;
                        }
                        let err = RunError::IterationLimitExceeded {
                            limit,
                            partial: Box::new(state.conversation),
                        };
                        record_error(&err);
                        self.emit(RunEvent::finished("iteration_limit")).await;
                        return Err(err);
                    } else {
                        LoopState::ExecutingTools(calls)
                    }
                }
                LoopState::ExecutingTools(calls) => {
                    state.tool_rounds += 1;
                    LoopState::AppendingResults(self.execute_tool_calls(&calls, &cancel).await)
                }
                LoopState::AppendingResults(round) => {
                    for message in round.results {
                        state.append(message).await?;
                    }
                    if round.cancelled {
                        LoopState::Done(TerminationReason::Cancelled)
                    } else {
                        LoopState::AwaitingModel
                    }
                }
                LoopState::Done(reason) => break reason,
            };
        };

        tracing::Span::current().record("iterations", state.iterations);
        info!(
            termination = termination.as_str(),
            iterations = state.iterations,
            input_tokens = state.usage.input_tokens,
            output_tokens = state.usage.output_tokens,
            cost_usd = state.cost_usd,
            "run finished"
        );
        self.emit(RunEvent::finished(termination.as_str())).await;

        Ok(RunResult {
            conversation: state.conversation,
            usage: state.usage,
            cost_usd: state.cost_usd,
            termination,
            iterations: state.iterations,
        })
    }
}
