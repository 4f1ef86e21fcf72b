//! Tool call execution.

use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

use conduit_core::{Message, RunEvent, ToolCall};
use conduit_observability::{record_duration, tool_span};
use conduit_toolbus::ToolOutcome;

use super::Orchestrator;

const CANCELLED_RESULT: &str = "cancelled: the run was cancelled before this tool call finished";

/// Tool-role messages for one assistant turn, in declaration order.
pub(super) struct ToolRound {
    pub(super) results: Vec<Message>,
    pub(super) cancelled: bool,
}

struct Finished {
    index: usize,
    outcome: ToolOutcome,
    duration_ms: u64,
}

impl Orchestrator {
    /// Run every call of one turn concurrently.
    ///
    /// Results come back in declaration order whatever order the calls
    /// finish in. On cancellation, calls still running are dropped and
    /// answered with a synthetic error result.
    pub(super) async fn execute_tool_calls(
        &self,
        calls: &[ToolCall],
        cancel: &CancellationToken,
    ) -> ToolRound {
        info!(tool_count = calls.len(), "executing tool calls");

        let mut pending = FuturesUnordered::new();
        for (index, call) in calls.iter().enumerate() {
            self.emit(RunEvent::tool_start(call.id.clone(), call.name.clone()))
                .await;
            pending.push(self.invoke_tool(index, call));
        }

        let mut outcomes: Vec<Option<ToolOutcome>> = vec![None; calls.len()];
        let mut cancelled = false;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                next = pending.next() => match next {
                    Some(finished) => {
                        let call = &calls[finished.index];
                        self.emit(RunEvent::tool_done(
                            call.id.clone(),
                            call.name.clone(),
                            finished.outcome.is_error(),
                            finished.duration_ms,
                        ))
                        .await;
                        outcomes[finished.index] = Some(finished.outcome);
                    }
                    None => break,
                },
            }
        }
        drop(pending);

        if cancelled {
            let open = outcomes.iter().filter(|o| o.is_none()).count();
            warn!(open, "run cancelled during tool execution");
        }

        let results = calls
            .iter()
            .zip(outcomes)
            .map(|(call, outcome)| {
                let outcome = outcome.unwrap_or_else(|| ToolOutcome::err(CANCELLED_RESULT));
                Message::tool_result(
                    call.id.clone(),
                    call.name.clone(),
                    outcome.content(),
                    outcome.is_error(),
                )
            })
            .collect();

        ToolRound { results, cancelled }
    }

    async fn invoke_tool(&self, index: usize, call: &ToolCall) -> Finished {
        let span = tool_span!(call.name, call.id);
        async move {
            let start = Instant::now();
            let timeout = self.config.tool_timeout;
            let outcome = match tokio::time::timeout(
                timeout,
                self.registry.invoke(&call.name, &call.arguments),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => ToolOutcome::err(format!(
                    "tool '{}' timed out after {}ms",
                    call.name,
                    timeout.as_millis()
                )),
            };

            let duration = start.elapsed();
            record_duration("duration_ms", duration);
            if outcome.is_error() {
                warn!(error = %outcome.content(), "tool call failed");
            }

            Finished {
                index,
                outcome,
                duration_ms: duration.as_millis() as u64,
            }
        }
        .instrument(span)
        .await
    }
}
