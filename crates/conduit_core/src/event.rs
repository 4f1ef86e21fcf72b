use serde::{Deserialize, Serialize};

/// Progress notifications emitted by the orchestrator while a run is in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    IterationStart {
        iteration: u32,
    },

    ModelResponse {
        tool_calls: usize,
        input_tokens: u64,
        output_tokens: u64,
        cost_usd: f64,
    },

    ToolStart {
        call_id: String,
        name: String,
    },

    ToolDone {
        call_id: String,
        name: String,
        is_error: bool,
        duration_ms: u64,
    },

    Compressed {
        messages: usize,
        tokens_before: u64,
        tokens_after: u64,
    },

    Pruned {
        messages: usize,
        files: Vec<String>,
    },

    MetadataStripped {
        provider: String,
        removed: usize,
    },

    Finished {
        reason: String,
    },
}

impl RunEvent {
    pub fn iteration_start(iteration: u32) -> Self {
        RunEvent::IterationStart { iteration }
    }

    pub fn tool_start(call_id: impl Into<String>, name: impl Into<String>) -> Self {
        RunEvent::ToolStart {
            call_id: call_id.into(),
            name: name.into(),
        }
    }

    pub fn tool_done(
        call_id: impl Into<String>,
        name: impl Into<String>,
        is_error: bool,
        duration_ms: u64,
    ) -> Self {
        RunEvent::ToolDone {
            call_id: call_id.into(),
            name: name.into(),
            is_error,
            duration_ms,
        }
    }

    pub fn finished(reason: impl Into<String>) -> Self {
        RunEvent::Finished {
            reason: reason.into(),
        }
    }
}
