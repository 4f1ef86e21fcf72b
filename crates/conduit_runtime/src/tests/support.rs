//! Scripted provider and mock tools shared by the runtime tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use conduit_core::{
    ConversationId, ConversationStore, CoreError, InMemoryStore, Message, TokenUsage, ToolCall,
};
use conduit_llms::providers::encode_request;
use conduit_llms::{
    FinishReason, GenerateRequest, GenerateResponse, Normalizer, Provider, ProviderError,
    ProviderProfile, ProviderTable, RetryPolicy, TransientProviderError,
};
use conduit_toolbus::{Tool, ToolBus, ToolRegistry, ToolResult};

pub(crate) const SUMMARY: &str = "condensed";

pub(crate) enum Step {
    Reply(GenerateResponse),
    Fail(ProviderError),
    Hang,
}

/// One request as the provider saw it.
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub messages: Vec<Message>,
    /// The request encoded in the profile's wire format
    pub body: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Mock provider replaying a fixed script for main calls and answering
/// summarization requests on its own.
#[derive(Default)]
pub(crate) struct ScriptedProvider {
    script: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<Recorded>>,
    summaries: Mutex<Vec<Recorded>>,
    fail_summaries: bool,
    hang_summaries: bool,
}

impl ScriptedProvider {
    pub(crate) fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            ..Default::default()
        })
    }

    pub(crate) fn failing_summaries(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            fail_summaries: true,
            ..Default::default()
        })
    }

    /// Summaries take ten seconds each.
    pub(crate) fn slow_summaries(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            hang_summaries: true,
            ..Default::default()
        })
    }

    pub(crate) fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn summaries(&self) -> Vec<Recorded> {
        self.summaries.lock().unwrap().clone()
    }
}

fn is_summary_request(request: &GenerateRequest<'_>) -> bool {
    request.tools.is_empty()
        && request.messages.len() == 1
        && request.messages[0].content.starts_with("Summarize")
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn generate(
        &self,
        profile: &ProviderProfile,
        request: GenerateRequest<'_>,
    ) -> conduit_llms::Result<GenerateResponse> {
        let body = String::from_utf8(encode_request(profile, &request).unwrap()).unwrap();
        let recorded = Recorded {
            messages: request.messages.to_vec(),
            body,
            temperature: request.sampling.temperature,
            max_tokens: request.sampling.max_tokens,
        };

        if is_summary_request(&request) {
            self.summaries.lock().unwrap().push(recorded);
            if self.hang_summaries {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            if self.fail_summaries {
                return Err(TransientProviderError::Server {
                    status: 503,
                    payload: "overloaded".into(),
                }
                .into());
            }
            return Ok(GenerateResponse {
                content: SUMMARY.into(),
                metadata: None,
                tool_calls: Vec::new(),
                usage: TokenUsage::new(10, 2),
                model: String::new(),
                finish_reason: FinishReason::Stop,
            });
        }

        self.calls.lock().unwrap().push(recorded);
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(response)) => Ok(response),
            Some(Step::Fail(err)) => Err(err),
            Some(Step::Hang) => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Err(TransientProviderError::Network("woke up".into()).into())
            }
            None => Err(TransientProviderError::Network("script exhausted".into()).into()),
        }
    }
}

pub(crate) fn text(content: &str) -> Step {
    Step::Reply(GenerateResponse {
        content: content.into(),
        metadata: None,
        tool_calls: Vec::new(),
        usage: TokenUsage::new(1000, 100),
        model: String::new(),
        finish_reason: FinishReason::Stop,
    })
}

pub(crate) fn calls(tool_calls: Vec<ToolCall>) -> Step {
    Step::Reply(GenerateResponse {
        content: String::new(),
        metadata: None,
        tool_calls,
        usage: TokenUsage::new(1000, 100),
        model: String::new(),
        finish_reason: FinishReason::ToolCalls,
    })
}

pub(crate) fn echo(id: &str, message: &str) -> ToolCall {
    ToolCall::new(id, "echo", json!({ "message": message }).to_string())
}

pub(crate) fn sleep(id: &str, ms: u64) -> ToolCall {
    ToolCall::new(id, "sleep", json!({ "ms": ms }).to_string())
}

pub(crate) fn normalizer(provider: Arc<ScriptedProvider>) -> Normalizer {
    Normalizer::with_provider(ProviderTable::builtin().unwrap(), provider).with_retry(
        RetryPolicy::new()
            .with_max_attempts(3)
            .with_base_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(5)),
    )
}

struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn description(&self) -> &'static str {
        "Echoes the message back"
    }

    fn parameters_schema(&self) -> JsonValue {
        json!({"type": "object", "properties": {"message": {"type": "string"}}})
    }

    async fn execute(&self, args: JsonValue) -> ToolResult {
        Ok(args.get("message").cloned().unwrap_or(JsonValue::Null))
    }
}

struct SleepTool;

#[async_trait]
impl Tool for SleepTool {
    fn name(&self) -> &'static str {
        "sleep"
    }

    fn description(&self) -> &'static str {
        "Sleeps for the given milliseconds"
    }

    fn parameters_schema(&self) -> JsonValue {
        json!({"type": "object", "properties": {"ms": {"type": "integer"}}})
    }

    async fn execute(&self, args: JsonValue) -> ToolResult {
        let ms = args.get("ms").and_then(JsonValue::as_u64).unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(JsonValue::String(format!("slept {ms}ms")))
    }
}

pub(crate) fn registry() -> Arc<dyn ToolRegistry> {
    Arc::new(ToolBus::new().with_tool(EchoTool).with_tool(SleepTool))
}

/// In-memory store whose n-th append (counting from 1) fails.
pub(crate) struct FlakyStore {
    inner: InMemoryStore,
    appends: AtomicUsize,
    fail_at: AtomicUsize,
}

impl FlakyStore {
    pub(crate) fn failing_at(append: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryStore::new(),
            appends: AtomicUsize::new(0),
            fail_at: AtomicUsize::new(append),
        })
    }

    /// Let every later append through.
    pub(crate) fn heal(&self) {
        self.fail_at.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConversationStore for FlakyStore {
    async fn append(
        &self,
        conversation_id: &ConversationId,
        message: &Message,
    ) -> conduit_core::Result<()> {
        let count = self.appends.fetch_add(1, Ordering::SeqCst) + 1;
        if count == self.fail_at.load(Ordering::SeqCst) {
            return Err(CoreError::Store("disk full".into()));
        }
        self.inner.append(conversation_id, message).await
    }

    async fn read(&self, conversation_id: &ConversationId) -> conduit_core::Result<Vec<Message>> {
        self.inner.read(conversation_id).await
    }
}
