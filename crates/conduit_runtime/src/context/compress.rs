//! Summarizing compression of older assistant and tool messages.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use conduit_core::{Conversation, Message, Role, TokenUsage};
use conduit_llms::{ModelResponse, Normalizer, SamplingParams};

use super::prompt::{PromptKind, PromptRenderer};

static FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(?:```|~~~)").unwrap());

/// True if `text` opens a fenced code block.
pub fn has_fenced_code(text: &str) -> bool {
    FENCED_CODE.is_match(text)
}

/// What one compression pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompressionReport {
    pub compressed: usize,
    /// Eligible messages left alone because a summary call failed or did not
    /// shrink them.
    pub failed: usize,
    pub tokens_before: u64,
    pub tokens_after: u64,
    /// Summarizer usage, to be charged to the run.
    pub usage: TokenUsage,
    pub cost_usd: f64,
    /// The pass stopped early because the run was cancelled.
    pub cancelled: bool,
}

impl CompressionReport {
    pub fn is_noop(&self) -> bool {
        self.compressed == 0
    }
}

/// Rewrites older messages into short summaries using the normalizer.
#[derive(Clone)]
pub struct Compressor {
    normalizer: Normalizer,
    prompts: Arc<dyn PromptRenderer>,
    sampling: SamplingParams,
}

impl Compressor {
    pub fn new(
        normalizer: Normalizer,
        prompts: Arc<dyn PromptRenderer>,
        sampling: SamplingParams,
    ) -> Self {
        Self {
            normalizer,
            prompts,
            sampling,
        }
    }

    /// Compress `conversation` in place when it is over `token_threshold`.
    ///
    /// The last `keep_last_n` messages, user and system messages, messages
    /// already carrying a marker and messages with fenced code are never
    /// touched. A failed summary leaves its message unchanged. When `cancel`
    /// fires the pass stops at once; messages summarized so far keep their
    /// summaries.
    pub async fn compress(
        &self,
        conversation: &mut Conversation,
        profile_id: &str,
        token_threshold: u64,
        keep_last_n: usize,
        cancel: &CancellationToken,
    ) -> CompressionReport {
        let tokens_before = conversation.estimated_tokens();
        let mut report = CompressionReport {
            tokens_before,
            tokens_after: tokens_before,
            ..Default::default()
        };
        if tokens_before <= token_threshold {
            return report;
        }

        let prefix_len = conversation.len().saturating_sub(keep_last_n);
        for index in 0..prefix_len {
            let message = &conversation.messages[index];
            let Some(kind) = eligible(message) else {
                continue;
            };
            let original_len = message.content.len();

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.cancelled = true;
                    break;
                }
                response = self.summarize(profile_id, kind, &message.content) => response,
            };
            let Some(response) = response else {
                report.failed += 1;
                continue;
            };
            report.usage.add(&response.usage);
            report.cost_usd += response.cost_usd;

            match shorter_summary(kind, &response.content, original_len) {
                Some(summary) => {
                    if conversation.messages[index].mark_compressed(summary) {
                        report.compressed += 1;
                    }
                }
                None => report.failed += 1,
            }
        }

        report.tokens_after = conversation.estimated_tokens();
        if report.cancelled {
            warn!(
                conversation.id = %conversation.id,
                compressed = report.compressed,
                "compression interrupted by cancellation"
            );
        } else if !report.is_noop() {
            info!(
                conversation.id = %conversation.id,
                compressed = report.compressed,
                failed = report.failed,
                tokens_before = report.tokens_before,
                tokens_after = report.tokens_after,
                "conversation compressed"
            );
        }
        report
    }

    async fn summarize(
        &self,
        profile_id: &str,
        kind: PromptKind,
        content: &str,
    ) -> Option<ModelResponse> {
        let prompt = self.prompts.render(kind, content);
        match self
            .normalizer
            .call(profile_id, &[Message::user(prompt)], &[], &self.sampling)
            .await
        {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(kind = kind.as_str(), error = %e, "summarization failed, keeping original");
                None
            }
        }
    }
}

/// The trimmed summary, if it is non-empty and shorter than the original.
fn shorter_summary(kind: PromptKind, summary: &str, original_len: usize) -> Option<String> {
    let summary = summary.trim();
    if summary.is_empty() || summary.len() >= original_len {
        debug!(
            kind = kind.as_str(),
            original = original_len,
            summary = summary.len(),
            "summary not shorter than original, keeping original"
        );
        return None;
    }
    Some(summary.to_string())
}

fn eligible(message: &Message) -> Option<PromptKind> {
    if message.is_transformed() || message.content.is_empty() || has_fenced_code(&message.content)
    {
        return None;
    }
    match message.role {
        Role::Assistant => Some(PromptKind::ReasoningSummary),
        Role::Tool => Some(PromptKind::ToolResultSummary),
        Role::User | Role::System => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_fenced_code() {
        assert!(has_fenced_code("see:\n```rust\nfn main() {}\n```"));
        assert!(has_fenced_code("  ~~~\ncode\n~~~"));
        assert!(!has_fenced_code("inline `code` only"));
        assert!(!has_fenced_code("no code here"));
    }

    #[test]
    fn test_shorter_summary() {
        let kind = PromptKind::ToolResultSummary;
        assert_eq!(shorter_summary(kind, "  short \n", 20).as_deref(), Some("short"));
        assert_eq!(shorter_summary(kind, "same length", 11), None);
        assert_eq!(shorter_summary(kind, "   ", 20), None);
    }

    #[test]
    fn test_eligible() {
        assert_eq!(
            eligible(&Message::assistant("thinking")),
            Some(PromptKind::ReasoningSummary)
        );
        assert_eq!(
            eligible(&Message::tool_result("c", "grep", "hits", false)),
            Some(PromptKind::ToolResultSummary)
        );
        assert_eq!(eligible(&Message::user("question")), None);
        assert_eq!(eligible(&Message::system("rules")), None);
        assert_eq!(eligible(&Message::assistant("")), None);
        assert_eq!(eligible(&Message::assistant("```\nx\n```")), None);

        let mut marked = Message::assistant("long text");
        marked.mark_compressed("short");
        assert_eq!(eligible(&marked), None);
    }
}
