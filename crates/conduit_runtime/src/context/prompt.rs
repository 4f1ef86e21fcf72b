//! Summarization instructions.

/// Which summarization instruction to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    /// Condense an assistant turn's reasoning.
    ReasoningSummary,
    /// Condense the output of a tool call.
    ToolResultSummary,
}

impl PromptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptKind::ReasoningSummary => "reasoning-summary",
            PromptKind::ToolResultSummary => "tool-result-summary",
        }
    }
}

/// Turns a prompt kind and the content to condense into the text sent to the
/// summarizing model.
pub trait PromptRenderer: Send + Sync {
    fn render(&self, kind: PromptKind, content: &str) -> String;
}

/// Built-in instructions.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPrompts;

impl PromptRenderer for DefaultPrompts {
    fn render(&self, kind: PromptKind, content: &str) -> String {
        match kind {
            PromptKind::ReasoningSummary => format!(
                r#"Summarize the following assistant turn from a coding session.

## Keep
- Decisions made and the reason for each
- File paths, function names and identifiers exactly as written
- Open questions and next steps

## Drop
- Restated context, hedging and pleasantries

Reply with the summary only.

---
{content}"#
            ),
            PromptKind::ToolResultSummary => format!(
                r#"Summarize the following tool output from a coding session.

## Keep
- File paths, line numbers, error messages and exit codes exactly as written
- Counts and names of matched items

## Drop
- Repeated lines and boilerplate output

Reply with the summary only.

---
{content}"#
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts_embed_content() {
        let prompts = DefaultPrompts;
        let reasoning = prompts.render(PromptKind::ReasoningSummary, "I will edit src/lib.rs");
        assert!(reasoning.contains("assistant turn"));
        assert!(reasoning.ends_with("I will edit src/lib.rs"));

        let tool = prompts.render(PromptKind::ToolResultSummary, "exit code 1");
        assert!(tool.contains("tool output"));
        assert!(tool.contains("exit code 1"));
    }

    #[test]
    fn test_prompt_kind_as_str() {
        assert_eq!(PromptKind::ReasoningSummary.as_str(), "reasoning-summary");
        assert_eq!(PromptKind::ToolResultSummary.as_str(), "tool-result-summary");
    }
}
