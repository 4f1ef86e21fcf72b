//! Context management for the orchestrator.
//!
//! - **compress** — summarizing older assistant/tool messages
//! - **prune** — dropping tool output unrelated to the files in the query
//! - **prompt** — summarization instructions
//! - **window** — running both when the conversation is over budget

mod compress;
mod prompt;
mod prune;
mod window;

pub use compress::{has_fenced_code, CompressionReport, Compressor};
pub use prompt::{DefaultPrompts, PromptKind, PromptRenderer};
pub use prune::{extract_file_tokens, prune, PruneReport};
pub use window::{exceeds_threshold, fit_to_window, WindowReport};
