//! conduit_runtime — the tool-calling orchestrator.
//!
//! Drives a conversation through the provider normalizer and a tool
//! registry, keeping it inside a token budget by compressing older turns and
//! pruning tool output unrelated to the files the user asked about.
//!
//! ```text
//! AWAITING_MODEL ──► HAS_RESPONSE ──► tool calls? ──no──► DONE
//!       ▲                                 │yes
//!       │                                 ▼
//!  APPENDING_RESULTS ◄──────────── EXECUTING_TOOLS
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod runtime;

#[cfg(test)]
mod tests;

pub use config::RuntimeConfig;
pub use context::{
    CompressionReport, Compressor, DefaultPrompts, PromptKind, PromptRenderer, PruneReport,
};
pub use error::{Result, RunError};
pub use runtime::{Orchestrator, RunResult, TerminationReason};
