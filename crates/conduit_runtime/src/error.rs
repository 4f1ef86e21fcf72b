//! Runtime error types

use conduit_core::{Conversation, CoreError};
use conduit_llms::ProviderError;
use thiserror::Error;

/// Why a run stopped without completing.
///
/// Variants that abort mid-run carry the conversation as of the last
/// successful append. `IterationLimitExceeded` and `Provider` leave every
/// tool call answered; after `Persist` the conversation matches the stored
/// log, and calls it leaves open are answered when the next run starts.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("tool iteration limit of {limit} exceeded")]
    IterationLimitExceeded {
        limit: u32,
        partial: Box<Conversation>,
    },

    #[error("provider call failed: {source}")]
    Provider {
        #[source]
        source: ProviderError,
        partial: Box<Conversation>,
    },

    #[error("conversation store: {0}")]
    Store(#[from] CoreError),

    #[error("appending to the conversation store failed: {source}")]
    Persist {
        #[source]
        source: CoreError,
        partial: Box<Conversation>,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl RunError {
    /// The partially completed conversation, if the run got that far.
    pub fn partial(&self) -> Option<&Conversation> {
        match self {
            RunError::IterationLimitExceeded { partial, .. }
            | RunError::Provider { partial, .. }
            | RunError::Persist { partial, .. } => Some(partial),
            RunError::Store(_) | RunError::Config(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RunError>;
