//! Keeping a conversation inside its token budget.

use conduit_core::Conversation;
use tokio_util::sync::CancellationToken;

use super::compress::{CompressionReport, Compressor};
use super::prune::{prune, PruneReport};

/// True when the conversation's estimated size is over `threshold`.
pub fn exceeds_threshold(conversation: &Conversation, threshold: u64) -> bool {
    conversation.estimated_tokens() > threshold
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowReport {
    pub compression: CompressionReport,
    pub prune: PruneReport,
}

/// Compress, then prune against the latest user message.
///
/// Does nothing when the conversation is within `threshold`. Pruning is
/// skipped when compression was cancelled.
pub async fn fit_to_window(
    conversation: &mut Conversation,
    compressor: &Compressor,
    profile_id: &str,
    threshold: u64,
    keep_last_n: usize,
    cancel: &CancellationToken,
) -> Option<WindowReport> {
    if !exceeds_threshold(conversation, threshold) {
        return None;
    }

    let compression = compressor
        .compress(conversation, profile_id, threshold, keep_last_n, cancel)
        .await;
    if compression.cancelled {
        return Some(WindowReport {
            compression,
            prune: PruneReport::default(),
        });
    }
    let query = conversation.last_user_text().unwrap_or_default().to_string();
    let prune = prune(conversation, &query);

    Some(WindowReport { compression, prune })
}
