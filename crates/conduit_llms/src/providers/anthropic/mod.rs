//! Anthropic Messages API (`anthropic_messages` wire format).
//!
//! Thinking and redacted-thinking blocks are stored as one ordered raw array
//! and replayed as the leading content blocks of their assistant turn.

mod convert;
mod types;

pub use convert::{decode_response, encode_request, DEFAULT_MAX_TOKENS};
