//! OpenAI-compatible chat completions (`openai_chat` wire format).
//!
//! Serves OpenAI, DeepSeek, Z.AI, Moonshot and Gemini's OpenAI endpoint.
//! Message-scoped metadata (e.g. `reasoning_content`) sits beside `content`;
//! tool-call-scoped metadata (e.g. `extra_content`) sits beside `function`.

mod convert;
mod types;

pub use convert::{decode_response, encode_request};
