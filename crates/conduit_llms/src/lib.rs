//! conduit_llms — provider normalizer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Normalizer                       │
//! │   ProviderTable · RetryPolicy · timeout · pricing    │
//! │                       │                              │
//! │                       ▼                              │
//! │              Arc<dyn Provider> (HttpProvider)        │
//! │                       │                              │
//! │          ┌────────────┴────────────┐                 │
//! │          ▼                         ▼                 │
//! │   ┌─────────────┐          ┌───────────────┐         │
//! │   │ openai_chat │          │ anthropic_    │         │
//! │   │   codec     │          │ messages codec│         │
//! │   └─────────────┘          └───────────────┘         │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Vendor metadata (reasoning text, thought signatures, thinking blocks) is
//! captured through each profile's extraction table as raw JSON and replayed
//! byte for byte on later requests to the same provider only.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use conduit_llms::{Normalizer, ProviderTable, SamplingParams};
//! use conduit_core::Message;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let normalizer = Normalizer::new(ProviderTable::builtin()?);
//! let messages = vec![Message::user("hello")];
//! let reply = normalizer
//!     .call("deepseek", &messages, &[], &SamplingParams::default())
//!     .await?;
//! println!("{} (${:.4})", reply.content, reply.cost_usd);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod normalizer;
pub mod pricing;
pub mod profile;
pub mod provider;
pub mod providers;
pub mod retry;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::{PermanentProviderError, ProviderError, Result, TransientProviderError};
pub use normalizer::{Normalizer, DEFAULT_CALL_TIMEOUT};
pub use pricing::{ModelPrice, PriceTable};
pub use profile::{
    AuthConfig, MetadataField, MetadataScope, ProfileError, ProviderProfile, ProviderTable,
    WireFormat,
};
pub use provider::{HttpProvider, Provider};
pub use retry::RetryPolicy;
pub use types::{FinishReason, GenerateRequest, GenerateResponse, ModelResponse, SamplingParams};
