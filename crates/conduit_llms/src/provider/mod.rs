//! Provider trait and the HTTP implementation

mod http;

pub use http::HttpProvider;

use async_trait::async_trait;

use crate::error::Result;
use crate::profile::ProviderProfile;
use crate::types::{GenerateRequest, GenerateResponse};

/// One exchange with a vendor, no retries.
///
/// The [`Normalizer`](crate::Normalizer) layers retry, timeouts and pricing on
/// top; implementations only encode, send and decode.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn generate(
        &self,
        profile: &ProviderProfile,
        request: GenerateRequest<'_>,
    ) -> Result<GenerateResponse>;
}
