//! Provider error taxonomy.
//!
//! Every failure is either transient (worth retrying) or permanent (surfaced
//! immediately). Vendor payloads are attached verbatim where the vendor sent
//! one.

use std::time::Duration;

use thiserror::Error;

/// Failures that may succeed on a later attempt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransientProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited (retry after {retry_after:?}): {payload}")]
    RateLimited {
        retry_after: Option<Duration>,
        payload: String,
    },

    #[error("server error {status}: {payload}")]
    Server { status: u16, payload: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl TransientProviderError {
    /// Delay requested by the vendor, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TransientProviderError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Failures that retrying cannot fix.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PermanentProviderError {
    #[error("authentication failed ({status}): {payload}")]
    Auth { status: u16, payload: String },

    #[error("malformed request ({status}): {payload}")]
    MalformedRequest { status: u16, payload: String },

    #[error("vendor rejected opaque metadata ({status}): {payload}")]
    RejectedMetadata { status: u16, payload: String },

    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String, payload: String },

    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: TransientProviderError,
    },

    #[error("missing credentials for provider '{provider}': {detail}")]
    MissingCredentials { provider: String, detail: String },

    #[error("unknown provider '{0}'")]
    UnknownProvider(String),
}

impl PermanentProviderError {
    /// Raw vendor payload carried by this error, if any.
    pub fn payload(&self) -> Option<&str> {
        match self {
            PermanentProviderError::Auth { payload, .. }
            | PermanentProviderError::MalformedRequest { payload, .. }
            | PermanentProviderError::RejectedMetadata { payload, .. }
            | PermanentProviderError::MalformedResponse { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn malformed_response(reason: impl Into<String>, payload: impl Into<String>) -> Self {
        PermanentProviderError::MalformedResponse {
            reason: reason.into(),
            payload: payload.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("transient provider error: {0}")]
    Transient(#[from] TransientProviderError),

    #[error("permanent provider error: {0}")]
    Permanent(#[from] PermanentProviderError),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Map a non-success HTTP status and body onto the taxonomy.
///
/// `metadata_fields` are the wire names this vendor's metadata travels under;
/// a 4xx body naming one of them is treated as a metadata rejection.
pub fn classify_status(
    status: u16,
    payload: String,
    retry_after: Option<Duration>,
    metadata_fields: &[&str],
) -> ProviderError {
    match status {
        401 | 403 => PermanentProviderError::Auth { status, payload }.into(),
        429 => TransientProviderError::RateLimited {
            retry_after,
            payload,
        }
        .into(),
        408 | 500..=599 => TransientProviderError::Server { status, payload }.into(),
        _ => {
            let lower = payload.to_ascii_lowercase();
            let names_metadata = metadata_fields
                .iter()
                .any(|field| lower.contains(&field.to_ascii_lowercase()))
                || lower.contains("signature")
                || lower.contains("thinking");
            if names_metadata {
                PermanentProviderError::RejectedMetadata { status, payload }.into()
            } else {
                PermanentProviderError::MalformedRequest { status, payload }.into()
            }
        }
    }
}

/// Parse a `Retry-After` header given in seconds.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<f64>().ok().and_then(|secs| {
        if secs.is_finite() && secs >= 0.0 {
            Some(Duration::from_secs_f64(secs))
        } else {
            None
        }
    })
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransientProviderError::Timeout(Duration::ZERO).into()
        } else if err.is_builder() {
            PermanentProviderError::MalformedRequest {
                status: 0,
                payload: err.to_string(),
            }
            .into()
        } else if err.is_decode() {
            PermanentProviderError::malformed_response(err.to_string(), String::new()).into()
        } else {
            TransientProviderError::Network(err.to_string()).into()
        }
    }
}
