//! Error types for observability crate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ObservabilityError {
    /// Failed to build the exporter or install the subscriber
    #[error("Failed to initialize observability: {0}")]
    InitFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
