//! Tracing setup shared by every conduit crate.
//!
//! Installs a `tracing-subscriber` registry with an env filter, an optional
//! console layer and an optional OpenTelemetry OTLP exporter, and provides
//! span macros for the three places a run spends its time: the conversation
//! loop, provider calls and tool calls.
//!
//! # Quick Start
//!
//! ```no_run
//! use conduit_observability::{init, ObservabilityConfig};
//!
//! let config = ObservabilityConfig::new("conduit")
//!     .with_otlp_endpoint("http://localhost:4317")
//!     .with_log_level("info");
//! init(config)?;
//!
//! // or
//! conduit_observability::init_from_env()?;
//! # Ok::<(), conduit_observability::ObservabilityError>(())
//! ```
//!
//! # Environment Variables
//!
//! - `OTEL_SERVICE_NAME` or `SERVICE_NAME` - Service name
//! - `OTEL_SERVICE_VERSION` or `SERVICE_VERSION` - Service version
//! - `OTEL_EXPORTER_OTLP_ENDPOINT` - OTLP endpoint
//! - `OTEL_LOG_LEVEL` or `RUST_LOG` - Log level filter

pub mod config;
pub mod error;
pub mod telemetry;
pub mod tracing;

pub use config::ObservabilityConfig;
pub use error::ObservabilityError;
pub use telemetry::{init, init_from_env, shutdown};
pub use tracing::{record_duration, record_error};
