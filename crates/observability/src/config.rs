//! Configuration for observability/telemetry

use serde::{Deserialize, Serialize};

use crate::error::ObservabilityError;

const DEFAULT_SERVICE_NAME: &str = "conduit";

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn default_console() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Service name reported on every exported span
    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default)]
    pub service_version: Option<String>,

    /// OTLP gRPC endpoint (e.g. "http://localhost:4317"); no export when unset
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// Human-readable log lines on stderr
    #[serde(default = "default_console")]
    pub enable_console: bool,

    /// `EnvFilter` directive; falls back to `RUST_LOG`, then "info"
    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub resource_attributes: Vec<(String, String)>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            service_version: None,
            otlp_endpoint: None,
            enable_console: true,
            log_level: None,
            resource_attributes: Vec::new(),
        }
    }
}

impl ObservabilityConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    pub fn with_otlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_console(mut self, enable: bool) -> Self {
        self.enable_console = enable;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    pub fn with_resource_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.resource_attributes.push((key.into(), value.into()));
        self
    }

    /// Build from environment variables
    ///
    /// Reads:
    /// - `OTEL_SERVICE_NAME` or `SERVICE_NAME` → service_name
    /// - `OTEL_SERVICE_VERSION` or `SERVICE_VERSION` → service_version
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT` → otlp_endpoint
    /// - `OTEL_LOG_LEVEL` or `RUST_LOG` → log_level
    pub fn from_env() -> Self {
        let service_name = std::env::var("OTEL_SERVICE_NAME")
            .or_else(|_| std::env::var("SERVICE_NAME"))
            .unwrap_or_else(|_| default_service_name());

        let service_version = std::env::var("OTEL_SERVICE_VERSION")
            .or_else(|_| std::env::var("SERVICE_VERSION"))
            .ok();

        // OTLP only when explicitly set, otherwise console-only.
        let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();

        let log_level = std::env::var("OTEL_LOG_LEVEL")
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok();

        Self {
            service_name,
            service_version,
            otlp_endpoint,
            enable_console: true,
            log_level,
            resource_attributes: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ObservabilityError> {
        if self.service_name.trim().is_empty() {
            return Err(ObservabilityError::Config(
                "service_name must not be empty".to_string(),
            ));
        }
        if let Some(endpoint) = &self.otlp_endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ObservabilityError::Config(format!(
                    "otlp_endpoint must be an http(s) URL, got '{endpoint}'"
                )));
            }
        }
        Ok(())
    }
}
