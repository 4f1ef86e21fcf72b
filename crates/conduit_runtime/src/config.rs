//! Runtime configuration for the orchestrator loop

use std::time::Duration;

use conduit_llms::SamplingParams;

use crate::error::RunError;

/// Immutable settings for one [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Model override; `None` uses the profile's default model
    pub model: Option<String>,
    /// Hard cap on model calls that may request tools
    pub max_tool_iterations: u32,
    /// Estimated conversation tokens above which compression and pruning run
    pub token_threshold: u64,
    /// Trailing messages the compressor never touches
    pub keep_last_n: usize,
    /// Bound on a single tool invocation
    pub tool_timeout: Duration,
    /// Max output tokens for the main model call
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Max output tokens for each summarization call
    pub summary_max_tokens: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tool_iterations: 25,
            token_threshold: 100_000,
            keep_last_n: 6,
            tool_timeout: Duration::from_secs(60),
            max_tokens: None,
            temperature: None,
            summary_max_tokens: 512,
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tool_iterations(mut self, max: u32) -> Self {
        self.max_tool_iterations = max;
        self
    }

    pub fn with_token_threshold(mut self, threshold: u64) -> Self {
        self.token_threshold = threshold;
        self
    }

    pub fn with_keep_last_n(mut self, keep: usize) -> Self {
        self.keep_last_n = keep;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_summary_max_tokens(mut self, max_tokens: u32) -> Self {
        self.summary_max_tokens = max_tokens;
        self
    }

    /// Sampling for the main model call.
    pub fn sampling(&self) -> SamplingParams {
        SamplingParams {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: None,
        }
    }

    /// Sampling for summarization: deterministic and short.
    pub fn summary_sampling(&self) -> SamplingParams {
        SamplingParams {
            model: self.model.clone(),
            temperature: Some(0.0),
            max_tokens: Some(self.summary_max_tokens),
            top_p: None,
        }
    }

    /// Load configuration from `CONDUIT_*` environment variables.
    ///
    /// Unset variables keep their defaults; set but unparsable ones are an error.
    pub fn from_env() -> Result<Self, RunError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, RunError> {
        let mut config = Self::default();

        if let Some(model) = lookup("CONDUIT_MODEL") {
            config.model = Some(model);
        }
        if let Some(val) = parse_var(&lookup, "CONDUIT_MAX_TOOL_ITERATIONS")? {
            config.max_tool_iterations = val;
        }
        if let Some(val) = parse_var(&lookup, "CONDUIT_TOKEN_THRESHOLD")? {
            config.token_threshold = val;
        }
        if let Some(val) = parse_var(&lookup, "CONDUIT_KEEP_LAST_N")? {
            config.keep_last_n = val;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "CONDUIT_TOOL_TIMEOUT_SECS")? {
            config.tool_timeout = Duration::from_secs(secs);
        }
        if let Some(val) = parse_var(&lookup, "CONDUIT_MAX_TOKENS")? {
            config.max_tokens = Some(val);
        }
        if let Some(val) = parse_var(&lookup, "CONDUIT_TEMPERATURE")? {
            config.temperature = Some(val);
        }
        if let Some(val) = parse_var(&lookup, "CONDUIT_SUMMARY_MAX_TOKENS")? {
            config.summary_max_tokens = val;
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, RunError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| RunError::Config(format!("{key}: cannot parse '{raw}'"))),
    }
}
