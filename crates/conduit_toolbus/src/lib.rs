pub mod tools;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

use conduit_core::ToolSchema;

pub use tools::{render_output, Tool, ToolResult};

#[derive(Error, Debug)]
pub enum ToolBusError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("tool '{tool}' failed: {source}")]
    Execution {
        tool: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Result of one tool invocation, as it will appear in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "content", rename_all = "snake_case")]
pub enum ToolOutcome {
    Ok(String),
    Err(String),
}

impl ToolOutcome {
    pub fn ok(content: impl Into<String>) -> Self {
        ToolOutcome::Ok(content.into())
    }

    pub fn err(content: impl Into<String>) -> Self {
        ToolOutcome::Err(content.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Err(_))
    }

    pub fn content(&self) -> &str {
        match self {
            ToolOutcome::Ok(content) | ToolOutcome::Err(content) => content,
        }
    }

    pub fn into_content(self) -> String {
        match self {
            ToolOutcome::Ok(content) | ToolOutcome::Err(content) => content,
        }
    }
}

/// Tool lookup and invocation as seen by the orchestrator.
///
/// Must tolerate concurrent `invoke` calls. Failures are reported in the
/// outcome, never as a panic or an `Err` that would abort a run.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    fn list(&self) -> Vec<ToolSchema>;

    async fn invoke(&self, name: &str, arguments: &str) -> ToolOutcome;
}

#[derive(Default)]
pub struct ToolBus {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing any tool with the same name.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn with_tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.register(tool);
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Runs a tool and returns its JSON result with the elapsed milliseconds.
    pub async fn call(
        &self,
        tool_name: &str,
        args: JsonValue,
    ) -> Result<(JsonValue, u64), ToolBusError> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| ToolBusError::NotFound(tool_name.to_string()))?;

        let start = Instant::now();
        let result = tool
            .execute(args)
            .await
            .map_err(|source| ToolBusError::Execution {
                tool: tool_name.to_string(),
                source,
            })?;
        let duration_ms = start.elapsed().as_millis() as u64;

        Ok((result, duration_ms))
    }

    /// Schemas of every registered tool, sorted by name.
    pub fn list_tools(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .values()
            .map(|t| ToolSchema::new(t.name(), t.description(), t.parameters_schema()))
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }
}

fn parse_arguments(tool: &str, arguments: &str) -> Result<JsonValue, ToolBusError> {
    if arguments.trim().is_empty() {
        return Ok(JsonValue::Object(Default::default()));
    }
    serde_json::from_str(arguments).map_err(|e| ToolBusError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl ToolRegistry for ToolBus {
    fn list(&self) -> Vec<ToolSchema> {
        self.list_tools()
    }

    async fn invoke(&self, name: &str, arguments: &str) -> ToolOutcome {
        let args = match parse_arguments(name, arguments) {
            Ok(args) => args,
            Err(err) => return ToolOutcome::err(err.to_string()),
        };
        match self.call(name, args).await {
            Ok((value, duration_ms)) => {
                debug!(tool = name, duration_ms, "tool succeeded");
                ToolOutcome::ok(render_output(&value))
            }
            Err(err) => {
                debug!(tool = name, error = %err, "tool failed");
                ToolOutcome::err(format!("{err:#}"))
            }
        }
    }
}
