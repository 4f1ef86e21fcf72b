use async_trait::async_trait;
use serde_json::Value as JsonValue;

pub type ToolResult = anyhow::Result<JsonValue>;

/// A capability the model can call.
///
/// Implementations live outside this crate; the bus only routes calls.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn parameters_schema(&self) -> JsonValue;
    async fn execute(&self, args: JsonValue) -> ToolResult;
}

/// Render a tool's JSON result as message content.
///
/// Strings are passed through as-is; anything else is compact JSON.
pub fn render_output(value: &JsonValue) -> String {
    match value {
        JsonValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_output() {
        assert_eq!(render_output(&json!("plain text")), "plain text");
        assert_eq!(render_output(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(render_output(&JsonValue::Null), "null");
    }
}
