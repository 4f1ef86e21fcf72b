use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use crate::{Tool, ToolBus, ToolBusError, ToolOutcome, ToolRegistry, ToolResult};

struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn description(&self) -> &'static str {
        "Echoes the message back"
    }

    fn parameters_schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "properties": {"message": {"type": "string"}},
            "required": ["message"]
        })
    }

    async fn execute(&self, args: JsonValue) -> ToolResult {
        match args.get("message").and_then(|m| m.as_str()) {
            Some(message) => Ok(JsonValue::String(message.to_string())),
            None => Ok(json!({"echoed": args})),
        }
    }
}

struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &'static str {
        "explode"
    }

    fn description(&self) -> &'static str {
        "Always fails"
    }

    fn parameters_schema(&self) -> JsonValue {
        json!({"type": "object"})
    }

    async fn execute(&self, _args: JsonValue) -> ToolResult {
        anyhow::bail!("disk on fire")
    }
}

/// Counts calls and sleeps so overlapping invocations are observable.
struct SlowTool {
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn description(&self) -> &'static str {
        "Sleeps briefly"
    }

    fn parameters_schema(&self) -> JsonValue {
        json!({"type": "object"})
    }

    async fn execute(&self, _args: JsonValue) -> ToolResult {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(json!({"slept_ms": 30}))
    }
}

#[test]
fn test_tool_bus_new_is_empty() {
    let bus = ToolBus::new();
    assert!(bus.is_empty());
    assert!(bus.list_tools().is_empty());
}

#[test]
fn test_list_tools_sorted_by_name() {
    let bus = ToolBus::new().with_tool(FailingTool).with_tool(EchoTool);
    let names: Vec<_> = bus.list().into_iter().map(|t| t.name).collect();
    assert_eq!(names, ["echo", "explode"]);

    let echo = &bus.list_tools()[0];
    assert_eq!(echo.description, "Echoes the message back");
    assert!(echo.parameters.is_object());
}

#[test]
fn test_register_replaces_same_name() {
    let mut bus = ToolBus::new();
    bus.register(EchoTool);
    bus.register(EchoTool);
    assert_eq!(bus.len(), 1);
}

#[tokio::test]
async fn test_call_existing_tool() {
    let bus = ToolBus::new().with_tool(EchoTool);
    let (result, _duration_ms) = bus.call("echo", json!({"message": "hi"})).await.unwrap();
    assert_eq!(result, json!("hi"));
}

#[tokio::test]
async fn test_call_nonexistent_tool() {
    let bus = ToolBus::new();
    let err = bus.call("nonexistent_tool", json!({})).await.unwrap_err();

    assert!(matches!(err, ToolBusError::NotFound(_)));
    let message = err.to_string();
    assert!(message.contains("Tool not found"));
    assert!(message.contains("nonexistent_tool"));
}

#[tokio::test]
async fn test_invoke_string_result_passes_through() {
    let bus = ToolBus::new().with_tool(EchoTool);
    let outcome = bus.invoke("echo", r#"{"message":"hello world"}"#).await;
    assert_eq!(outcome, ToolOutcome::ok("hello world"));
}

#[tokio::test]
async fn test_invoke_structured_result_is_serialized() {
    let bus = ToolBus::new().with_tool(EchoTool);
    let outcome = bus.invoke("echo", "").await;
    assert_eq!(outcome, ToolOutcome::ok(r#"{"echoed":{}}"#));
}

#[tokio::test]
async fn test_invoke_failure_becomes_error_outcome() {
    let bus = ToolBus::new().with_tool(FailingTool);
    let outcome = bus.invoke("explode", "{}").await;
    assert!(outcome.is_error());
    assert!(outcome.content().contains("disk on fire"));
}

#[tokio::test]
async fn test_invoke_unknown_tool() {
    let bus = ToolBus::new();
    let outcome = bus.invoke("missing", "{}").await;
    assert!(outcome.is_error());
    assert!(outcome.content().contains("missing"));
}

#[tokio::test]
async fn test_invoke_invalid_arguments() {
    let bus = ToolBus::new().with_tool(EchoTool);
    let outcome = bus.invoke("echo", "{not json").await;
    assert!(outcome.is_error());
    assert!(outcome.content().starts_with("invalid arguments for 'echo'"));
}

#[tokio::test]
async fn test_invoke_is_concurrent() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let bus = ToolBus::new().with_tool(SlowTool {
        in_flight: in_flight.clone(),
        peak: peak.clone(),
    });

    let (a, b) = tokio::join!(bus.invoke("slow", "{}"), bus.invoke("slow", "{}"));
    assert!(!a.is_error());
    assert!(!b.is_error());
    assert_eq!(peak.load(Ordering::SeqCst), 2);
    assert_eq!(in_flight.load(Ordering::SeqCst), 0);
}

#[test]
fn test_outcome_serde_shape() {
    let json = serde_json::to_value(ToolOutcome::err("boom")).unwrap();
    assert_eq!(json, json!({"status": "err", "content": "boom"}));
    assert_eq!(ToolOutcome::ok("x").into_content(), "x");
}
