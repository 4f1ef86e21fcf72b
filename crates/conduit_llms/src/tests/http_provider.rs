use std::time::Duration;

use mockito::Matcher;

use conduit_core::{Message, ToolSchema};

use crate::error::{PermanentProviderError, ProviderError, TransientProviderError};
use crate::normalizer::Normalizer;
use crate::profile::{AuthConfig, ProviderTable};
use crate::retry::RetryPolicy;
use crate::types::SamplingParams;

const GEMINI_REPLY: &str = r#"{
  "model": "gemini-2.5-pro",
  "choices": [{
    "index": 0,
    "finish_reason": "tool_calls",
    "message": {
      "role": "assistant",
      "content": null,
      "tool_calls": [
        {"id": "call_1", "type": "function",
         "function": {"name": "read", "arguments": "{\"path\":\"src/main.rs\"}"},
         "extra_content": {"google":{"thought_signature":"Cq8BAdHtim\/9+eA=="}}},
        {"id": "call_2", "type": "function",
         "function": {"name": "read", "arguments": "{\"path\":\"Cargo.toml\"}"}}
      ]
    }
  }],
  "usage": {"prompt_tokens": 1000, "completion_tokens": 100}
}"#;

fn normalizer_for(server_url: &str, id: &str, path: &str) -> Normalizer {
    let builtin = ProviderTable::builtin().unwrap();
    let profile = builtin
        .get(id)
        .unwrap()
        .clone()
        .with_endpoint(format!("{server_url}{path}"))
        .with_auth(if id == "anthropic" {
            AuthConfig::api_key("x-api-key", "test-key")
        } else {
            AuthConfig::bearer("test-key")
        });
    let mut table = ProviderTable::new();
    table.insert(profile).unwrap();
    Normalizer::new(table).with_retry(
        RetryPolicy::new()
            .with_max_attempts(2)
            .with_base_delay(Duration::from_millis(1)),
    )
}

fn read_tool() -> Vec<ToolSchema> {
    vec![ToolSchema::new(
        "read",
        "Read a file",
        serde_json::json!({"type":"object","properties":{"path":{"type":"string"}}}),
    )]
}

#[tokio::test]
async fn test_signature_round_trips_byte_for_byte() {
    let mut server = mockito::Server::new_async().await;
    let first = server
        .mock("POST", "/v1beta/openai/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::Regex("compare".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(GEMINI_REPLY)
        .create_async()
        .await;

    let normalizer = normalizer_for(&server.url(), "gemini", "/v1beta/openai/chat/completions");
    let tools = read_tool();
    let sampling = SamplingParams::default();

    let mut messages = vec![Message::user("compare src/main.rs with Cargo.toml")];
    let response = normalizer
        .call("gemini", &messages, &tools, &sampling)
        .await
        .unwrap();
    first.assert_async().await;
    first.remove_async().await;

    assert_eq!(response.tool_calls.len(), 2);
    assert!(response.tool_calls[0].metadata.is_some());
    assert!(response.tool_calls[1].metadata.is_none());
    assert!((response.cost_usd - (1000.0 * 1.25 + 100.0 * 10.0) / 1_000_000.0).abs() < 1e-12);

    messages.push(response.to_message());
    messages.push(Message::tool_result("call_1", "read", "fn main() {}", false));
    messages.push(Message::tool_result("call_2", "read", "[package]", false));

    let signature = r#""extra_content":{"google":{"thought_signature":"Cq8BAdHtim\/9+eA=="}}"#;
    let second = server
        .mock("POST", "/v1beta/openai/chat/completions")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(regex::escape(signature)),
            Matcher::Regex("fn main".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"They match."},"finish_reason":"stop"}]}"#)
        .create_async()
        .await;

    let response = normalizer
        .call("gemini", &messages, &tools, &sampling)
        .await
        .unwrap();
    second.assert_async().await;
    assert_eq!(response.content, "They match.");
}

#[tokio::test]
async fn test_anthropic_headers_sent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .match_header("x-api-key", "test-key")
        .match_header("anthropic-version", "2023-06-01")
        .with_status(200)
        .with_body(
            r#"{"model":"claude-sonnet-4-5","content":[{"type":"text","text":"hi"}],"stop_reason":"end_turn","usage":{"input_tokens":3,"output_tokens":1}}"#,
        )
        .create_async()
        .await;

    let normalizer = normalizer_for(&server.url(), "anthropic", "/v1/messages");
    let response = normalizer
        .call(
            "anthropic",
            &[Message::user("hello")],
            &[],
            &SamplingParams::default(),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.content, "hi");
    assert_eq!(response.usage.input_tokens, 3);
}

#[tokio::test]
async fn test_rejected_metadata_is_permanent() {
    let mut server = mockito::Server::new_async().await;
    let body = r#"{"error":{"code":400,"message":"Function call is missing a thought_signature in functionCall parts."}}"#;
    let mock = server
        .mock("POST", "/v1beta/openai/chat/completions")
        .with_status(400)
        .with_body(body)
        .expect(1)
        .create_async()
        .await;

    let normalizer = normalizer_for(&server.url(), "gemini", "/v1beta/openai/chat/completions");
    let err = normalizer
        .call("gemini", &[Message::user("x")], &[], &SamplingParams::default())
        .await
        .unwrap_err();

    mock.assert_async().await;
    match err {
        ProviderError::Permanent(PermanentProviderError::RejectedMetadata { status, payload }) => {
            assert_eq!(status, 400);
            assert_eq!(payload, body);
        }
        other => panic!("expected rejected metadata, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_retried_until_exhausted() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_header("retry-after", "0")
        .with_body("slow down")
        .expect(2)
        .create_async()
        .await;

    let normalizer = normalizer_for(&server.url(), "deepseek", "/chat/completions");
    let err = normalizer
        .call("deepseek", &[Message::user("x")], &[], &SamplingParams::default())
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert_eq!(
        err,
        ProviderError::Permanent(PermanentProviderError::RetriesExhausted {
            attempts: 2,
            last: TransientProviderError::RateLimited {
                retry_after: Some(Duration::ZERO),
                payload: "slow down".into(),
            },
        })
    );
}

#[tokio::test]
async fn test_auth_failure_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body("bad key")
        .expect(1)
        .create_async()
        .await;

    let normalizer = normalizer_for(&server.url(), "deepseek", "/chat/completions");
    let err = normalizer
        .call("deepseek", &[Message::user("x")], &[], &SamplingParams::default())
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(matches!(
        err,
        ProviderError::Permanent(PermanentProviderError::Auth { status: 401, .. })
    ));
}

#[tokio::test]
async fn test_missing_credentials() {
    let builtin = ProviderTable::builtin().unwrap();
    let profile = builtin
        .get("openai")
        .unwrap()
        .clone()
        .with_auth(AuthConfig::bearer("$CONDUIT_TEST_NO_SUCH_KEY"));
    let normalizer = Normalizer::new(ProviderTable::new());

    let err = normalizer
        .call_profile(&profile, &[Message::user("x")], &[], &SamplingParams::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProviderError::Permanent(PermanentProviderError::MissingCredentials { .. })
    ));
}
