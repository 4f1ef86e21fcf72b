//! Span macros and span-recording helpers

/// Span covering one orchestrator run of a conversation.
///
/// ```rust
/// use conduit_observability::conversation_span;
///
/// let span = conversation_span!("3f2a", "run");
/// let _guard = span.enter();
/// ```
#[macro_export]
macro_rules! conversation_span {
    ($conversation_id:expr, $operation:expr) => {
        tracing::info_span!(
            "conversation.run",
            conversation.id = %$conversation_id,
            operation = $operation,
            iterations = tracing::field::Empty,
            error = tracing::field::Empty,
            error.message = tracing::field::Empty,
        )
    };
}

/// Span covering one normalized provider call, retries included.
///
/// ```rust
/// use conduit_observability::provider_span;
///
/// let span = provider_span!("gemini", "gemini-2.5-pro");
/// let _guard = span.enter();
/// ```
#[macro_export]
macro_rules! provider_span {
    ($provider:expr, $model:expr) => {
        tracing::info_span!(
            "provider.call",
            provider.id = %$provider,
            provider.model = %$model,
            duration_ms = tracing::field::Empty,
            error = tracing::field::Empty,
            error.message = tracing::field::Empty,
        )
    };
}

/// Span covering one tool invocation.
#[macro_export]
macro_rules! tool_span {
    ($tool:expr, $call_id:expr) => {
        tracing::info_span!(
            "tool.call",
            tool.name = %$tool,
            tool.call_id = %$call_id,
            duration_ms = tracing::field::Empty,
            error = tracing::field::Empty,
            error.message = tracing::field::Empty,
        )
    };
}

/// Mark the current span as failed and log the error.
///
/// The span must have declared `error` and `error.message` fields, as the
/// macros in this crate do; otherwise only the log line is emitted.
pub fn record_error<E: std::error::Error + ?Sized>(error: &E) {
    let span = tracing::Span::current();
    span.record("error", true);
    span.record("error.message", error.to_string());
    tracing::error!(error = %error, "Operation failed");
}

/// Record a duration in milliseconds on the current span under `key`.
pub fn record_duration(key: &str, duration: std::time::Duration) {
    let span = tracing::Span::current();
    span.record(key, duration.as_millis() as u64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug)]
    struct Boom;

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn test_macros_build_spans_without_subscriber() {
        let span = crate::tool_span!("read", "call_1");
        let _guard = span.enter();
        record_duration("duration_ms", Duration::from_millis(12));
        record_error(&Boom);

        let _ = crate::conversation_span!("c1", "run");
        let _ = crate::provider_span!("openai", "gpt-4.1");
    }
}
