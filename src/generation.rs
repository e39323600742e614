//! Single-call generation with retry.
//!
//! [`GenerationClient`] wraps one AI call: build the normalized request,
//! call the backend, extract structured output, retry on retryable failure.
//! Backoff is linear: the wait before attempt N is `base_delay * (N - 1)`.
//!
//! Credential and quota failures abort on first occurrence. Everything else
//! (transport, provider throttling, malformed output) is retried until
//! attempts are exhausted, after which the last error is surfaced.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use crate::backend::{AiBackend, ChatRequest};
use crate::error::{Result, StrategyError};
use crate::parsing;

/// Retry policy for a single generation call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Default: 3.
    pub max_attempts: u32,
    /// Base delay unit; the wait before attempt N+1 is `base_delay * N`.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before the given attempt (1-indexed). The first attempt never
    /// waits; attempt 2 waits `base_delay`, attempt 3 waits `2 * base_delay`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay * attempt.saturating_sub(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// One generation request: instructions, temperature, and expected shape.
#[derive(Debug, Clone)]
pub struct PromptSpec {
    /// Short name for logging (e.g. `"market-analysis"`).
    pub name: &'static str,
    /// System instruction.
    pub system: String,
    /// User instruction.
    pub user: String,
    /// Sampling temperature for this call.
    pub temperature: f64,
    /// Expect a bare array. When the model wraps it in an object, the first
    /// array-valued field is unwrapped; if none exists, the call fails with
    /// a parse error.
    pub expect_array: bool,
}

/// Executes one structured AI call with retry.
pub struct GenerationClient {
    backend: Arc<dyn AiBackend>,
    client: Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    retry: RetryPolicy,
    cancellation: Option<Arc<AtomicBool>>,
}

impl GenerationClient {
    pub fn new(
        backend: Arc<dyn AiBackend>,
        client: Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            client,
            base_url: base_url.into(),
            model: model.into(),
            max_tokens: 4096,
            retry: RetryPolicy::default(),
            cancellation: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_cancellation(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancellation = Some(cancel);
        self
    }

    fn check_cancelled(&self) -> Result<()> {
        if let Some(ref flag) = self.cancellation {
            if flag.load(Ordering::Relaxed) {
                return Err(StrategyError::Cancelled);
            }
        }
        Ok(())
    }

    /// Run one generation call, returning structured output.
    ///
    /// A syntactically valid but schema-empty response is success — schema
    /// validation belongs to the caller.
    pub async fn generate(&self, spec: &PromptSpec) -> Result<Value> {
        let request = ChatRequest {
            model: self.model.clone(),
            system: Some(spec.system.clone()),
            prompt: spec.user.clone(),
            temperature: spec.temperature,
            max_tokens: self.max_tokens,
            json_mode: true,
        };

        let mut last_error: Option<StrategyError> = None;

        for attempt in 1..=self.retry.max_attempts {
            self.check_cancelled()?;

            if attempt > 1 {
                let delay = self.retry.delay_before(attempt);
                warn!(
                    call = spec.name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    reason = %last_error.as_ref().map(ToString::to_string).unwrap_or_default(),
                    "retrying generation call"
                );
                tokio::time::sleep(delay).await;
                self.check_cancelled()?;
            }

            match self.attempt(&request, spec).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| StrategyError::Transient("retry loop exited unexpectedly".into())))
    }

    async fn attempt(&self, request: &ChatRequest, spec: &PromptSpec) -> Result<Value> {
        let response = self
            .backend
            .complete(&self.client, &self.base_url, request)
            .await?;

        let value = parsing::extract_value(&response.text)?;

        if spec.expect_array {
            return parsing::first_array_field(&value).ok_or_else(|| {
                StrategyError::Parse(format!(
                    "call '{}' expected an array but the response has no array-valued field",
                    spec.name
                ))
            });
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use serde_json::json;

    fn spec() -> PromptSpec {
        PromptSpec {
            name: "test-call",
            system: "You are a test.".into(),
            user: "Return JSON.".into(),
            temperature: 0.5,
            expect_array: false,
        }
    }

    fn client(backend: Arc<MockBackend>) -> GenerationClient {
        GenerationClient::new(backend, Client::new(), "http://unused", "test-model")
            .with_retry(RetryPolicy::new(3, Duration::from_millis(100)))
    }

    #[test]
    fn test_linear_delays() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_millis(500));
        assert_eq!(policy.delay_before(3), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let backend = Arc::new(MockBackend::fixed(r#"{"a": 1}"#));
        let value = client(backend.clone()).generate(&spec()).await.unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_errors_exhaust_three_attempts() {
        let backend = Arc::new(MockBackend::scripted(vec![
            Err(StrategyError::Transient("one".into())),
            Err(StrategyError::Transient("two".into())),
            Err(StrategyError::Transient("three".into())),
        ]));
        let err = client(backend.clone()).generate(&spec()).await.unwrap_err();
        assert_eq!(backend.calls(), 3);
        // Last error is surfaced
        match err {
            StrategyError::Transient(msg) => assert_eq!(msg, "three"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_non_retryable_aborts_immediately() {
        let backend = Arc::new(MockBackend::scripted(vec![
            Err(StrategyError::QuotaExceeded("insufficient_quota".into())),
            Ok(r#"{"never": "reached"}"#.into()),
        ]));
        let err = client(backend.clone()).generate(&spec()).await.unwrap_err();
        assert_eq!(backend.calls(), 1);
        assert!(matches!(err, StrategyError::QuotaExceeded(_)));
    }

    #[tokio::test]
    async fn test_auth_failure_preserved() {
        let backend = Arc::new(MockBackend::scripted(vec![Err(StrategyError::AuthFailed(
            "bad key".into(),
        ))]));
        let err = client(backend.clone()).generate(&spec()).await.unwrap_err();
        assert_eq!(backend.calls(), 1);
        match err {
            StrategyError::AuthFailed(msg) => assert_eq!(msg, "bad key"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_then_valid_retried() {
        let backend = Arc::new(MockBackend::scripted(vec![
            Ok("not json at all".into()),
            Ok(r#"{"fixed": true}"#.into()),
        ]));
        let value = client(backend.clone()).generate(&spec()).await.unwrap();
        assert_eq!(value["fixed"], true);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_expect_array_unwraps_first_array_field() {
        let backend = Arc::new(MockBackend::fixed(r#"{"count": 2, "items": [1, 2]}"#));
        let mut s = spec();
        s.expect_array = true;
        let value = client(backend).generate(&s).await.unwrap();
        assert_eq!(value, json!([1, 2]));
    }

    #[tokio::test]
    async fn test_expect_array_bare_array_passthrough() {
        let backend = Arc::new(MockBackend::fixed("[1, 2, 3]"));
        let mut s = spec();
        s.expect_array = true;
        let value = client(backend).generate(&s).await.unwrap();
        assert_eq!(value, json!([1, 2, 3]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expect_array_without_array_is_parse_error() {
        let backend = Arc::new(MockBackend::fixed(r#"{"no": "arrays"}"#));
        let mut s = spec();
        s.expect_array = true;
        let err = client(backend.clone()).generate(&s).await.unwrap_err();
        assert!(matches!(err, StrategyError::Parse(_)));
        // Parse errors are retryable, so all attempts were spent
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_schema_empty_object_is_success() {
        let backend = Arc::new(MockBackend::fixed("{}"));
        let value = client(backend).generate(&spec()).await.unwrap();
        assert_eq!(value, json!({}));
    }

    #[tokio::test]
    async fn test_cancellation_checked_before_work() {
        let cancel = Arc::new(AtomicBool::new(true));
        let backend = Arc::new(MockBackend::fixed("{}"));
        let gen = client(backend.clone()).with_cancellation(cancel);
        let err = gen.generate(&spec()).await.unwrap_err();
        assert!(matches!(err, StrategyError::Cancelled));
        assert_eq!(backend.calls(), 0);
    }
}
