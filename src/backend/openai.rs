//! Backend for OpenAI-compatible chat-completion APIs.
//!
//! Endpoint: `/v1/chat/completions`, always chat mode, optionally
//! constrained to a single JSON object via `response_format`.
//!
//! Failure classification drives the retry policy in
//! [`GenerationClient`](crate::generation::GenerationClient):
//! 401/403 → [`StrategyError::AuthFailed`], 429 with a quota marker →
//! [`StrategyError::QuotaExceeded`], everything else →
//! [`StrategyError::Transient`].

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{AiBackend, ChatRequest, ChatResponse};
use crate::error::{Result, StrategyError};

/// Backend for any OpenAI-compatible API.
#[derive(Clone)]
pub struct OpenAiBackend {
    api_key: Option<String>,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field(
                "api_key",
                &self.api_key.as_ref().map(|k| {
                    if k.len() > 6 {
                        format!("{}***", &k[..6])
                    } else {
                        "***".to_string()
                    }
                }),
            )
            .finish()
    }
}

impl OpenAiBackend {
    /// Create a backend without authentication.
    pub fn new() -> Self {
        Self { api_key: None }
    }

    /// Set the API key, sent as `Authorization: Bearer {key}`.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Returns `true` if an API key has been configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build the request body for `/v1/chat/completions`.
    fn build_body(request: &ChatRequest) -> Value {
        let mut messages = Vec::new();
        if let Some(ref sys) = request.system {
            if !sys.is_empty() {
                messages.push(json!({"role": "system", "content": sys}));
            }
        }
        messages.push(json!({"role": "user", "content": request.prompt}));

        let mut body = json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": false,
        });

        if request.json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }

        body
    }

    /// Map a non-success provider status into the error taxonomy.
    fn classify_failure(status: u16, body: String) -> StrategyError {
        match status {
            401 | 403 => StrategyError::AuthFailed(body),
            429 if body.contains("insufficient_quota") || body.contains("quota") => {
                StrategyError::QuotaExceeded(body)
            }
            _ => StrategyError::Transient(format!("HTTP {}: {}", status, body)),
        }
    }
}

impl Default for OpenAiBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiBackend for OpenAiBackend {
    async fn complete(
        &self,
        client: &Client,
        base_url: &str,
        request: &ChatRequest,
    ) -> Result<ChatResponse> {
        let url = format!("{}/v1/chat/completions", base_url.trim_end_matches('/'));
        let body = Self::build_body(request);

        let mut req = client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Self::classify_failure(status, text));
        }

        let json_resp: Value = resp.json().await?;
        let text = json_resp
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        let mut meta = serde_json::Map::new();
        for field in ["usage", "model", "id"] {
            if let Some(v) = json_resp.get(field) {
                meta.insert(field.into(), v.clone());
            }
        }

        Ok(ChatResponse {
            text,
            status,
            metadata: if meta.is_empty() {
                None
            } else {
                Some(Value::Object(meta))
            },
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_request() -> ChatRequest {
        ChatRequest {
            model: "gpt-4o-mini".into(),
            system: Some("You are a marketing strategist.".into()),
            prompt: "Analyze this market.".into(),
            temperature: 0.6,
            max_tokens: 2048,
            json_mode: true,
        }
    }

    #[test]
    fn test_body_shape() {
        let body = OpenAiBackend::build_body(&test_request());
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["temperature"], 0.6);
        assert_eq!(body["stream"], false);

        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_body_without_system_or_json_mode() {
        let mut request = test_request();
        request.system = None;
        request.json_mode = false;

        let body = OpenAiBackend::build_body(&request);
        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_classify_auth() {
        let err = OpenAiBackend::classify_failure(401, "invalid api key".into());
        assert!(matches!(err, StrategyError::AuthFailed(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_classify_quota_429() {
        let err =
            OpenAiBackend::classify_failure(429, r#"{"error":{"code":"insufficient_quota"}}"#.into());
        assert!(matches!(err, StrategyError::QuotaExceeded(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_classify_plain_429_retryable() {
        let err = OpenAiBackend::classify_failure(429, "rate limit, slow down".into());
        assert!(matches!(err, StrategyError::Transient(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_5xx_retryable() {
        let err = OpenAiBackend::classify_failure(503, "overloaded".into());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let backend = OpenAiBackend::new().with_api_key("sk-1234567890abcdef");
        let debug_output = format!("{:?}", backend);
        assert!(!debug_output.contains("1234567890abcdef"));
        assert!(debug_output.contains("sk-123"));
    }
}
