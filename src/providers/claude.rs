// src/providers/claude.rs
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use super::{http_client, non_empty_message, read_body, truncate_body, GenerationOptions, DEFAULT_TIMEOUT};
use crate::error::ProviderError;
use crate::prompts::build_prompt;
use crate::types::*;

pub const CLAUDE_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-5@20250929";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

const NAME: &str = "claude";
const DEFAULT_MAX_TOKENS: u32 = 1024;

pub struct ClaudeProvider {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl ClaudeProvider {
    pub fn new(
        api_key: impl Into<String>,
        model: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        let timeout = timeout.filter(|t| !t.is_zero()).unwrap_or(DEFAULT_TIMEOUT);
        Ok(Self {
            http: http_client(NAME, timeout)?,
            api_key: api_key.into(),
            model: model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CLAUDE_MODEL.to_string()),
            base_url: CLAUDE_BASE_URL.to_string(),
            timeout,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::config(NAME, "API key is required"));
        }
        if !self.api_key.starts_with("sk-ant-") {
            warn!("Claude API key should typically start with 'sk-ant-'");
        }
        Ok(())
    }

    pub async fn generate_commit_message(
        &self,
        diff: &str,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        self.validate()?;

        let request = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: options.max_tokens().unwrap_or(DEFAULT_MAX_TOKENS),
            messages: vec![ClaudeMessage {
                role: "user".into(),
                content: build_prompt(diff, options),
            }],
            temperature: options.temperature(),
        };

        let url = format!("{}/messages", self.base_url);
        debug!("Claude request to {} with model {}", url, self.model);

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(NAME, e))?;

        let (status, body) = read_body(NAME, response).await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ClaudeError>(&body)
                .ok()
                .and_then(|e| e.error)
                .and_then(|d| match (d.kind, d.message) {
                    (Some(kind), Some(msg)) if !msg.is_empty() => Some(format!("{} - {}", kind, msg)),
                    (None, Some(msg)) if !msg.is_empty() => Some(msg),
                    _ => None,
                });
            let message = detail.unwrap_or_else(|| truncate_body(&body).to_string());
            return Err(ProviderError::protocol(
                NAME,
                status.as_u16(),
                format!("API error ({}): {}", status.as_u16(), message),
            ));
        }

        let resp: ClaudeResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::decode(NAME, e))?;

        if let Some(usage) = &resp.usage {
            debug!(
                "Tokens used - input: {}, output: {}",
                usage.input_tokens, usage.output_tokens
            );
        }

        let block = resp
            .content
            .iter()
            .find(|b| b.kind.as_deref().map_or(true, |k| k == "text"))
            .ok_or_else(|| ProviderError::empty(NAME, "no response from API"))?;

        non_empty_message(NAME, block.text.as_deref())
    }
}

// =============================================================================
// MODULE TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> ClaudeProvider {
        ClaudeProvider::new("sk-ant-test", None, None)
            .unwrap()
            .with_base_url(&server.uri())
    }

    #[test]
    fn validate_requires_key_only() {
        assert!(ClaudeProvider::new("", None, None).unwrap().validate().is_err());
        // Unusual prefixes only warn.
        assert!(ClaudeProvider::new("other-key", None, None).unwrap().validate().is_ok());
        assert!(ClaudeProvider::new("sk-ant-x", None, None).unwrap().validate().is_ok());
    }

    #[tokio::test]
    async fn sends_versioned_single_user_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({
                "model": DEFAULT_CLAUDE_MODEL,
                "max_tokens": 1024,
                "messages": [{"role": "user"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "  Fix token refresh  "}],
                "usage": {"input_tokens": 10, "output_tokens": 4}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let msg = provider(&server)
            .generate_commit_message("+x", &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(msg, "Fix token refresh");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert!(body.get("temperature").is_none());
    }

    #[tokio::test]
    async fn empty_content_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": []})))
            .mount(&server)
            .await;

        let err = provider(&server)
            .generate_commit_message("+x", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::EmptyResult);
    }

    #[tokio::test]
    async fn structured_error_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "type": "error",
                "error": {"type": "api_error", "message": "Internal server error"}
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .generate_commit_message("+x", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Internal server error"));
        assert!(err.to_string().starts_with("claude: API error (500)"));
    }
}
