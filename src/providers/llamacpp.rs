// src/providers/llamacpp.rs
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::{http_client, non_empty_message, read_body, truncate_body, GenerationOptions};
use crate::error::{is_connection_refused, ErrorKind, ProviderError};
use crate::prompts::{build_prompt, COMMIT_SYSTEM_PROMPT};
use crate::types::*;

pub const DEFAULT_LLAMACPP_URL: &str = "http://localhost:8080/v1";
pub const DEFAULT_LLAMACPP_MODEL: &str = "default";
pub const DEFAULT_LLAMACPP_TIMEOUT: Duration = Duration::from_secs(90);

const NAME: &str = "llamacpp";

/// Local llama.cpp server speaking the OpenAI chat completions protocol.
pub struct LlamaCppProvider {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl LlamaCppProvider {
    pub fn new(
        base_url: Option<String>,
        api_key: impl Into<String>,
        model: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        let timeout = timeout.filter(|t| !t.is_zero()).unwrap_or(DEFAULT_LLAMACPP_TIMEOUT);
        let base_url = base_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LLAMACPP_URL.to_string());
        Ok(Self {
            http: http_client(NAME, timeout)?,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LLAMACPP_MODEL.to_string()),
            timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.base_url.is_empty() {
            return Err(ProviderError::config(NAME, "base URL is required"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ProviderError::config(
                NAME,
                "base URL must start with http:// or https://",
            ));
        }
        Ok(())
    }

    pub async fn generate_commit_message(
        &self,
        diff: &str,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        self.validate()?;

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(COMMIT_SYSTEM_PROMPT),
                ChatMessage::user(&build_prompt(diff, options)),
            ],
            temperature: options.temperature(),
            max_tokens: options.max_tokens(),
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!("llama.cpp request to {}", url);

        let mut builder = self.http.post(&url).json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(|e| {
            if !e.is_timeout() && is_connection_refused(&e) {
                ProviderError::new(
                    NAME,
                    ErrorKind::Transport,
                    "connection refused - is the llama.cpp server running?",
                )
                .with_source(e)
            } else {
                ProviderError::from_reqwest(NAME, e)
            }
        })?;

        let (status, body) = read_body(NAME, response).await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ApiError>(&body)
                .ok()
                .and_then(|e| e.error)
                .and_then(|d| d.message)
                .filter(|m| !m.is_empty());
            let message = detail.unwrap_or_else(|| truncate_body(&body).to_string());
            return Err(ProviderError::protocol(
                NAME,
                status.as_u16(),
                format!("API returned status {}: {}", status.as_u16(), message),
            ));
        }

        let resp: ChatCompletionResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::decode(NAME, e))?;

        if let Some(usage) = &resp.usage {
            debug!("Tokens used: {}", usage.total_tokens);
        }

        let choice = resp
            .choices
            .first()
            .ok_or_else(|| ProviderError::empty(NAME, "no choices in response"))?;

        non_empty_message(NAME, choice.message.content.as_deref())
    }
}
