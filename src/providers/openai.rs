// src/providers/openai.rs
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::{http_client, non_empty_message, read_body, truncate_body, GenerationOptions, DEFAULT_TIMEOUT};
use crate::error::ProviderError;
use crate::prompts::{build_prompt, COMMIT_SYSTEM_PROMPT};
use crate::types::*;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4";

const NAME: &str = "openai";

pub struct OpenAiProvider {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAiProvider {
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
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            base_url: OPENAI_BASE_URL.to_string(),
            timeout,
        })
    }

    /// Points the adapter at another OpenAI-compatible deployment.
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
        if !self.api_key.starts_with("sk-") {
            return Err(ProviderError::config(NAME, "invalid API key format"));
        }
        Ok(())
    }

    pub async fn generate_commit_message(
        &self,
        diff: &str,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        self.validate()?;

        let prompt = build_prompt(diff, options);
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(COMMIT_SYSTEM_PROMPT), ChatMessage::user(&prompt)],
            temperature: Some(options.temperature),
            max_tokens: options.max_tokens(),
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!("OpenAI request to {} (prompt {} chars)", url, prompt.len());

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(NAME, e))?;

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
                format!("API error ({}): {}", status.as_u16(), message),
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
            .ok_or_else(|| ProviderError::empty(NAME, "no response from API"))?;

        let message = non_empty_message(NAME, choice.message.content.as_deref())?;
        debug!("OpenAI generated message: {}", message);
        Ok(message)
    }
}
