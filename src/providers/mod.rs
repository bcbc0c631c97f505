// src/providers/mod.rs
pub mod claude;
pub mod llamacpp;
pub mod openai;
pub mod token;
pub mod vertex;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};

use crate::error::ProviderError;
use crate::prompts::PromptStyle;

pub use claude::ClaudeProvider;
pub use llamacpp::LlamaCppProvider;
pub use openai::OpenAiProvider;
pub use vertex::VertexAiProvider;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const ERROR_BODY_LIMIT: usize = 500;

// =============================================================================
// GENERATION OPTIONS
// =============================================================================
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    pub commit_standard: Option<String>,
    pub branch_name: Option<String>,
    pub additional_context: Option<String>,
    pub prompt_style: PromptStyle,
}

impl GenerationOptions {
    pub(crate) fn max_tokens(&self) -> Option<u32> {
        (self.max_tokens > 0).then_some(self.max_tokens)
    }

    pub(crate) fn temperature(&self) -> Option<f32> {
        (self.temperature > 0.0).then_some(self.temperature)
    }
}

// =============================================================================
// PROVIDER KIND
// =============================================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    VertexAi,
    LlamaCpp,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::VertexAi,
        ProviderKind::LlamaCpp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "claude",
            ProviderKind::VertexAi => "vertexai",
            ProviderKind::LlamaCpp => "llamacpp",
        }
    }

    /// Conventional environment variable holding the API key.
    pub fn api_key_env(self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::VertexAi => None,
            ProviderKind::LlamaCpp => Some("LLAMACPP_API_KEY"),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "claude" | "anthropic" => Ok(ProviderKind::Anthropic),
            "vertexai" | "vertex" | "gemini" => Ok(ProviderKind::VertexAi),
            "llamacpp" | "llama.cpp" | "local" => Ok(ProviderKind::LlamaCpp),
            other => {
                let supported: Vec<&str> = ProviderKind::ALL.iter().map(|k| k.name()).collect();
                Err(format!(
                    "unknown AI provider '{}' (supported: {})",
                    other,
                    supported.join(", ")
                ))
            }
        }
    }
}

// =============================================================================
// PROVIDER
// =============================================================================
pub enum Provider {
    OpenAi(OpenAiProvider),
    Anthropic(ClaudeProvider),
    VertexAi(VertexAiProvider),
    LlamaCpp(LlamaCppProvider),
}

impl Provider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::OpenAi(_) => ProviderKind::OpenAi,
            Provider::Anthropic(_) => ProviderKind::Anthropic,
            Provider::VertexAi(_) => ProviderKind::VertexAi,
            Provider::LlamaCpp(_) => ProviderKind::LlamaCpp,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::OpenAi(p) => p.model(),
            Provider::Anthropic(p) => p.model(),
            Provider::VertexAi(p) => p.model(),
            Provider::LlamaCpp(p) => p.model(),
        }
    }

    pub fn timeout(&self) -> Duration {
        match self {
            Provider::OpenAi(p) => p.timeout(),
            Provider::Anthropic(p) => p.timeout(),
            Provider::VertexAi(p) => p.timeout(),
            Provider::LlamaCpp(p) => p.timeout(),
        }
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        match self {
            Provider::OpenAi(p) => p.validate(),
            Provider::Anthropic(p) => p.validate(),
            Provider::VertexAi(p) => p.validate(),
            Provider::LlamaCpp(p) => p.validate(),
        }
    }

    pub async fn generate_commit_message(
        &self,
        diff: &str,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        match self {
            Provider::OpenAi(p) => p.generate_commit_message(diff, options).await,
            Provider::Anthropic(p) => p.generate_commit_message(diff, options).await,
            Provider::VertexAi(p) => p.generate_commit_message(diff, options).await,
            Provider::LlamaCpp(p) => p.generate_commit_message(diff, options).await,
        }
    }
}

// =============================================================================
// SHARED HTTP HELPERS
// =============================================================================
pub(crate) fn http_client(provider: &'static str, timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::config(provider, "failed to build HTTP client").with_source(e))
}

pub(crate) async fn read_body(
    provider: &'static str,
    response: Response,
) -> Result<(StatusCode, String), ProviderError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, e))?;
    Ok((status, body))
}

/// First bytes of an error body, cut on a char boundary.
pub(crate) fn truncate_body(body: &str) -> &str {
    let body = body.trim();
    if body.len() <= ERROR_BODY_LIMIT {
        return body;
    }
    let mut end = ERROR_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

pub(crate) fn non_empty_message(
    provider: &'static str,
    text: Option<&str>,
) -> Result<String, ProviderError> {
    let message = text.map(str::trim).unwrap_or_default();
    if message.is_empty() {
        return Err(ProviderError::empty(provider, "empty message in response"));
    }
    Ok(message.to_string())
}
