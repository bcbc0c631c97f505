// src/providers/vertex.rs
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::token::{ServiceAccountKey, TokenSource, SERVICE_ACCOUNT_TYPE};
use super::{http_client, non_empty_message, read_body, truncate_body, GenerationOptions, DEFAULT_TIMEOUT};
use crate::error::{ErrorKind, ProviderError};
use crate::prompts::build_prompt;
use crate::types::*;

pub const DEFAULT_VERTEX_MODEL: &str = "gemini-2.5-flash";

const NAME: &str = "vertexai";

// =============================================================================
// LOCATION
// =============================================================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VertexLocation {
    #[default]
    UsCentral1,
    UsEast4,
    EuropeWest1,
    AsiaSoutheast1,
    Global,
}

impl VertexLocation {
    pub const ALL: [VertexLocation; 5] = [
        VertexLocation::UsCentral1,
        VertexLocation::UsEast4,
        VertexLocation::EuropeWest1,
        VertexLocation::AsiaSoutheast1,
        VertexLocation::Global,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VertexLocation::UsCentral1 => "us-central1",
            VertexLocation::UsEast4 => "us-east4",
            VertexLocation::EuropeWest1 => "europe-west1",
            VertexLocation::AsiaSoutheast1 => "asia-southeast1",
            VertexLocation::Global => "global",
        }
    }

    /// `global` is served from the unprefixed host.
    pub fn api_host(self) -> String {
        match self {
            VertexLocation::Global => "https://aiplatform.googleapis.com".to_string(),
            regional => format!("https://{}-aiplatform.googleapis.com", regional.as_str()),
        }
    }
}

impl fmt::Display for VertexLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VertexLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        VertexLocation::ALL
            .into_iter()
            .find(|loc| loc.as_str() == s)
            .ok_or_else(|| {
                let allowed: Vec<&str> = VertexLocation::ALL.iter().map(|l| l.as_str()).collect();
                format!("invalid location '{}', must be one of: {}", s, allowed.join(", "))
            })
    }
}

// =============================================================================
// PROVIDER
// =============================================================================
pub struct VertexAiProvider {
    http: Client,
    tokens: TokenSource,
    project_id: String,
    location: VertexLocation,
    model: String,
    api_base: Option<String>,
    timeout: Duration,
}

impl VertexAiProvider {
    pub fn new(
        key: ServiceAccountKey,
        project_id: Option<String>,
        location: Option<&str>,
        model: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        let timeout = timeout.filter(|t| !t.is_zero()).unwrap_or(DEFAULT_TIMEOUT);
        let location = match location.map(str::trim).filter(|l| !l.is_empty()) {
            Some(raw) => raw
                .parse::<VertexLocation>()
                .map_err(|e| ProviderError::config(NAME, e))?,
            None => VertexLocation::default(),
        };
        let project_id = project_id
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| key.project_id.clone());
        let http = http_client(NAME, timeout)?;

        Ok(Self {
            tokens: TokenSource::new(http.clone(), key),
            http,
            project_id,
            location,
            model: model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_VERTEX_MODEL.to_string()),
            api_base: None,
            timeout,
        })
    }

    pub fn from_key_file(
        key_path: &Path,
        project_id: Option<String>,
        location: Option<&str>,
        model: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        let load_error = || ProviderError::config(NAME, "failed to load service account key");
        let raw = std::fs::read_to_string(key_path).map_err(|e| load_error().with_source(e))?;
        let key = ServiceAccountKey::from_json(&raw).map_err(|e| load_error().with_source(e))?;
        debug!("Loaded service account {} from {}", key.client_email, key_path.display());
        Self::new(key, project_id, location, model, timeout)
    }

    /// Overrides the regional host, e.g. for a private endpoint.
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = Some(api_base.trim_end_matches('/').to_string());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn location(&self) -> VertexLocation {
        self.location
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn endpoint(&self) -> String {
        let host = self
            .api_base
            .clone()
            .unwrap_or_else(|| self.location.api_host());
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            host, self.project_id, self.location, self.model
        )
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.project_id.trim().is_empty() {
            return Err(ProviderError::config(NAME, "project ID is required"));
        }
        let key = self.tokens.key();
        if !key.kind.is_empty() && key.kind != SERVICE_ACCOUNT_TYPE {
            return Err(ProviderError::config(
                NAME,
                format!("credentials file is a '{}' key, a service account key is required", key.kind),
            ));
        }
        if key.private_key.trim().is_empty() {
            return Err(ProviderError::config(NAME, "service account private key is missing"));
        }
        if key.client_email.trim().is_empty() {
            return Err(ProviderError::config(NAME, "service account client email is missing"));
        }
        Ok(())
    }

    pub async fn generate_commit_message(
        &self,
        diff: &str,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        self.validate()?;

        let token = self.tokens.access_token().await.map_err(|e| {
            ProviderError::new(NAME, ErrorKind::Credential, "failed to get access token").with_source(e)
        })?;

        let request = VertexRequest {
            contents: vec![VertexContent {
                role: Some("user".into()),
                parts: vec![VertexPart { text: Some(build_prompt(diff, options)) }],
            }],
            generation_config: Some(VertexGenerationConfig {
                temperature: options.temperature(),
                max_output_tokens: options.max_tokens(),
            }),
        };

        let url = self.endpoint();
        debug!("Vertex AI request to {}", url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(NAME, e))?;

        let (status, body) = read_body(NAME, response).await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<VertexError>(&body)
                .ok()
                .and_then(|e| e.error)
                .and_then(|d| {
                    let message = d.message.filter(|m| !m.is_empty())?;
                    Some(match (d.status, d.code) {
                        (Some(s), _) => format!("{} ({})", message, s),
                        (None, Some(code)) => format!("{} (code {})", message, code),
                        (None, None) => message,
                    })
                });
            let message = detail.unwrap_or_else(|| truncate_body(&body).to_string());
            return Err(ProviderError::protocol(
                NAME,
                status.as_u16(),
                format!("API error ({}): {}", status.as_u16(), message),
            ));
        }

        let resp: VertexResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::decode(NAME, e))?;

        if let Some(usage) = &resp.usage_metadata {
            debug!("Tokens used: {}", usage.total_token_count);
        }

        let candidate = resp
            .candidates
            .first()
            .ok_or_else(|| ProviderError::empty(NAME, "no response from API"))?;

        let text = candidate
            .content
            .as_ref()
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.as_deref());

        non_empty_message(NAME, text)
    }

    #[cfg(test)]
    pub(crate) async fn expire_cached_token(&self) {
        self.tokens.expire_cached_token().await;
    }
}
