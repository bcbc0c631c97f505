// src/client.rs
use std::time::Duration;

use tracing::{debug, info};

use crate::config::AiSettings;
use crate::error::ProviderError;
use crate::providers::{
    ClaudeProvider, GenerationOptions, LlamaCppProvider, OpenAiProvider, Provider, ProviderKind,
    VertexAiProvider,
};

/// Builds the adapter picked by configuration and runs it under a deadline.
pub struct LlmClient {
    provider: Provider,
    deadline: Duration,
}

impl LlmClient {
    pub fn new(settings: &AiSettings) -> Result<Self, ProviderError> {
        let provider = build_provider(settings)?;
        info!("Using AI provider {} with model {}", provider.name(), provider.model());
        Ok(Self::from_provider(provider))
    }

    pub fn from_provider(provider: Provider) -> Self {
        let deadline = provider.timeout();
        Self { provider, deadline }
    }

    #[cfg(test)]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    #[cfg(test)]
    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        self.provider.validate()
    }

    pub async fn generate(
        &self,
        diff: &str,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        self.provider.validate()?;
        debug!(
            "Generating commit message with {} (deadline {:?})",
            self.name(),
            self.deadline
        );

        match tokio::time::timeout(self.deadline, self.provider.generate_commit_message(diff, options)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timeout(self.name(), self.deadline)),
        }
    }
}

pub fn build_provider(settings: &AiSettings) -> Result<Provider, ProviderError> {
    let model = settings.model.clone();
    let timeout = settings.timeout;
    let base_url = settings.base_url.as_deref().filter(|u| !u.trim().is_empty());

    let provider = match settings.provider {
        ProviderKind::OpenAi => {
            let mut p = OpenAiProvider::new(settings.api_key.clone(), model, timeout)?;
            if let Some(url) = base_url {
                p = p.with_base_url(url);
            }
            Provider::OpenAi(p)
        }
        ProviderKind::Anthropic => {
            let mut p = ClaudeProvider::new(settings.api_key.clone(), model, timeout)?;
            if let Some(url) = base_url {
                p = p.with_base_url(url);
            }
            Provider::Anthropic(p)
        }
        ProviderKind::VertexAi => {
            let key_path = settings.google_service_account_key.as_deref().ok_or_else(|| {
                ProviderError::config(
                    ProviderKind::VertexAi.name(),
                    "service account key is required (ai.google_service_account_key)",
                )
            })?;
            let mut p = VertexAiProvider::from_key_file(
                key_path,
                settings.google_project_id.clone(),
                settings.google_location.as_deref(),
                model,
                timeout,
            )?;
            if let Some(url) = base_url {
                p = p.with_api_base(url);
            }
            debug!("Vertex AI project {} in {}", p.project_id(), p.location());
            Provider::VertexAi(p)
        }
        ProviderKind::LlamaCpp => {
            let p = LlamaCppProvider::new(
                base_url.map(str::to_string),
                settings.api_key.clone(),
                model,
                timeout,
            )?;
            debug!("llama.cpp server at {}", p.base_url());
            Provider::LlamaCpp(p)
        }
    };

    Ok(provider)
}
