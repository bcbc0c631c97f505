// src/config.rs
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::prompts::PromptStyle;
use crate::providers::ProviderKind;

// =============================================================================
// DEFAULTS
// =============================================================================
pub const CONFIG_FILENAME: &str = ".workfac.toml";
pub const CONFIG_PATH_ENV: &str = "WORKFAC_CONFIG";

pub const DEFAULT_BRANCH_TEMPLATE: &str = "{{type}}/{{issue}}-{{summary}}";
pub const DEFAULT_COMMIT_TEMPLATE: &str = "{{type}}({{issue}}): ";
pub const DEFAULT_COMMIT_IGNORE_PATTERNS: &[&str] = &[r"(^|/)\.env$", r"(^|/)\.DS_Store$"];

const DEFAULT_TYPE_MAPPING: &[(&str, &str)] = &[
    ("feature", "feat"),
    ("fix", "fix"),
    ("hotfix", "fix"),
    ("docs", "docs"),
    ("refactor", "refactor"),
    ("test", "test"),
    ("chore", "chore"),
];

// =============================================================================
// ENUMS
// =============================================================================
/// What `pause`/`end` do when the working tree is dirty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UncommittedMode {
    Disabled,
    Warning,
    #[default]
    Fatal,
    Interactive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ticketing {
    #[default]
    Jira,
    Gitlab,
}

// =============================================================================
// CONFIG FILE
// =============================================================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub log_level: String,
    pub default_branch: String,
    pub enforce_standard: bool,
    pub ticketing: Ticketing,
    pub branch_types: Vec<String>,
    pub branch_expr: String,
    pub branch_template: String,
    pub branch_separator: String,
    pub commit_expr: String,
    pub commit_template: String,
    pub type_mapping: BTreeMap<String, String>,
    pub commit_ignore_patterns: Vec<String>,
    pub uncommitted_files_detection: UncommittedMode,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        let type_mapping: BTreeMap<String, String> = DEFAULT_TYPE_MAPPING
            .iter()
            .map(|(b, c)| (b.to_string(), c.to_string()))
            .collect();
        Self {
            log_level: "warn".into(),
            default_branch: "main".into(),
            enforce_standard: false,
            ticketing: Ticketing::default(),
            branch_types: type_mapping.keys().cloned().collect(),
            branch_expr: String::new(),
            branch_template: DEFAULT_BRANCH_TEMPLATE.into(),
            branch_separator: "-".into(),
            commit_expr: String::new(),
            commit_template: DEFAULT_COMMIT_TEMPLATE.into(),
            type_mapping,
            commit_ignore_patterns: DEFAULT_COMMIT_IGNORE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            uncommitted_files_detection: UncommittedMode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub enabled: bool,
    pub provider: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Seconds; unset means the provider default.
    pub timeout: Option<u64>,
    pub exclude_patterns: Vec<String>,
    pub prompt_style: PromptStyle,
    pub additional_context: Option<String>,
    pub google_project_id: Option<String>,
    pub google_location: Option<String>,
    pub google_service_account_key: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "openai".into(),
            api_key: None,
            model: None,
            base_url: None,
            max_tokens: 1024,
            temperature: 0.7,
            timeout: None,
            exclude_patterns: Vec::new(),
            prompt_style: PromptStyle::default(),
            additional_context: None,
            google_project_id: None,
            google_location: None,
            google_service_account_key: None,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub global: GlobalConfig,
    pub ai: AiConfig,
}

impl Config {
    pub fn path() -> Option<PathBuf> {
        if let Ok(p) = std::env::var(CONFIG_PATH_ENV) {
            if !p.trim().is_empty() {
                return Some(expand_home(p.trim()));
            }
        }
        dirs::home_dir().map(|h| h.join(CONFIG_FILENAME))
    }

    /// Missing file means defaults; a broken file is an error.
    pub fn load() -> Result<Self> {
        match Self::path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }
}

// =============================================================================
// RESOLVED AI SETTINGS
// =============================================================================
#[derive(Debug, Clone)]
pub struct AiSettings {
    pub provider: ProviderKind,
    pub api_key: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Option<Duration>,
    pub prompt_style: PromptStyle,
    pub additional_context: Option<String>,
    pub exclude_patterns: Vec<String>,
    pub google_project_id: Option<String>,
    pub google_location: Option<String>,
    pub google_service_account_key: Option<PathBuf>,
}

impl AiSettings {
    pub fn resolve(
        file: &AiConfig,
        cli_provider: Option<&String>,
        cli_model: Option<&String>,
        cli_timeout: Option<u64>,
    ) -> Result<Self> {
        // Provider: CLI > config file
        let provider_name = cli_provider.unwrap_or(&file.provider);
        let provider: ProviderKind = match provider_name.parse() {
            Ok(p) => p,
            Err(e) => bail!("{}", e),
        };

        // API key: config file (with $VAR expansion) > provider env var
        let api_key = file
            .api_key
            .as_deref()
            .map(expand_env)
            .filter(|k| !k.is_empty())
            .or_else(|| {
                provider
                    .api_key_env()
                    .and_then(|var| std::env::var(var).ok())
            })
            .unwrap_or_default();

        // Model: CLI > config file > adapter default
        let model = cli_model.cloned().or_else(|| file.model.clone());

        let timeout = cli_timeout
            .or(file.timeout)
            .filter(|t| *t > 0)
            .map(Duration::from_secs);

        let google_service_account_key = file
            .google_service_account_key
            .as_deref()
            .map(expand_env)
            .filter(|p| !p.is_empty())
            .map(|p| expand_home(&p));

        Ok(Self {
            provider,
            api_key,
            model,
            base_url: file.base_url.clone(),
            max_tokens: file.max_tokens,
            temperature: file.temperature,
            timeout,
            prompt_style: file.prompt_style,
            additional_context: file.additional_context.clone(),
            exclude_patterns: file.exclude_patterns.clone(),
            google_project_id: file.google_project_id.as_deref().map(expand_env),
            google_location: file.google_location.clone(),
            google_service_account_key,
        })
    }
}

// =============================================================================
// EXPANSION HELPERS
// =============================================================================
/// `$NAME` or `${NAME}` reads the environment; anything else is literal.
pub fn expand_env(value: &str) -> String {
    let value = value.trim();
    let Some(rest) = value.strip_prefix('$') else {
        return value.to_string();
    };
    let name = rest
        .strip_prefix('{')
        .and_then(|r| r.strip_suffix('}'))
        .unwrap_or(rest);
    std::env::var(name).unwrap_or_default()
}

pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
