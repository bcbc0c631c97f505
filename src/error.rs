// src/error.rs
use std::error::Error as StdError;
use std::io;

use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

// =============================================================================
// PROVIDER ERRORS
// =============================================================================

/// Failure class of a provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed settings, caught before any network I/O.
    Configuration,
    /// DNS, connect or TLS failure.
    Transport,
    /// Client timeout or caller deadline.
    Timeout,
    /// Non-2xx HTTP status.
    Protocol { status: u16 },
    /// Body is not the JSON shape we expected.
    Decode,
    /// Valid response without a usable candidate.
    EmptyResult,
    /// Service-account key or token exchange failure.
    Credential,
}

/// Every adapter failure, tagged with the provider it came from.
#[derive(Error, Debug)]
#[error("{provider}: {message}")]
pub struct ProviderError {
    pub provider: &'static str,
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
}

impl ProviderError {
    pub fn new(provider: &'static str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn config(provider: &'static str, message: impl Into<String>) -> Self {
        Self::new(provider, ErrorKind::Configuration, message)
    }

    pub fn empty(provider: &'static str, message: impl Into<String>) -> Self {
        Self::new(provider, ErrorKind::EmptyResult, message)
    }

    pub fn decode(provider: &'static str, err: serde_json::Error) -> Self {
        Self::new(provider, ErrorKind::Decode, "failed to decode response").with_source(err)
    }

    pub fn protocol(provider: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::new(provider, ErrorKind::Protocol { status }, message)
    }

    pub fn timeout(provider: &'static str, after: std::time::Duration) -> Self {
        Self::new(
            provider,
            ErrorKind::Timeout,
            format!("request timed out after {:?}", after),
        )
    }

    /// Classifies a reqwest failure into timeout or transport.
    pub fn from_reqwest(provider: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::new(provider, ErrorKind::Timeout, "request timed out").with_source(err);
        }
        let message = if err.is_connect() {
            "failed to connect"
        } else {
            "failed to send request"
        };
        Self::new(provider, ErrorKind::Transport, message).with_source(err)
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }
}

/// True when an error chain bottoms out in a refused TCP connection.
pub fn is_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        if e.to_string().to_lowercase().contains("connection refused") {
            return true;
        }
        current = e.source();
    }
    false
}

// =============================================================================
// TOKEN EXCHANGE ERRORS
// =============================================================================
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("failed to parse private key: {0}")]
    InvalidKey(String),

    #[error("failed to parse private key: {0} keys are not supported, an RSA key is required")]
    NotRsa(String),

    #[error("failed to sign JWT")]
    Sign(#[source] jsonwebtoken::errors::Error),

    #[error("token request failed")]
    Request(#[source] reqwest::Error),

    #[error("token exchange failed ({status}): {body}")]
    Exchange { status: u16, body: String },

    #[error("failed to decode token response")]
    Decode(#[source] serde_json::Error),
}

// =============================================================================
// WORKFLOW ERRORS
// =============================================================================
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Git(#[from] git2::Error),

    #[error("workflow '{0}' not found")]
    NotFound(String),

    #[error("workflow '{0}' already exists")]
    AlreadyExists(String),

    #[error("workflow '{workflow}' has no '{param}' parameter")]
    MissingParam { workflow: String, param: String },

    #[error("no current workflow, run `workfac use <work>` first")]
    NoCurrent,

    #[error("no commit type mapped for branch type '{0}'")]
    UnmappedType(String),

    #[error("issue '{0}' must be a merge request number")]
    InvalidIssue(String),

    #[error("invalid pattern '{pattern}'")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex_lite::Error,
    },

    #[error("{what} '{value}' does not match the standard '{pattern}'")]
    StandardViolation {
        what: &'static str,
        value: String,
        pattern: String,
    },
}

// =============================================================================
// MODULE TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_provider_and_keeps_cause() {
        let cause = io::Error::new(io::ErrorKind::Other, "boom");
        let err = ProviderError::new("openai", ErrorKind::Transport, "failed to connect")
            .with_source(cause);
        assert_eq!(err.to_string(), "openai: failed to connect");
        assert_eq!(err.source().map(|s| s.to_string()), Some("boom".into()));

        let chained = format!("{:#}", anyhow::Error::from(err));
        assert!(chained.contains("openai: failed to connect"));
        assert!(chained.contains("boom"));
    }

    #[test]
    fn connection_refused_found_deep_in_chain() {
        let inner = io::Error::new(io::ErrorKind::ConnectionRefused, "nope");
        let outer = ProviderError::new("llamacpp", ErrorKind::Transport, "x").with_source(inner);
        assert!(is_connection_refused(&outer));

        let other = io::Error::new(io::ErrorKind::TimedOut, "slow");
        assert!(!is_connection_refused(&other));
    }

    #[test]
    fn timeout_message_keeps_sub_second_precision() {
        let err = ProviderError::timeout("openai", std::time::Duration::from_millis(200));
        assert_eq!(err.to_string(), "openai: request timed out after 200ms");
        assert!(err.is_timeout());

        let err = ProviderError::timeout("claude", std::time::Duration::from_secs(30));
        assert_eq!(err.to_string(), "claude: request timed out after 30s");
    }

    #[test]
    fn token_error_exchange_message() {
        let err = TokenError::Exchange { status: 400, body: "invalid_grant".into() };
        assert_eq!(err.to_string(), "token exchange failed (400): invalid_grant");
    }
}
