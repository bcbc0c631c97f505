// src/providers/token.rs
use std::time::Duration;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::TokenError;
use crate::types::{JwtClaims, TokenResponse};

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

pub const SERVICE_ACCOUNT_TYPE: &str = "service_account";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

// =============================================================================
// SERVICE ACCOUNT KEY
// =============================================================================
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: String,
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub client_email: String,
    #[serde(default)]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Token endpoint, doubling as the JWT audience.
    pub fn token_endpoint(&self) -> &str {
        if self.token_uri.trim().is_empty() {
            GOOGLE_TOKEN_URL
        } else {
            self.token_uri.trim()
        }
    }
}

fn pem_label(pem: &str) -> Option<&str> {
    let start = pem.find("-----BEGIN ")? + "-----BEGIN ".len();
    let rest = &pem[start..];
    let end = rest.find("-----")?;
    Some(&rest[..end])
}

/// Accepts RSA keys in PKCS#1 or PKCS#8 PEM form.
pub fn parse_private_key(pem: &str) -> Result<EncodingKey, TokenError> {
    let label = pem_label(pem).ok_or_else(|| TokenError::InvalidKey("no PEM block found".into()))?;

    match label {
        "RSA PRIVATE KEY" | "PRIVATE KEY" => {}
        "EC PRIVATE KEY" => return Err(TokenError::NotRsa("EC".into())),
        "OPENSSH PRIVATE KEY" => return Err(TokenError::NotRsa("OpenSSH".into())),
        other => {
            return Err(TokenError::InvalidKey(format!("unexpected PEM block '{}'", other)))
        }
    }

    match EncodingKey::from_rsa_pem(pem.as_bytes()) {
        Ok(key) => Ok(key),
        // PKCS#8 wraps any algorithm, so find out what it actually holds.
        Err(_) if EncodingKey::from_ec_pem(pem.as_bytes()).is_ok() => {
            Err(TokenError::NotRsa("EC".into()))
        }
        Err(_) if EncodingKey::from_ed_pem(pem.as_bytes()).is_ok() => {
            Err(TokenError::NotRsa("Ed25519".into()))
        }
        Err(e) => Err(TokenError::InvalidKey(e.to_string())),
    }
}

// =============================================================================
// TOKEN CACHE
// =============================================================================
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Exchanges a service-account key for OAuth2 access tokens and caches them.
pub struct TokenSource {
    http: Client,
    key: ServiceAccountKey,
    cache: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(http: Client, key: ServiceAccountKey) -> Self {
        Self {
            http,
            key,
            cache: Mutex::new(None),
        }
    }

    pub fn key(&self) -> &ServiceAccountKey {
        &self.key
    }

    pub async fn access_token(&self) -> Result<String, TokenError> {
        let mut cache = self.cache.lock().await;
        let now = Instant::now();

        if let Some(cached) = cache.as_ref().filter(|t| t.is_valid(now)) {
            debug!("Using cached Vertex AI access token");
            return Ok(cached.access_token.clone());
        }

        let fresh = self.exchange(now).await?;
        let token = fresh.access_token.clone();
        *cache = Some(fresh);
        Ok(token)
    }

    async fn exchange(&self, now: Instant) -> Result<CachedToken, TokenError> {
        let assertion = self.sign_assertion(chrono::Utc::now().timestamp())?;
        let endpoint = self.key.token_endpoint();
        debug!("Requesting access token from {}", endpoint);

        let response = self
            .http
            .post(endpoint)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(TokenError::Request)?;

        let status = response.status();
        let body = response.text().await.map_err(TokenError::Request)?;

        if !status.is_success() {
            return Err(TokenError::Exchange {
                status: status.as_u16(),
                body: super::truncate_body(&body).to_string(),
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(TokenError::Decode)?;
        let lifetime = Duration::from_secs(parsed.expires_in).saturating_sub(EXPIRY_MARGIN);
        debug!(
            "{} access token valid for {}s",
            parsed.token_type.as_deref().unwrap_or("Bearer"),
            lifetime.as_secs()
        );

        Ok(CachedToken {
            access_token: parsed.access_token,
            expires_at: now + lifetime,
        })
    }

    /// RS256 assertion for the JWT-bearer grant.
    pub fn sign_assertion(&self, issued_at: i64) -> Result<String, TokenError> {
        let encoding_key = parse_private_key(&self.key.private_key)?;

        let claims = JwtClaims {
            iss: &self.key.client_email,
            sub: &self.key.client_email,
            aud: self.key.token_endpoint(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
            scope: CLOUD_PLATFORM_SCOPE,
        };

        let mut header = Header::new(Algorithm::RS256);
        if !self.key.private_key_id.is_empty() {
            header.kid = Some(self.key.private_key_id.clone());
        }

        jsonwebtoken::encode(&header, &claims, &encoding_key).map_err(TokenError::Sign)
    }

    #[cfg(test)]
    pub(crate) async fn expire_cached_token(&self) {
        if let Some(cached) = self.cache.lock().await.as_mut() {
            cached.expires_at = Instant::now();
        }
    }
}
