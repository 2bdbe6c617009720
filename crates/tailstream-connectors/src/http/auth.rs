//! Bearer-token acquisition for the query API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tailstream_core::ConnectorError;
use tracing::debug;

/// Seconds a cached token is considered expired ahead of its actual expiry.
const EXPIRY_MARGIN_SECS: u64 = 60;

/// Fallback token lifetime when the identity endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// Supplies bearer tokens for the query API.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A currently valid bearer token.
    async fn bearer_token(&self) -> Result<String, ConnectorError>;
}

/// A fixed token, for tests and for environments where the platform injects
/// credentials (managed identity).
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Wrap a pre-acquired token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String, ConnectorError> {
        Ok(self.token.clone())
    }
}

/// OAuth2 client-credentials configuration.
#[derive(Debug, Clone)]
pub struct ClientCredentialsConfig {
    /// Identity endpoint base, e.g. `https://login.microsoftonline.com`.
    pub authority: String,
    /// Directory (tenant) identifier.
    pub tenant_id: String,
    /// Application (client) identifier.
    pub client_id: String,
    /// Application secret.
    pub client_secret: String,
    /// Audience the token is requested for.
    pub resource: String,
    /// Request timeout for token calls.
    pub timeout: Duration,
}

impl ClientCredentialsConfig {
    /// Configuration against the default authority.
    #[must_use]
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            authority: "https://login.microsoftonline.com".into(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            resource: resource.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

struct CachedToken {
    bearer: String,
    expires_at: Instant,
}

/// OAuth2 client-credentials token provider with in-memory caching.
///
/// Fetches a token on first use, then serves it from cache until one minute
/// before expiry.
pub struct ClientCredentialsProvider {
    http: reqwest::Client,
    config: ClientCredentialsConfig,
    cached: Mutex<Option<CachedToken>>,
}

impl ClientCredentialsProvider {
    /// Create a provider with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Connection`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: ClientCredentialsConfig) -> Result<Self, ConnectorError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConnectorError::Connection(e.to_string()))?;
        Ok(Self {
            http,
            config,
            cached: Mutex::new(None),
        })
    }

    fn cached_token(&self) -> Option<String> {
        let cached = self.cached.lock();
        cached.as_ref().and_then(|token| {
            (Instant::now() < token.expires_at).then(|| token.bearer.clone())
        })
    }

    async fn fetch_token(&self) -> Result<(String, u64), ConnectorError> {
        let url = format!(
            "{}/{}/oauth2/token",
            self.config.authority.trim_end_matches('/'),
            self.config.tenant_id
        );
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("resource", self.config.resource.as_str()),
        ];
        let response = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ConnectorError::Auth(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ConnectorError::Auth(e.to_string()))?;
        if !status.is_success() {
            return Err(ConnectorError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }
        parse_token_response(&body)
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsProvider {
    async fn bearer_token(&self) -> Result<String, ConnectorError> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }
        let (bearer, lifetime_secs) = self.fetch_token().await?;
        debug!(lifetime_secs, "acquired bearer token");
        let expires_at = Instant::now()
            + Duration::from_secs(lifetime_secs.saturating_sub(EXPIRY_MARGIN_SECS));
        *self.cached.lock() = Some(CachedToken {
            bearer: bearer.clone(),
            expires_at,
        });
        Ok(bearer)
    }
}

/// Extract `(access_token, expires_in)` from a token response body.
///
/// `expires_in` arrives as a number or a numeric string depending on the
/// identity endpoint version; both are accepted.
fn parse_token_response(body: &str) -> Result<(String, u64), ConnectorError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ConnectorError::Auth(format!("malformed token response: {e}")))?;
    let bearer = value
        .get("access_token")
        .and_then(Value::as_str)
        .ok_or_else(|| ConnectorError::Auth("token response missing access_token".into()))?
        .to_string();
    let lifetime = value
        .get("expires_in")
        .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
    Ok((bearer, lifetime))
}
