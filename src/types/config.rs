//! Configuration Types
//!
//! Client configuration supplied by the host application.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::resilience::RetryConfig;

/// API client configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ClientConfig {
    /// Base URL every request path is joined onto.
    pub url: String,
    /// Token endpoint path, relative to `url`.
    pub token_path: String,
    /// Client credentials.
    #[serde(flatten)]
    pub credentials: ClientCredentials,
    /// Scope requested with the password grant.
    #[serde(default)]
    pub scope: String,
    /// Per-attempt timeout for requests whose call sets no timeout of its
    /// own. `None` leaves such attempts unbounded.
    #[serde(skip)]
    pub transport_timeout: Option<Duration>,
    /// Token lifecycle tunables.
    #[serde(skip)]
    pub token_manager: TokenManagerConfig,
}

impl ClientConfig {
    /// Absolute token endpoint URL.
    pub fn token_url(&self) -> String {
        join_url(&self.url, &self.token_path)
    }

    /// Absolute URL for an API path.
    pub fn endpoint(&self, path: &str) -> String {
        join_url(&self.url, path)
    }
}

/// `base + '/' + path` with the path's leading slashes stripped.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base, path.trim_start_matches('/'))
}

/// Client credentials for the token endpoint.
#[derive(Clone, Default, Deserialize)]
pub struct ClientCredentials {
    /// Client identifier.
    #[serde(default)]
    pub client_id: String,
    /// Client secret.
    #[serde(default)]
    pub client_secret: Option<SecretString>,
    /// Where the credentials travel.
    #[serde(default)]
    pub auth_method: ClientAuthMethod,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_method", &self.auth_method)
            .finish()
    }
}

/// Client authentication method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
    /// client_id and client_secret in request body.
    #[default]
    ClientSecretPost,
    /// HTTP Basic Authentication header.
    ClientSecretBasic,
}

/// Token lifecycle configuration.
#[derive(Debug, Clone)]
pub struct TokenManagerConfig {
    /// Retries of a failed token request before the failure is terminal.
    pub token_retries: u32,
    /// Upper bound on a whole token acquisition, retries included.
    pub token_timeout: Duration,
    /// How long before expiry the silent refresh fires.
    pub refresh_margin: Duration,
    /// Drop completions of acquisitions superseded by a newer one or by logout.
    pub discard_stale_attempts: bool,
    /// Backoff between attempts.
    pub retry: RetryConfig,
}

impl Default for TokenManagerConfig {
    fn default() -> Self {
        Self {
            token_retries: DEFAULT_TOKEN_RETRIES,
            token_timeout: Duration::from_millis(DEFAULT_TOKEN_TIMEOUT_MS),
            refresh_margin: Duration::from_secs(DEFAULT_REFRESH_MARGIN_SECS),
            discard_stale_attempts: true,
            retry: RetryConfig::default(),
        }
    }
}

/// Default configuration values.
pub const DEFAULT_TOKEN_RETRIES: u32 = 3;
pub const DEFAULT_TOKEN_TIMEOUT_MS: u64 = 16000;
pub const DEFAULT_REFRESH_MARGIN_SECS: u64 = 30;
