//! Configuration Builder
//!
//! Fluent builder for client configuration.

use secrecy::SecretString;
use std::time::Duration;

use crate::error::{ApiError, ConfigurationError};
use crate::resilience::RetryConfig;
use crate::types::{ClientAuthMethod, ClientConfig, ClientCredentials, TokenManagerConfig};

/// Environment variables read by [`ClientConfigBuilder::from_env`].
pub const ENV_URL: &str = "API_CLIENT_URL";
pub const ENV_TOKEN_PATH: &str = "API_CLIENT_TOKEN_PATH";
pub const ENV_CLIENT_ID: &str = "API_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "API_CLIENT_SECRET";
pub const ENV_SCOPE: &str = "API_CLIENT_SCOPE";
pub const ENV_TIMEOUT_SECS: &str = "API_CLIENT_TIMEOUT_SECS";

/// Client configuration builder.
pub struct ClientConfigBuilder {
    url: Option<String>,
    token_path: Option<String>,
    client_id: String,
    client_secret: Option<SecretString>,
    auth_method: ClientAuthMethod,
    scope: String,
    transport_timeout: Option<Duration>,
    token_manager: TokenManagerConfig,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self {
            url: None,
            token_path: None,
            client_id: String::new(),
            client_secret: None,
            auth_method: ClientAuthMethod::default(),
            scope: String::new(),
            transport_timeout: None,
            token_manager: TokenManagerConfig::default(),
        }
    }

    /// Builder seeded from `API_CLIENT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut builder = Self::new();

        if let Some(url) = lookup(ENV_URL) {
            builder = builder.url(url);
        }
        if let Some(token_path) = lookup(ENV_TOKEN_PATH) {
            builder = builder.token_path(token_path);
        }
        if let Some(client_id) = lookup(ENV_CLIENT_ID) {
            builder = builder.client_id(client_id);
        }
        if let Some(client_secret) = lookup(ENV_CLIENT_SECRET) {
            builder = builder.client_secret(client_secret);
        }
        if let Some(scope) = lookup(ENV_SCOPE) {
            builder = builder.scope(scope);
        }
        if let Some(timeout_secs) = lookup(ENV_TIMEOUT_SECS).and_then(|v| v.parse::<u64>().ok()) {
            builder = builder.transport_timeout(Duration::from_secs(timeout_secs));
        }

        builder
    }

    /// Set API base URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set token endpoint path, relative to the base URL.
    pub fn token_path(mut self, token_path: impl Into<String>) -> Self {
        self.token_path = Some(token_path.into());
        self
    }

    /// Set client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set client secret.
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    /// Set client authentication method.
    pub fn auth_method(mut self, method: ClientAuthMethod) -> Self {
        self.auth_method = method;
        self
    }

    /// Set scope requested with the password grant.
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Bound each attempt of calls that set no timeout of their own.
    pub fn transport_timeout(mut self, timeout: Duration) -> Self {
        self.transport_timeout = Some(timeout);
        self
    }

    /// Set retries of a failed token request.
    pub fn token_retries(mut self, retries: u32) -> Self {
        self.token_manager.token_retries = retries;
        self
    }

    /// Set bound on a whole token acquisition.
    pub fn token_timeout(mut self, timeout: Duration) -> Self {
        self.token_manager.token_timeout = timeout;
        self
    }

    /// Set how long before expiry the silent refresh fires.
    pub fn refresh_margin(mut self, margin: Duration) -> Self {
        self.token_manager.refresh_margin = margin;
        self
    }

    /// Keep or drop completions of superseded token acquisitions.
    pub fn discard_stale_attempts(mut self, discard: bool) -> Self {
        self.token_manager.discard_stale_attempts = discard;
        self
    }

    /// Set backoff between retry attempts.
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.token_manager.retry = config;
        self
    }

    /// Build the client configuration. Only `url` and `token_path` are
    /// required; missing credentials surface later as token request failures.
    pub fn build(self) -> Result<ClientConfig, ApiError> {
        let url = required("url", self.url)?;
        let token_path = required("token_path", self.token_path)?;

        Ok(ClientConfig {
            url,
            token_path,
            credentials: ClientCredentials {
                client_id: self.client_id,
                client_secret: self.client_secret,
                auth_method: self.auth_method,
            },
            scope: self.scope,
            transport_timeout: self.transport_timeout,
            token_manager: self.token_manager,
        })
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, ApiError> {
    value.filter(|v| !v.is_empty()).ok_or_else(|| {
        ApiError::Configuration(ConfigurationError::MissingRequired {
            field: field.to_string(),
        })
    })
}

impl ClientConfig {
    /// Configuration from `API_CLIENT_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        ClientConfigBuilder::from_env().build()
    }
}

/// Create a new client configuration builder.
pub fn oauth2_client_config() -> ClientConfigBuilder {
    ClientConfigBuilder::new()
}
