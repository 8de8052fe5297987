//! Token Types
//!
//! OAuth2 token request/response types for the password and refresh-token grants.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ConfigurationError};

/// Grant type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantType {
    #[serde(rename = "password")]
    Password,
    #[serde(rename = "refresh_token")]
    RefreshToken,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::RefreshToken => "refresh_token",
        }
    }
}

/// Body of a token endpoint call. Exactly one grant per request.
#[derive(Clone)]
pub enum TokenRequest {
    /// Resource owner password credentials grant.
    Password {
        client_id: String,
        client_secret: Option<SecretString>,
        scope: String,
        username: String,
        password: SecretString,
    },
    /// Refresh token grant.
    RefreshToken {
        client_id: String,
        client_secret: Option<SecretString>,
        refresh_token: SecretString,
    },
}

impl TokenRequest {
    pub fn grant_type(&self) -> GrantType {
        match self {
            Self::Password { .. } => GrantType::Password,
            Self::RefreshToken { .. } => GrantType::RefreshToken,
        }
    }

    pub fn client_id(&self) -> &str {
        match self {
            Self::Password { client_id, .. } | Self::RefreshToken { client_id, .. } => client_id,
        }
    }

    pub fn client_secret(&self) -> Option<&SecretString> {
        match self {
            Self::Password { client_secret, .. } | Self::RefreshToken { client_secret, .. } => {
                client_secret.as_ref()
            }
        }
    }

    /// Refresh token carried by a refresh grant.
    pub fn refresh_token(&self) -> Option<&str> {
        match self {
            Self::RefreshToken { refresh_token, .. } => Some(refresh_token.expose_secret()),
            Self::Password { .. } => None,
        }
    }

    /// Form fields of the active grant. Client credentials are included only
    /// when they travel in the body.
    pub fn form_params(&self, include_client_credentials: bool) -> Vec<(&'static str, String)> {
        let mut params = vec![("grant_type", self.grant_type().as_str().to_string())];

        if include_client_credentials {
            params.push(("client_id", self.client_id().to_string()));
            if let Some(secret) = self.client_secret() {
                params.push(("client_secret", secret.expose_secret().to_string()));
            }
        }

        match self {
            Self::Password {
                scope,
                username,
                password,
                ..
            } => {
                if !scope.is_empty() {
                    params.push(("scope", scope.clone()));
                }
                params.push(("username", username.clone()));
                params.push(("password", password.expose_secret().to_string()));
            }
            Self::RefreshToken { refresh_token, .. } => {
                params.push(("refresh_token", refresh_token.expose_secret().to_string()));
            }
        }

        params
    }

    /// `application/x-www-form-urlencoded` body.
    pub fn to_form_body(&self, include_client_credentials: bool) -> Result<String, ApiError> {
        serde_urlencoded::to_string(self.form_params(include_client_credentials)).map_err(|e| {
            ApiError::Configuration(ConfigurationError::InvalidConfig {
                message: format!("token request is not form-encodable: {}", e),
            })
        })
    }
}

impl std::fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password {
                client_id,
                scope,
                username,
                ..
            } => f
                .debug_struct("Password")
                .field("client_id", client_id)
                .field("client_secret", &"[REDACTED]")
                .field("scope", scope)
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::RefreshToken { client_id, .. } => f
                .debug_struct("RefreshToken")
                .field("client_id", client_id)
                .field("client_secret", &"[REDACTED]")
                .field("refresh_token", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Token response from authorization server.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Token type (usually "Bearer").
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Expires in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// In-memory access token. Never persisted.
#[derive(Clone)]
pub struct AccessToken {
    value: SecretString,
    /// Token type.
    pub token_type: String,
    /// Expiration time.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(value: String, token_type: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            value: SecretString::new(value),
            token_type,
            expires_at,
        }
    }

    /// Create from token response, stamping the expiry relative to now.
    pub fn from_response(response: &TokenResponse) -> Self {
        let expires_at = response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs as i64));
        Self::new(
            response.access_token.clone(),
            response.token_type.clone(),
            expires_at,
        )
    }

    /// Format as Authorization header value.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.value.expose_secret())
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
