//! API Client Error Types
//!
//! Error hierarchy for token acquisition and REST calls. Every failure the
//! client reports is an [`ApiError`]; its `Display` output is the single
//! human-readable message produced by the shared formatter.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Root error type for the API client.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Network failure before any response arrived.
    #[error("{message}")]
    Transport { message: String },

    /// The timeout boundary of a call was exceeded.
    #[error("Request timed out after {} ms", .timeout.as_millis())]
    Timeout { timeout: Duration },

    /// The server answered with a 4xx/5xx status.
    #[error(transparent)]
    Http(#[from] HttpStatusError),

    /// The request body could not be encoded.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The response body could not be decoded.
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Silent refresh found no stored refresh token.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// A newer token acquisition or a logout started while this one was in flight.
    #[error("Token request superseded by a newer attempt")]
    Superseded,
}

impl ApiError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "API_TRANSPORT",
            Self::Timeout { .. } => "API_TIMEOUT",
            Self::Http(e) => e.error_code(),
            Self::InvalidRequest { .. } => "API_INVALID_REQUEST",
            Self::InvalidResponse { .. } => "API_INVALID_RESPONSE",
            Self::Configuration(_) => "API_CONFIG",
            Self::Storage(_) => "API_STORAGE",
            Self::NoRefreshToken => "API_NO_REFRESH_TOKEN",
            Self::Superseded => "API_SUPERSEDED",
        }
    }

    /// Check if another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Http(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Check if the error means the session is no longer valid.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            Self::Http(HttpStatusError::Unauthorized { .. }) | Self::NoRefreshToken
        )
    }

    /// HTTP status code, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http(e) => Some(e.status()),
            _ => None,
        }
    }
}

/// Server-side failure classified by status code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpStatusError {
    /// 422 or 500, optionally carrying the first field-level error detail.
    #[error("{}", format_validation_message(.status, .status_text, .detail))]
    ValidationOrServerError {
        status: u16,
        status_text: String,
        detail: Option<String>,
    },

    #[error("HTTP 401 {status_text}")]
    Unauthorized { status_text: String },

    #[error("HTTP 403 {status_text}")]
    Forbidden { status_text: String },

    #[error("HTTP 404 {status_text}")]
    NotFound { status_text: String },

    #[error("HTTP 412 {status_text}")]
    PreconditionFailed { status_text: String },

    /// Any other status; the message is the transport-level description.
    #[error("{message}")]
    Other {
        status: u16,
        status_text: String,
        message: String,
    },
}

impl HttpStatusError {
    /// HTTP status code.
    pub fn status(&self) -> u16 {
        match self {
            Self::ValidationOrServerError { status, .. } | Self::Other { status, .. } => *status,
            Self::Unauthorized { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::PreconditionFailed { .. } => 412,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ValidationOrServerError { .. } => "API_HTTP_VALIDATION",
            Self::Unauthorized { .. } => "API_HTTP_UNAUTHORIZED",
            Self::Forbidden { .. } => "API_HTTP_FORBIDDEN",
            Self::NotFound { .. } => "API_HTTP_NOT_FOUND",
            Self::PreconditionFailed { .. } => "API_HTTP_PRECONDITION",
            Self::Other { .. } => "API_HTTP_OTHER",
        }
    }

    /// 408, 429 and 5xx may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        let status = self.status();
        status == 408 || status == 429 || status >= 500
    }
}

fn format_validation_message(status: &u16, status_text: &str, detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!("HTTP {} {}: {}", status, status_text, detail),
        None => format!("HTTP {} {}", status, status_text),
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to build HTTP client: {message}")]
    HttpClient { message: String },
}

/// Refresh token store error.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    #[error("Delete failed: {message}")]
    DeleteFailed { message: String },

    #[error("Corrupted data: {message}")]
    CorruptedData { message: String },
}

/// Result type for API client operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Structured error document returned by the API (JSON:API shape).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDocument {
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

/// A single field-level error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Parse a structured error document from an HTTP body.
pub fn parse_error_document(body: &str) -> Option<ErrorDocument> {
    serde_json::from_str(body).ok()
}

/// Classify a 4xx/5xx response.
pub fn create_error_from_response(
    url: &str,
    status: u16,
    status_text: &str,
    body: &str,
) -> HttpStatusError {
    let status_text = status_text.to_string();
    match status {
        422 | 500 => {
            let detail = parse_error_document(body)
                .and_then(|doc| doc.errors.into_iter().next())
                .and_then(|first| first.detail.or(first.title));
            HttpStatusError::ValidationOrServerError {
                status,
                status_text,
                detail,
            }
        }
        401 => HttpStatusError::Unauthorized { status_text },
        403 => HttpStatusError::Forbidden { status_text },
        404 => HttpStatusError::NotFound { status_text },
        412 => HttpStatusError::PreconditionFailed { status_text },
        _ => HttpStatusError::Other {
            status,
            message: format!(
                "Http failure response for {}: {} {}",
                url, status, status_text
            ),
            status_text,
        },
    }
}

/// The shared error formatter: one human-readable message per failure.
pub fn format_error(error: &ApiError) -> String {
    error.to_string()
}
