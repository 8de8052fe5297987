//! OAuth2 API Client
//!
//! REST client for an OAuth2-protected API with session management built on
//! the resource owner password and refresh-token grants.
//!
//! # Features
//!
//! - Password login and silent refresh against a token endpoint
//! - Login status stream (`Unknown`, `Authenticated`, `NotAuthenticated`)
//! - Refresh scheduled ahead of access token expiry
//! - Persistent refresh token storage (in-memory or file)
//! - GET/POST/PATCH/DELETE façade with per-verb retry and timeout defaults
//! - One human-readable message per failure
//!
//! # Example
//!
//! ```rust,ignore
//! use oauth2_api_client::{oauth2_client_config, ApiClient, LoginStatus, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = oauth2_client_config()
//!         .url("https://api.example.com")
//!         .token_path("oauth/token")
//!         .client_id("my-app")
//!         .client_secret("my-secret")
//!         .scope("api")
//!         .build()?;
//!
//!     let client = ApiClient::new(config)?;
//!     client.initialize().await;
//!
//!     let mut status = client.login_status();
//!     client.login("alice", "password");
//!     status.wait_for(LoginStatus::Authenticated).await;
//!
//!     let options = client.http_options().set_authorization().set_param("page", 1);
//!     let items: serde_json::Value = client.get("items", Some(options), None).await?;
//!     println!("{items}");
//!
//!     client.logout().await;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: configuration, login status, token grants and request options
//! - `error`: error hierarchy and the shared message formatter
//! - `core`: HTTP transport
//! - `resilience`: retry and timeout wrapping
//! - `token`: refresh token store, status stream, refresh timer, lifecycle manager
//! - `builders`: fluent configuration builder
//! - `client`: high-level client combining session and REST calls

pub mod builders;
pub mod client;
pub mod core;
pub mod error;
pub mod resilience;
pub mod token;
pub mod types;

// Re-export main client
pub use client::{api_client, ApiClient};

// Re-export builders
pub use builders::{oauth2_client_config, ClientConfigBuilder};

// Re-export errors
pub use error::{
    create_error_from_response, format_error, parse_error_document, ApiError, ApiResult,
    ConfigurationError, ErrorDetail, ErrorDocument, HttpStatusError, StorageError,
};

// Re-export types
pub use types::{
    // Config
    join_url, ClientAuthMethod, ClientConfig, ClientCredentials, TokenManagerConfig,
    // Status
    LoginStatus,
    // Token
    AccessToken, GrantType, TokenRequest, TokenResponse,
    // Options
    HttpOptions, RequestOptions,
};

// Re-export core components
pub use crate::core::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport, ReqwestHttpTransport,
};

// Re-export token management
pub use token::{
    FileRefreshTokenStore, InMemoryRefreshTokenStore, LoginStatusStream, MockRefreshTokenStore,
    RefreshTokenStore, StoreOperation, TokenLifecycleManager,
};

// Re-export resilience
pub use resilience::{RetryConfig, RetryExecutor, DEFAULT_RETRY_CONFIG};
