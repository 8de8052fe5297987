//! API Client
//!
//! High-level client combining the session token lifecycle with a REST
//! façade over the configured base URL.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::core::{HttpMethod, HttpRequest, HttpTransport, ReqwestHttpTransport};
use crate::error::{create_error_from_response, format_error, ApiError};
use crate::resilience::{with_timeout, RetryExecutor};
use crate::token::{
    InMemoryRefreshTokenStore, LoginStatusStream, RefreshTokenStore, TokenLifecycleManager,
};
use crate::types::{ClientConfig, HttpOptions, LoginStatus, RequestOptions};

/// API client for an OAuth2-protected REST service.
pub struct ApiClient<
    T: HttpTransport + 'static = ReqwestHttpTransport,
    S: RefreshTokenStore + 'static = InMemoryRefreshTokenStore,
> {
    config: Arc<ClientConfig>,
    transport: Arc<T>,
    tokens: TokenLifecycleManager<T, S>,
    retry: RetryExecutor,
}

impl ApiClient<ReqwestHttpTransport, InMemoryRefreshTokenStore> {
    /// Create a new client with default implementations.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Self::with_store(config, InMemoryRefreshTokenStore::new())
    }
}

impl<S: RefreshTokenStore + 'static> ApiClient<ReqwestHttpTransport, S> {
    /// Create a client persisting the refresh token in `store`.
    pub fn with_store(config: ClientConfig, store: S) -> Result<Self, ApiError> {
        let transport = ReqwestHttpTransport::with_timeout(config.transport_timeout)?;
        Ok(Self::with_components(config, transport, store))
    }
}

impl<T, S> ApiClient<T, S>
where
    T: HttpTransport + 'static,
    S: RefreshTokenStore + 'static,
{
    /// Create a client with custom implementations.
    pub fn with_components(config: ClientConfig, transport: T, store: S) -> Self {
        let config = Arc::new(config);
        let transport = Arc::new(transport);
        let tokens = TokenLifecycleManager::new(config.clone(), transport.clone(), Arc::new(store));
        let retry = RetryExecutor::new(config.token_manager.retry.clone());

        Self {
            config,
            transport,
            tokens,
            retry,
        }
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Token lifecycle manager backing this client.
    pub fn tokens(&self) -> &TokenLifecycleManager<T, S> {
        &self.tokens
    }

    // ========== Session ==========

    /// Try to restore the session from the stored refresh token.
    pub async fn initialize(&self) {
        self.tokens.initialize().await
    }

    /// Start a password login in the background. The outcome is only
    /// observable on [`login_status`](Self::login_status).
    pub fn login(&self, username: impl Into<String>, password: impl Into<String>) {
        self.tokens.login(username, password);
    }

    /// Password login, awaiting the outcome.
    pub async fn authenticate(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<(), ApiError> {
        self.tokens.authenticate(username, password).await
    }

    /// Silent refresh with the stored refresh token, awaiting the outcome.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        self.tokens.refresh().await
    }

    pub async fn logout(&self) {
        self.tokens.logout().await
    }

    /// Login status changes, starting with the current value.
    pub fn login_status(&self) -> LoginStatusStream {
        self.tokens.login_status()
    }

    pub fn current_status(&self) -> LoginStatus {
        self.tokens.current_status()
    }

    /// Per-request options bound to the current session.
    pub fn http_options(&self) -> HttpOptions {
        self.tokens.http_options()
    }

    // ========== REST ==========

    /// GET `path`. Retries 5 times unless `request_options` says otherwise.
    pub async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        options: Option<HttpOptions>,
        request_options: Option<RequestOptions>,
    ) -> Result<R, ApiError> {
        self.request(HttpMethod::Get, path, None, options, request_options)
            .await
    }

    /// POST `body` as JSON to `path`. Times out after 30 s unless
    /// `request_options` says otherwise.
    pub async fn post<B, R>(
        &self,
        path: &str,
        body: &B,
        options: Option<HttpOptions>,
        request_options: Option<RequestOptions>,
    ) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = encode_body(body)?;
        self.request(HttpMethod::Post, path, Some(body), options, request_options)
            .await
    }

    /// PATCH `body` as JSON to `path`. Times out after 30 s unless
    /// `request_options` says otherwise.
    pub async fn patch<B, R>(
        &self,
        path: &str,
        body: &B,
        options: Option<HttpOptions>,
        request_options: Option<RequestOptions>,
    ) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = encode_body(body)?;
        self.request(HttpMethod::Patch, path, Some(body), options, request_options)
            .await
    }

    /// DELETE `path`. Retries once unless `request_options` says otherwise.
    pub async fn delete<R: DeserializeOwned>(
        &self,
        path: &str,
        options: Option<HttpOptions>,
        request_options: Option<RequestOptions>,
    ) -> Result<R, ApiError> {
        self.request(HttpMethod::Delete, path, None, options, request_options)
            .await
    }

    #[instrument(skip(self, method, body, options, request_options), fields(method = method.as_str()))]
    async fn request<R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<String>,
        options: Option<HttpOptions>,
        request_options: Option<RequestOptions>,
    ) -> Result<R, ApiError> {
        let policy = request_options.unwrap_or_else(|| RequestOptions::for_method(method));
        let options = options.unwrap_or_default();
        let url = self.config.endpoint(path);

        let mut request = HttpRequest::new(method, url.clone());
        request.timeout = policy.timeout;
        request.query = options.query_pairs();
        request
            .headers
            .insert("accept".to_string(), "application/json".to_string());
        if let Some(authorization) = options.authorization() {
            request
                .headers
                .insert("authorization".to_string(), authorization.to_string());
        }
        if let Some(body) = body {
            request
                .headers
                .insert("content-type".to_string(), "application/json".to_string());
            request.body = Some(body);
        }

        let result = with_timeout(
            policy.timeout,
            self.retry
                .execute(policy.retries(), || self.send_once(&url, request.clone())),
        )
        .await;

        match result {
            Ok(body) => parse_body(&body),
            Err(error) => {
                warn!(
                    url = %url,
                    code = error.error_code(),
                    error = %format_error(&error),
                    "request failed"
                );
                Err(error)
            }
        }
    }

    async fn send_once(&self, url: &str, request: HttpRequest) -> Result<String, ApiError> {
        let response = self.transport.send(request).await?;
        debug!(status = response.status, "response received");

        if !response.is_success() {
            return Err(create_error_from_response(
                url,
                response.status,
                &response.status_text,
                &response.body,
            )
            .into());
        }

        Ok(response.body)
    }
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> Result<String, ApiError> {
    serde_json::to_string(body).map_err(|e| ApiError::InvalidRequest {
        message: e.to_string(),
    })
}

/// Decode a JSON body; an empty body reads as `null`.
fn parse_body<R: DeserializeOwned>(body: &str) -> Result<R, ApiError> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|e| ApiError::InvalidResponse {
        message: e.to_string(),
    })
}

/// Create a client with default implementations.
pub fn api_client(config: ClientConfig) -> Result<ApiClient, ApiError> {
    ApiClient::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::oauth2_client_config;
    use crate::core::{HttpResponse, MockHttpTransport};
    use crate::resilience::RetryConfig;
    use crate::token::MockRefreshTokenStore;
    use std::time::Duration;

    fn test_client() -> ApiClient<MockHttpTransport, MockRefreshTokenStore> {
        let config = oauth2_client_config()
            .url("https://api.example.com")
            .token_path("oauth/token")
            .client_id("app")
            .retry_config(RetryConfig {
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                ..Default::default()
            })
            .build()
            .unwrap();
        ApiClient::with_components(config, MockHttpTransport::new(), MockRefreshTokenStore::new())
    }

    #[test]
    fn test_parse_empty_body_as_null() {
        let unit: () = parse_body("").unwrap();
        assert_eq!(unit, ());
        let missing: Option<u32> = parse_body("  ").unwrap();
        assert_eq!(missing, None);
        let value: serde_json::Value = parse_body(r#"{"a":1}"#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_parse_invalid_body() {
        let result: Result<serde_json::Value, _> = parse_body("<html>");
        assert!(matches!(result, Err(ApiError::InvalidResponse { .. })));
    }

    #[tokio::test]
    async fn test_get_joins_path_and_sends_no_authorization() {
        let client = test_client();
        client
            .transport
            .queue_json_response(200, &serde_json::json!({"id": 7}));

        let value: serde_json::Value = client.get("/my/data/7", None, None).await.unwrap();

        assert_eq!(value["id"], 7);
        let request = client.transport.get_last_request().unwrap();
        assert_eq!(request.url, "https://api.example.com/my/data/7");
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.header("authorization"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_retries_five_times_by_default() {
        let client = test_client();
        client
            .transport
            .set_default_response(HttpResponse::new(503, ""));

        let error = client
            .get::<serde_json::Value>("items", None, None)
            .await
            .unwrap_err();

        assert_eq!(client.transport.request_count(), 6);
        assert_eq!(
            error.to_string(),
            "Http failure response for https://api.example.com/items: 503 Service Unavailable"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_retries_once_by_default() {
        let client = test_client();
        client.transport.queue_failure("connection reset");
        client.transport.queue_response(HttpResponse::new(204, ""));

        let () = client.delete("items/1", None, None).await.unwrap();

        assert_eq!(client.transport.request_count(), 2);
        assert_eq!(client.transport.get_requests()[1].method, HttpMethod::Delete);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let client = test_client();
        client.transport.set_default_response(HttpResponse::new(404, ""));

        let error = client
            .get::<serde_json::Value>("missing", None, None)
            .await
            .unwrap_err();

        assert_eq!(client.transport.request_count(), 1);
        assert_eq!(format_error(&error), "HTTP 404 Not Found");
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_times_out_after_thirty_seconds() {
        let client = test_client();
        client
            .transport
            .queue_delayed_response(Duration::from_secs(31), HttpResponse::new(200, "{}"));

        let error = client
            .post::<_, serde_json::Value>("items", &serde_json::json!({"name": "x"}), None, None)
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "Request timed out after 30000 ms");
        let request = client.transport.get_last_request().unwrap();
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.body.as_deref(), Some(r#"{"name":"x"}"#));
    }

    #[tokio::test]
    async fn test_call_timeout_reaches_transport() {
        let client = test_client();
        client.transport.set_default_response(HttpResponse::new(200, "{}"));

        let _: serde_json::Value = client
            .post("items", &serde_json::json!({}), None, None)
            .await
            .unwrap();
        assert_eq!(
            client.transport.get_last_request().unwrap().timeout,
            Some(Duration::from_secs(30))
        );

        let _: serde_json::Value = client.get("items", None, None).await.unwrap();
        assert_eq!(client.transport.get_last_request().unwrap().timeout, None);

        let _: serde_json::Value = client
            .get(
                "items",
                None,
                Some(RequestOptions::new().timeout(Duration::from_secs(90))),
            )
            .await
            .unwrap();
        assert_eq!(
            client.transport.get_last_request().unwrap().timeout,
            Some(Duration::from_secs(90))
        );
    }

    #[tokio::test]
    async fn test_patch_sends_json_body() {
        let client = test_client();
        client
            .transport
            .queue_json_response(200, &serde_json::json!({"name": "y"}));

        let value: serde_json::Value = client
            .patch("items/1", &serde_json::json!({"name": "y"}), None, None)
            .await
            .unwrap();

        assert_eq!(value["name"], "y");
        assert_eq!(
            client.transport.get_last_request().unwrap().method,
            HttpMethod::Patch
        );
    }

    #[tokio::test]
    async fn test_caller_options_override_defaults() {
        let client = test_client();
        client.transport.set_default_response(HttpResponse::new(500, ""));

        let _ = client
            .get::<serde_json::Value>("items", None, Some(RequestOptions::new().retry(0)))
            .await;

        assert_eq!(client.transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_query_params_and_authorization_opt_in() {
        let client = test_client();
        client.transport.queue_response(HttpResponse::new(
            200,
            r#"{"access_token":"at-1","token_type":"Bearer","expires_in":3600}"#,
        ));
        client.authenticate("alice", "pw").await.unwrap();
        client.transport.queue_json_response(200, &serde_json::json!([]));

        let options = client
            .http_options()
            .set_authorization()
            .set_param("page", 2)
            .set_param("active", true);
        let _: serde_json::Value = client.get("items", Some(options), None).await.unwrap();

        let request = client.transport.get_last_request().unwrap();
        assert_eq!(request.header("authorization"), Some("Bearer at-1"));
        assert_eq!(
            request.query,
            vec![
                ("active".to_string(), "true".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
    }
}
