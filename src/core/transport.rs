//! HTTP Transport
//!
//! HTTP client interface and implementations. The transport only moves bytes:
//! any status code comes back as an [`HttpResponse`], and only failures that
//! happen before a response arrives are errors.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::instrument;

use crate::error::{ApiError, ConfigurationError};

/// HTTP request definition.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request URL, without query string.
    pub url: String,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Option<String>,
    /// Per-attempt timeout.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Header value, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// HTTP response definition.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Status text.
    pub status_text: String,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    /// Response with the canonical reason phrase for `status`.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: canonical_reason(status).to_string(),
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn canonical_reason(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

/// HTTP transport interface (for dependency injection).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Default reqwest-based HTTP transport.
pub struct ReqwestHttpTransport {
    client: reqwest::Client,
    default_timeout: Option<Duration>,
}

impl ReqwestHttpTransport {
    /// Create new transport; attempts without their own timeout never time out.
    pub fn new() -> Result<Self, ApiError> {
        Self::with_timeout(None)
    }

    /// Create transport with a per-attempt timeout for requests that carry
    /// none. A request's own timeout always takes precedence.
    pub fn with_timeout(default_timeout: Option<Duration>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            ApiError::Configuration(ConfigurationError::HttpClient {
                message: e.to_string(),
            })
        })?;

        Ok(Self {
            client,
            default_timeout,
        })
    }

    fn build_url(request: &HttpRequest) -> Result<url::Url, ApiError> {
        let mut url = url::Url::parse(&request.url).map_err(|e| ApiError::Transport {
            message: format!("Invalid URL {}: {}", request.url, e),
        })?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    #[instrument(skip(self, request), fields(method = request.method.as_str(), url = %request.url))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let timeout = request.timeout.or(self.default_timeout);
        let url = Self::build_url(&request)?;

        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut req_builder = self.client.request(method, url);

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        if let Some(timeout) = timeout {
            req_builder = req_builder.timeout(timeout);
        }

        let response = req_builder.send().await.map_err(|e| match timeout {
            Some(timeout) if e.is_timeout() => ApiError::Timeout { timeout },
            _ => ApiError::Transport {
                message: e.to_string(),
            },
        })?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("")
            .to_string();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.to_string().to_lowercase(), v.to_string());
            }
        }

        let body = response.text().await.map_err(|e| ApiError::Transport {
            message: e.to_string(),
        })?;

        Ok(HttpResponse {
            status,
            status_text,
            headers,
            body,
        })
    }
}

struct MockReply {
    result: Result<HttpResponse, String>,
    delay: Option<Duration>,
}

/// Mock HTTP transport for testing. Replies are served in queue order.
#[derive(Default)]
pub struct MockHttpTransport {
    replies: Mutex<VecDeque<MockReply>>,
    request_history: Mutex<Vec<HttpRequest>>,
    default_response: Mutex<Option<HttpResponse>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockHttpTransport {
    /// Create new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, result: Result<HttpResponse, String>, delay: Option<Duration>) -> &Self {
        lock(&self.replies).push_back(MockReply { result, delay });
        self
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: HttpResponse) -> &Self {
        self.push(Ok(response), None)
    }

    /// Queue a response that arrives after `delay`.
    pub fn queue_delayed_response(&self, delay: Duration, response: HttpResponse) -> &Self {
        self.push(Ok(response), Some(delay))
    }

    /// Queue a JSON response.
    pub fn queue_json_response<T: serde::Serialize>(&self, status: u16, body: &T) -> &Self {
        let mut response = HttpResponse::new(status, serde_json::to_string(body).unwrap_or_default());
        response
            .headers
            .insert("content-type".to_string(), "application/json".to_string());
        self.queue_response(response)
    }

    /// Queue a network failure.
    pub fn queue_failure(&self, message: impl Into<String>) -> &Self {
        self.push(Err(message.into()), None)
    }

    /// Set default response when queue is empty.
    pub fn set_default_response(&self, response: HttpResponse) -> &Self {
        *lock(&self.default_response) = Some(response);
        self
    }

    /// Get request history.
    pub fn get_requests(&self) -> Vec<HttpRequest> {
        lock(&self.request_history).clone()
    }

    /// Get last request.
    pub fn get_last_request(&self) -> Option<HttpRequest> {
        lock(&self.request_history).last().cloned()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.request_history).len()
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        lock(&self.request_history).push(request);

        let reply = lock(&self.replies).pop_front();
        let reply = match reply {
            Some(reply) => reply,
            None => MockReply {
                result: lock(&self.default_response)
                    .clone()
                    .ok_or_else(|| "No mock response available".to_string()),
                delay: None,
            },
        };

        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }

        reply
            .result
            .map_err(|message| ApiError::Transport { message })
    }
}
