//! Request Options
//!
//! Per-call HTTP options (authorization opt-in, query parameters) and the
//! retry/timeout policy applied to each verb.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::core::HttpMethod;

type SessionAuthorization = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Per-request HTTP options.
///
/// Obtained from the token lifecycle manager so that
/// [`set_authorization`](HttpOptions::set_authorization) can attach the
/// access token held when it is called. The header is never added implicitly.
#[derive(Clone, Default)]
pub struct HttpOptions {
    session: Option<SessionAuthorization>,
    authorization: Option<String>,
    params: BTreeMap<String, String>,
}

impl HttpOptions {
    /// Options without access to a session; `set_authorization` is a no-op.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_session(
        authorization: impl Fn() -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            session: Some(Arc::new(authorization)),
            ..Self::default()
        }
    }

    /// Attach the session's `Authorization` header, if a token is held now.
    pub fn set_authorization(mut self) -> Self {
        self.authorization = self.session.as_ref().and_then(|session| session());
        self
    }

    /// Set a query parameter. Setting an existing key replaces its value.
    pub fn set_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub(crate) fn query_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl std::fmt::Debug for HttpOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpOptions")
            .field(
                "authorization",
                &self.authorization.as_ref().map(|_| "[REDACTED]"),
            )
            .field("params", &self.params)
            .finish()
    }
}

/// Retry and timeout policy for one call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Number of retries after the first failed attempt. Only transport
    /// failures, timeouts, 408, 429 and 5xx responses are retried; any other
    /// error status fails on the first attempt.
    pub retry: Option<u32>,
    /// Bound on the whole call, retries included.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Default policy of a verb when the caller supplies none.
    pub fn for_method(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::new().retry(DEFAULT_GET_RETRY),
            HttpMethod::Post | HttpMethod::Patch => {
                Self::new().timeout(Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS))
            }
            HttpMethod::Delete => Self::new().retry(DEFAULT_DELETE_RETRY),
        }
    }

    pub(crate) fn retries(&self) -> u32 {
        self.retry.unwrap_or(0)
    }
}

pub const DEFAULT_GET_RETRY: u32 = 5;
pub const DEFAULT_DELETE_RETRY: u32 = 1;
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 30000;
