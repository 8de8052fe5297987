//! Token Lifecycle Manager
//!
//! Owns the in-memory access token and drives the session state machine:
//! token acquisition for the password and refresh-token grants, the
//! scheduled silent refresh, failure recovery and logout. Status changes are
//! announced on the login status stream.
//!
//! Every acquisition takes a new attempt generation. With
//! [`TokenManagerConfig::discard_stale_attempts`] set, a completion whose
//! generation was overtaken by a newer acquisition or by a logout leaves the
//! session untouched. Refresh token writes and deletes run one at a time
//! and are skipped once their generation is stale, so a logout or a newer
//! acquisition is never undone by an older store write.
//!
//! [`TokenManagerConfig::discard_stale_attempts`]: crate::types::TokenManagerConfig::discard_stale_attempts

use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::core::{HttpMethod, HttpRequest, HttpTransport};
use crate::error::{create_error_from_response, ApiError};
use crate::resilience::{with_timeout, RetryExecutor};
use crate::token::{LoginStatusStream, RefreshTimer, RefreshTokenStore, StatusPublisher};
use crate::types::{
    AccessToken, ClientAuthMethod, ClientConfig, HttpOptions, LoginStatus, TokenRequest,
    TokenResponse,
};

struct ManagerInner<T, S> {
    config: Arc<ClientConfig>,
    transport: Arc<T>,
    store: Arc<S>,
    retry: RetryExecutor,
    status: StatusPublisher,
    access_token: Mutex<Option<AccessToken>>,
    timer: RefreshTimer,
    generation: AtomicU64,
    store_lock: tokio::sync::Mutex<()>,
}

impl<T, S> ManagerInner<T, S> {
    fn access_token(&self) -> MutexGuard<'_, Option<AccessToken>> {
        self.access_token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.config.token_manager.discard_stale_attempts
            && self.generation.load(Ordering::SeqCst) != generation
    }
}

/// Session token lifecycle. Cheap to clone; clones share one session.
pub struct TokenLifecycleManager<T, S> {
    inner: Arc<ManagerInner<T, S>>,
}

impl<T, S> Clone for TokenLifecycleManager<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, S> TokenLifecycleManager<T, S>
where
    T: HttpTransport + 'static,
    S: RefreshTokenStore + 'static,
{
    pub fn new(config: Arc<ClientConfig>, transport: Arc<T>, store: Arc<S>) -> Self {
        let retry = RetryExecutor::new(config.token_manager.retry.clone());
        Self {
            inner: Arc::new(ManagerInner {
                config,
                transport,
                store,
                retry,
                status: StatusPublisher::new(),
                access_token: Mutex::new(None),
                timer: RefreshTimer::new(),
                generation: AtomicU64::new(0),
                store_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Restore the session from the stored refresh token, if there is one.
    /// The outcome is only reported on the status stream.
    pub async fn initialize(&self) {
        if let Err(error) = self.refresh().await {
            debug!(error = %error, "session not restored");
        }
    }

    /// Silent refresh: exchange the stored refresh token for a new access
    /// token. Without a stored token the session becomes unauthenticated
    /// and no request is sent.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let generation = self.inner.generation.load(Ordering::SeqCst);

        let stored = match self.inner.store.get().await {
            Ok(stored) => stored,
            Err(error) => {
                warn!(error = %error, "failed to read refresh token, treating as absent");
                None
            }
        };

        let Some(refresh_token) = stored else {
            if self.inner.is_stale(generation) {
                return Err(ApiError::Superseded);
            }
            self.clear_session();
            self.inner.status.publish(LoginStatus::NotAuthenticated);
            debug!("no refresh token stored");
            return Err(ApiError::NoRefreshToken);
        };

        let credentials = &self.inner.config.credentials;
        let request = TokenRequest::RefreshToken {
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            refresh_token: SecretString::new(refresh_token),
        };

        self.acquire(request).await.map(|_| ())
    }

    /// Start a password-grant acquisition and return immediately. The
    /// outcome is only reported on the status stream.
    pub fn login(&self, username: impl Into<String>, password: impl Into<String>) -> JoinHandle<()> {
        let manager = self.clone();
        let username = username.into();
        let password = SecretString::new(password.into());
        tokio::spawn(async move {
            if let Err(error) = manager.authenticate_secret(username, password).await {
                debug!(error = %error, "login did not complete");
            }
        })
    }

    /// Password-grant acquisition observed by the caller.
    pub async fn authenticate(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<(), ApiError> {
        self.authenticate_secret(username.into(), SecretString::new(password.into()))
            .await
    }

    async fn authenticate_secret(
        &self,
        username: String,
        password: SecretString,
    ) -> Result<(), ApiError> {
        let config = &self.inner.config;
        let request = TokenRequest::Password {
            client_id: config.credentials.client_id.clone(),
            client_secret: config.credentials.client_secret.clone(),
            scope: config.scope.clone(),
            username,
            password,
        };

        self.acquire(request).await.map(|_| ())
    }

    /// Run one token acquisition: status goes to `Unknown`, the token
    /// request is sent with the configured retries inside the configured
    /// timeout, and the session is updated from the outcome.
    pub async fn acquire(&self, request: TokenRequest) -> Result<TokenResponse, ApiError> {
        let settings = &self.inner.config.token_manager;
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.status.publish(LoginStatus::Unknown);

        info!(
            grant_type = request.grant_type().as_str(),
            generation, "requesting token"
        );

        let result = with_timeout(
            Some(settings.token_timeout),
            self.inner
                .retry
                .execute(settings.token_retries, || self.send_token_request(&request)),
        )
        .await;

        if self.inner.is_stale(generation) {
            debug!(generation, "discarding superseded token response");
            return Err(ApiError::Superseded);
        }

        match result {
            Ok(response) => {
                self.apply_token(&response);
                info!(
                    grant_type = request.grant_type().as_str(),
                    expires_in = response.expires_in,
                    "authenticated"
                );
                self.persist_refresh_token(generation, &request, &response)
                    .await;
                Ok(response)
            }
            Err(error) => {
                warn!(
                    grant_type = request.grant_type().as_str(),
                    error = %error,
                    code = error.error_code(),
                    "token request failed"
                );
                self.clear_session();
                self.inner.status.publish(LoginStatus::NotAuthenticated);
                self.delete_refresh_token(generation).await;
                Err(error)
            }
        }
    }

    /// End the session: status and in-memory token are cleared before the
    /// first suspension point, then the stored refresh token is deleted.
    pub async fn logout(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.status.publish(LoginStatus::NotAuthenticated);
        self.clear_session();
        info!("logged out");
        self.delete_refresh_token(generation).await;
    }

    /// Cancel the pending scheduled refresh.
    pub fn dispose(&self) {
        if self.inner.timer.disarm() {
            debug!("scheduled refresh cancelled");
        }
    }

    /// Stream of status changes, starting with the current value.
    pub fn login_status(&self) -> LoginStatusStream {
        self.inner.status.subscribe()
    }

    pub fn current_status(&self) -> LoginStatus {
        self.inner.status.current()
    }

    /// `Authorization` header value for the token held right now.
    pub fn authorization_header(&self) -> Option<String> {
        self.inner
            .access_token()
            .as_ref()
            .map(AccessToken::authorization_header)
    }

    /// Request options able to attach the session token on request. The
    /// token is read when `set_authorization` is called, not here.
    pub fn http_options(&self) -> HttpOptions {
        let weak: Weak<ManagerInner<T, S>> = Arc::downgrade(&self.inner);
        HttpOptions::with_session(move || {
            let inner = weak.upgrade()?;
            let header = inner
                .access_token()
                .as_ref()
                .map(AccessToken::authorization_header);
            header
        })
    }

    /// When the scheduled silent refresh fires, if one is pending.
    pub fn refresh_deadline(&self) -> Option<Instant> {
        self.inner.timer.deadline()
    }

    async fn send_token_request(&self, request: &TokenRequest) -> Result<TokenResponse, ApiError> {
        let config = &self.inner.config;
        let url = config.token_url();
        let auth_method = config.credentials.auth_method;

        let mut http_request = HttpRequest::new(HttpMethod::Post, url.clone());
        http_request.headers.insert(
            "content-type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        http_request
            .headers
            .insert("accept".to_string(), "application/json".to_string());

        if auth_method == ClientAuthMethod::ClientSecretBasic {
            let secret = request
                .client_secret()
                .map(|s| s.expose_secret().as_str())
                .unwrap_or_default();
            let credentials = format!("{}:{}", request.client_id(), secret);
            let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
            http_request
                .headers
                .insert("authorization".to_string(), format!("Basic {}", encoded));
        }

        http_request.body = Some(
            request.to_form_body(auth_method == ClientAuthMethod::ClientSecretPost)?,
        );

        let response = self.inner.transport.send(http_request).await?;

        if !response.is_success() {
            return Err(create_error_from_response(
                &url,
                response.status,
                &response.status_text,
                &response.body,
            )
            .into());
        }

        serde_json::from_str(&response.body).map_err(|e| ApiError::InvalidResponse {
            message: e.to_string(),
        })
    }

    fn apply_token(&self, response: &TokenResponse) {
        *self.inner.access_token() = Some(AccessToken::from_response(response));

        match response.expires_in {
            Some(expires_in) => {
                let delay = refresh_delay(expires_in, self.inner.config.token_manager.refresh_margin);
                self.schedule_refresh(delay);
            }
            None => {
                self.inner.timer.disarm();
            }
        }

        self.inner.status.publish(LoginStatus::Authenticated);
    }

    fn schedule_refresh(&self, delay: Duration) {
        let weak: Weak<ManagerInner<T, S>> = Arc::downgrade(&self.inner);
        self.inner.timer.arm(delay, move || {
            if let Some(inner) = weak.upgrade() {
                let manager = TokenLifecycleManager { inner };
                tokio::spawn(async move {
                    debug!("scheduled refresh firing");
                    if let Err(error) = manager.refresh().await {
                        debug!(error = %error, "scheduled refresh did not complete");
                    }
                });
            }
        });
        debug!(delay_secs = delay.as_secs(), "refresh scheduled");
    }

    fn clear_session(&self) {
        *self.inner.access_token() = None;
        self.inner.timer.disarm();
    }

    async fn persist_refresh_token(
        &self,
        generation: u64,
        request: &TokenRequest,
        response: &TokenResponse,
    ) {
        let token = response
            .refresh_token
            .as_deref()
            .or_else(|| request.refresh_token());

        let _guard = self.inner.store_lock.lock().await;
        if self.inner.is_stale(generation) {
            debug!(generation, "skipping refresh token write for superseded attempt");
            return;
        }

        match token {
            Some(token) => {
                if let Err(error) = self.inner.store.set(token).await {
                    warn!(error = %error, "failed to persist refresh token");
                }
            }
            None => debug!("token response carried no refresh token"),
        }
    }

    async fn delete_refresh_token(&self, generation: u64) {
        let _guard = self.inner.store_lock.lock().await;
        if self.inner.is_stale(generation) {
            debug!(generation, "skipping refresh token delete for superseded attempt");
            return;
        }
        if let Err(error) = self.inner.store.delete().await {
            warn!(error = %error, "failed to delete refresh token");
        }
    }
}

/// Delay before the silent refresh: `expires_in - margin`, clamped at zero.
pub fn refresh_delay(expires_in: u64, margin: Duration) -> Duration {
    Duration::from_secs(expires_in).saturating_sub(margin)
}
