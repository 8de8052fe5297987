//! Refresh Token Store
//!
//! Durable persistence for the single refresh token of a session. Access
//! tokens are never stored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::error::StorageError;

/// Refresh token storage interface.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Stored refresh token, if any.
    async fn get(&self) -> Result<Option<String>, StorageError>;

    /// Replace the stored refresh token.
    async fn set(&self, token: &str) -> Result<(), StorageError>;

    /// Remove the stored refresh token.
    async fn delete(&self) -> Result<(), StorageError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory refresh token store.
#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    token: Mutex<Option<String>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn get(&self) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.token).clone())
    }

    async fn set(&self, token: &str) -> Result<(), StorageError> {
        *lock(&self.token) = Some(token.to_string());
        Ok(())
    }

    async fn delete(&self) -> Result<(), StorageError> {
        *lock(&self.token) = None;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenFile {
    version: u32,
    refresh_token: String,
    saved_at: DateTime<Utc>,
}

const TOKEN_FILE_VERSION: u32 = 1;

/// File-backed refresh token store (JSON, owner-only permissions on unix).
#[derive(Debug, Clone)]
pub struct FileRefreshTokenStore {
    path: PathBuf,
}

impl FileRefreshTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RefreshTokenStore for FileRefreshTokenStore {
    async fn get(&self) -> Result<Option<String>, StorageError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StorageError::ReadFailed {
                    message: err.to_string(),
                })
            }
        };

        let file: TokenFile =
            serde_json::from_str(&raw).map_err(|e| StorageError::CorruptedData {
                message: e.to_string(),
            })?;
        Ok(Some(file.refresh_token))
    }

    async fn set(&self, token: &str) -> Result<(), StorageError> {
        let write_failed = |e: std::io::Error| StorageError::WriteFailed {
            message: e.to_string(),
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
        }

        let file = TokenFile {
            version: TOKEN_FILE_VERSION,
            refresh_token: token.to_string(),
            saved_at: Utc::now(),
        };
        let serialized =
            serde_json::to_string_pretty(&file).map_err(|e| StorageError::WriteFailed {
                message: e.to_string(),
            })?;

        tokio::fs::write(&self.path, serialized)
            .await
            .map_err(write_failed)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(write_failed)?;
        }

        Ok(())
    }

    async fn delete(&self) -> Result<(), StorageError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::DeleteFailed {
                message: err.to_string(),
            }),
        }
    }
}

/// Store operation recorded by [`MockRefreshTokenStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreOperation {
    Get,
    Set(String),
    Delete,
}

/// Mock refresh token store for testing.
#[derive(Default)]
pub struct MockRefreshTokenStore {
    token: Mutex<Option<String>>,
    history: Mutex<Vec<StoreOperation>>,
    fail_get: Mutex<bool>,
    fail_set: Mutex<bool>,
    fail_delete: Mutex<bool>,
    set_delay: Mutex<Option<Duration>>,
}

impl MockRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the stored token.
    pub fn set_token(&self, token: impl Into<String>) -> &Self {
        *lock(&self.token) = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<String> {
        lock(&self.token).clone()
    }

    pub fn set_fail_get(&self, fail: bool) -> &Self {
        *lock(&self.fail_get) = fail;
        self
    }

    pub fn set_fail_set(&self, fail: bool) -> &Self {
        *lock(&self.fail_set) = fail;
        self
    }

    pub fn set_fail_delete(&self, fail: bool) -> &Self {
        *lock(&self.fail_delete) = fail;
        self
    }

    /// Make `set` wait this long before writing.
    pub fn set_set_delay(&self, delay: Duration) -> &Self {
        *lock(&self.set_delay) = Some(delay);
        self
    }

    /// Operations in call order.
    pub fn history(&self) -> Vec<StoreOperation> {
        lock(&self.history).clone()
    }
}

#[async_trait]
impl RefreshTokenStore for MockRefreshTokenStore {
    async fn get(&self) -> Result<Option<String>, StorageError> {
        lock(&self.history).push(StoreOperation::Get);
        if *lock(&self.fail_get) {
            return Err(StorageError::ReadFailed {
                message: "Mock storage failure".to_string(),
            });
        }
        Ok(lock(&self.token).clone())
    }

    async fn set(&self, token: &str) -> Result<(), StorageError> {
        lock(&self.history).push(StoreOperation::Set(token.to_string()));
        if *lock(&self.fail_set) {
            return Err(StorageError::WriteFailed {
                message: "Mock storage failure".to_string(),
            });
        }
        let delay = *lock(&self.set_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        *lock(&self.token) = Some(token.to_string());
        Ok(())
    }

    async fn delete(&self) -> Result<(), StorageError> {
        lock(&self.history).push(StoreOperation::Delete);
        if *lock(&self.fail_delete) {
            return Err(StorageError::DeleteFailed {
                message: "Mock storage failure".to_string(),
            });
        }
        *lock(&self.token) = None;
        Ok(())
    }
}
