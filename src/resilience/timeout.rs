//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::ApiError;

/// Bound `future` by `timeout`; `None` leaves it unbounded.
pub async fn with_timeout<T>(
    timeout: Option<Duration>,
    future: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    match timeout {
        Some(duration) => match tokio::time::timeout(duration, future).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout { timeout: duration }),
        },
        None => future.await,
    }
}
