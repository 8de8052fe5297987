//! Resilience
//!
//! Retry and timeout wrapping shared by token acquisition and REST calls.
//! Retries run inside the timeout: a call's timeout bounds all of its attempts.

pub mod retry;
pub mod timeout;

pub use retry::{RetryConfig, RetryExecutor, DEFAULT_RETRY_CONFIG};
pub use timeout::with_timeout;
