//! Refresh Timer
//!
//! Cancellable one-shot timer. At most one callback is pending: arming
//! aborts the previous one, and dropping the timer aborts it too.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

struct ArmedTimer {
    handle: JoinHandle<()>,
    deadline: Instant,
}

/// Pending scheduled refresh.
#[derive(Default)]
pub struct RefreshTimer {
    slot: Mutex<Option<ArmedTimer>>,
}

impl RefreshTimer {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<ArmedTimer>> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `on_fire` after `delay`, replacing any pending callback.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F>(&self, delay: Duration, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            on_fire();
        });

        let previous = self.slot().replace(ArmedTimer { handle, deadline });
        if let Some(previous) = previous {
            previous.handle.abort();
        }
    }

    /// Cancel the pending callback. Returns whether one was pending.
    pub fn disarm(&self) -> bool {
        match self.slot().take() {
            Some(armed) => {
                let pending = !armed.handle.is_finished();
                armed.handle.abort();
                pending
            }
            None => false,
        }
    }

    /// When the pending callback fires, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.slot()
            .as_ref()
            .filter(|armed| !armed.handle.is_finished())
            .map(|armed| armed.deadline)
    }

    pub fn is_armed(&self) -> bool {
        self.deadline().is_some()
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        if let Some(armed) = self.slot().take() {
            armed.handle.abort();
        }
    }
}
