//! Login Status Stream
//!
//! Publish-subscribe channel holding the current [`LoginStatus`] and a list
//! of subscribers. Every subscriber first receives the value current at
//! subscription time, then each later publication in order, without
//! coalescing.

use futures::Stream;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::types::LoginStatus;

struct PublisherState {
    current: LoginStatus,
    subscribers: Vec<mpsc::UnboundedSender<LoginStatus>>,
}

/// Owner side of the login status stream.
pub struct StatusPublisher {
    state: Mutex<PublisherState>,
}

impl StatusPublisher {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PublisherState {
                current: LoginStatus::Unknown,
                subscribers: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, PublisherState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current(&self) -> LoginStatus {
        self.state().current
    }

    /// Set the current value and deliver it to every live subscriber.
    pub fn publish(&self, status: LoginStatus) {
        let mut state = self.state();
        state.current = status;
        state.subscribers.retain(|tx| tx.send(status).is_ok());
    }

    pub fn subscribe(&self) -> LoginStatusStream {
        let mut state = self.state();
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(state.current);
        state.subscribers.push(tx);
        LoginStatusStream { rx }
    }

    pub fn subscriber_count(&self) -> usize {
        let mut state = self.state();
        state.subscribers.retain(|tx| !tx.is_closed());
        state.subscribers.len()
    }
}

impl Default for StatusPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber side of the login status stream.
///
/// Ends only when the publishing manager is dropped.
pub struct LoginStatusStream {
    rx: mpsc::UnboundedReceiver<LoginStatus>,
}

impl LoginStatusStream {
    /// Next status, waiting for a publication if none is pending.
    pub async fn recv(&mut self) -> Option<LoginStatus> {
        self.rx.recv().await
    }

    /// Next pending status without waiting.
    pub fn try_recv(&mut self) -> Option<LoginStatus> {
        self.rx.try_recv().ok()
    }

    /// Wait until `status` is published, discarding other values.
    pub async fn wait_for(&mut self, status: LoginStatus) -> Option<LoginStatus> {
        while let Some(next) = self.rx.recv().await {
            if next == status {
                return Some(next);
            }
        }
        None
    }
}

impl Stream for LoginStatusStream {
    type Item = LoginStatus;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
