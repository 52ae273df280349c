//! Per-connection lifecycle: Connecting → Open → Closed.
//!
//! The session owns its subscriber handle for the connection's lifetime and
//! is the only thing that mutates registry membership for it. Closed is
//! terminal; teardown is valid from any state and any number of times.

use crate::protocol::Welcome;
use crate::registry::{GroupRegistry, SubscriberHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closed,
}

pub struct Session {
    group: String,
    handle: SubscriberHandle,
    state: SessionState,
}

impl Session {
    pub fn new(group: impl Into<String>, handle: SubscriberHandle) -> Self {
        Self {
            group: group.into(),
            handle,
            state: SessionState::Connecting,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn handle(&self) -> &SubscriberHandle {
        &self.handle
    }

    /// Accept the connection: queue the one-time welcome frame, then join
    /// the group. The welcome goes onto the outbox before the handle is
    /// visible to broadcasts, so no broadcast frame can ever precede it.
    ///
    /// Returns false if the session was not in `Connecting` or the outbox
    /// is already gone; the session is Closed in the failure case.
    pub async fn open(&mut self, registry: &GroupRegistry, welcome: &str) -> bool {
        if self.state != SessionState::Connecting {
            return false;
        }

        let frame = match serde_json::to_string(&Welcome::new(welcome)) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("Failed to serialize welcome message: {}", e);
                self.state = SessionState::Closed;
                return false;
            }
        };
        if !self.handle.send(frame) {
            self.state = SessionState::Closed;
            return false;
        }

        registry.join(&self.group, self.handle.clone()).await;
        self.state = SessionState::Open;
        true
    }

    /// Tear the connection down: evict the handle from every group.
    /// Idempotent, and safe even if `open` never completed.
    pub async fn close(&mut self, registry: &GroupRegistry) {
        if self.state == SessionState::Closed {
            return;
        }
        registry.leave_all(self.handle.id()).await;
        self.state = SessionState::Closed;
    }
}
