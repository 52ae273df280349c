//! Process-wide registry of WebSocket subscribers, grouped by name.
//!
//! Each group guards its own member set, so joins, leaves and broadcasts on
//! one group never serialize against traffic on another. Broadcasts deliver
//! to a point-in-time snapshot of the membership; members whose outbox has
//! gone away are evicted afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;

/// Unique identifier for one live connection
pub type ConnId = String;

/// Sending side of one connection's outbox.
///
/// The connection task owns the receiving side and drains it onto the socket
/// in FIFO order. The registry only ever stores clones, so the queue itself
/// stays with the connection.
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    id: ConnId,
    outbox: UnboundedSender<String>,
}

impl SubscriberHandle {
    /// Create a handle together with the outbox receiver for its connection task
    pub fn new() -> (Self, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: ulid::Ulid::new().to_string(),
            outbox: tx,
        };
        (handle, rx)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queue a serialized frame for delivery.
    /// Returns false once the connection task has dropped its receiver.
    pub fn send(&self, frame: String) -> bool {
        self.outbox.send(frame).is_ok()
    }

    pub fn is_alive(&self) -> bool {
        !self.outbox.is_closed()
    }
}

#[derive(Default)]
struct Group {
    members: RwLock<HashMap<ConnId, SubscriberHandle>>,
}

/// Map from group name to its current members.
///
/// The outer lock is held only long enough to resolve a group entry; all
/// membership mutation happens under the per-group lock.
#[derive(Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<String, Arc<Group>>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    async fn group(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.read().await.get(name).cloned()
    }

    async fn group_or_create(&self, name: &str) -> Arc<Group> {
        if let Some(group) = self.group(name).await {
            return group;
        }
        let mut groups = self.groups.write().await;
        groups.entry(name.to_string()).or_default().clone()
    }

    /// Add a handle to a group, creating the group on first use.
    /// Membership is keyed by connection id, so re-joining is a no-op.
    pub async fn join(&self, name: &str, handle: SubscriberHandle) {
        let group = self.group_or_create(name).await;
        let mut members = group.members.write().await;
        members.insert(handle.id().to_string(), handle);
    }

    /// Remove one member from one group. Unknown group or member is a no-op.
    pub async fn leave(&self, name: &str, id: &str) {
        if let Some(group) = self.group(name).await {
            group.members.write().await.remove(id);
        }
    }

    /// Evict a connection from every group it belongs to.
    pub async fn leave_all(&self, id: &str) {
        let groups: Vec<Arc<Group>> = self.groups.read().await.values().cloned().collect();
        for group in groups {
            group.members.write().await.remove(id);
        }
    }

    /// Deliver a frame to every member currently in the group.
    ///
    /// Iterates a snapshot of the membership taken at the moment of the
    /// call. A member whose send fails is skipped and evicted; the failure
    /// never reaches the caller. Returns how many members were delivered to.
    pub async fn broadcast(&self, name: &str, frame: &str) -> usize {
        let Some(group) = self.group(name).await else {
            return 0;
        };

        let snapshot: Vec<SubscriberHandle> =
            group.members.read().await.values().cloned().collect();

        let mut delivered = 0;
        let mut dead = Vec::new();
        for handle in &snapshot {
            if handle.send(frame.to_string()) {
                delivered += 1;
            } else {
                tracing::warn!("Dropping {} from '{}': outbox closed", handle.id(), name);
                dead.push(handle.id().to_string());
            }
        }

        if !dead.is_empty() {
            let mut members = group.members.write().await;
            for id in &dead {
                members.remove(id);
            }
        }

        delivered
    }

    /// Current member count of a group (0 for unknown groups).
    pub async fn member_count(&self, name: &str) -> usize {
        match self.group(name).await {
            Some(group) => group.members.read().await.len(),
            None => 0,
        }
    }
}
