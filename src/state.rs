//! Shared application state.

use std::sync::Arc;

use crate::config::HubConfig;
use crate::registry::GroupRegistry;

/// State shared by every WebSocket handler task.
///
/// The registry is behind its own `Arc` so the broker bridge can hold it
/// without holding the whole state.
pub struct AppState {
    pub registry: Arc<GroupRegistry>,
    pub config: HubConfig,
}

impl AppState {
    pub fn new(config: HubConfig) -> Self {
        Self {
            registry: Arc::new(GroupRegistry::new()),
            config,
        }
    }
}
