//! Broker-to-registry pipeline.
//!
//! The bridge owns no per-connection state: it pulls raw payloads off an
//! [`EventSource`], routes by topic to a normalizer and target group, and
//! hands the canonical frame to the registry. One bridge task runs per
//! process, so broadcasts for a group are fully dispatched before the next
//! event is normalized.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::normalize::EventNormalizer;
use crate::registry::GroupRegistry;

/// Raw payload as delivered by the broker transport.
#[derive(Debug, Clone)]
pub struct BrokerEvent {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Anything that can feed broker payloads to the bridge.
#[async_trait]
pub trait EventSource: Send {
    /// Next raw payload, or `None` once the source is permanently done.
    async fn next_event(&mut self) -> Option<BrokerEvent>;
}

/// [`EventSource`] over an in-process channel. The sending half goes to
/// whatever produces events — tests, or an embedded transport.
pub struct ChannelSource {
    rx: mpsc::Receiver<BrokerEvent>,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<BrokerEvent>) -> Self {
        Self { rx }
    }
}

#[async_trait]
impl EventSource for ChannelSource {
    async fn next_event(&mut self) -> Option<BrokerEvent> {
        self.rx.recv().await
    }
}

/// Routing entry: one broker topic feeding one group through one normalizer.
pub struct BridgeRoute {
    pub topic: String,
    pub group: String,
    pub normalizer: Arc<dyn EventNormalizer>,
}

/// Stateless pipeline stage between the broker callback and the registry.
pub struct BrokerBridge {
    registry: Arc<GroupRegistry>,
    routes: Vec<BridgeRoute>,
}

impl BrokerBridge {
    pub fn new(registry: Arc<GroupRegistry>, routes: Vec<BridgeRoute>) -> Self {
        Self { registry, routes }
    }

    /// Pump the source until it ends. A payload that fails to decode is
    /// logged and skipped; nothing short of the source ending stops the loop.
    pub async fn run<S: EventSource>(self, mut source: S) {
        while let Some(event) = source.next_event().await {
            self.dispatch(&event).await;
        }
        tracing::info!("Broker source ended, bridge shutting down");
    }

    async fn dispatch(&self, event: &BrokerEvent) {
        let Some(route) = self.routes.iter().find(|r| r.topic == event.topic) else {
            tracing::debug!("No route for topic '{}', ignoring", event.topic);
            return;
        };

        match route.normalizer.frame(&event.payload) {
            Ok(frame) => {
                let delivered = self.registry.broadcast(&route.group, &frame).await;
                tracing::debug!(
                    "Broadcast '{}' event to {} subscriber(s)",
                    route.group,
                    delivered
                );
            }
            Err(e) => {
                tracing::warn!("Undecodable payload on topic '{}': {}", event.topic, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::SensorNormalizer;
    use crate::registry::SubscriberHandle;

    fn sensor_bridge(registry: Arc<GroupRegistry>) -> BrokerBridge {
        BrokerBridge::new(
            registry,
            vec![BridgeRoute {
                topic: "sensors/data".to_string(),
                group: "sensors".to_string(),
                normalizer: Arc::new(SensorNormalizer),
            }],
        )
    }

    #[tokio::test]
    async fn routes_event_to_group() {
        let registry = Arc::new(GroupRegistry::new());
        let (handle, mut rx) = SubscriberHandle::new();
        registry.join("sensors", handle).await;

        let bridge = sensor_bridge(registry);
        bridge
            .dispatch(&BrokerEvent {
                topic: "sensors/data".to_string(),
                payload: br#"{"node_id":"n1"}"#.to_vec(),
            })
            .await;

        let frame = rx.recv().await.unwrap();
        assert!(frame.contains(r#""n1""#));
    }

    #[tokio::test]
    async fn unroutable_topic_and_bad_payload_are_skipped() {
        let registry = Arc::new(GroupRegistry::new());
        let (handle, mut rx) = SubscriberHandle::new();
        registry.join("sensors", handle).await;

        let bridge = sensor_bridge(registry);
        bridge
            .dispatch(&BrokerEvent {
                topic: "somewhere/else".to_string(),
                payload: br#"{"node_id":"n1"}"#.to_vec(),
            })
            .await;
        bridge
            .dispatch(&BrokerEvent {
                topic: "sensors/data".to_string(),
                payload: b"not json at all".to_vec(),
            })
            .await;

        assert!(rx.try_recv().is_err());

        // Bridge still dispatches after the bad inputs
        bridge
            .dispatch(&BrokerEvent {
                topic: "sensors/data".to_string(),
                payload: br#"{"node_id":"n2"}"#.to_vec(),
            })
            .await;
        assert!(rx.recv().await.unwrap().contains(r#""n2""#));
    }

    #[tokio::test]
    async fn run_drains_channel_source_in_order() {
        let registry = Arc::new(GroupRegistry::new());
        let (handle, mut rx) = SubscriberHandle::new();
        registry.join("sensors", handle).await;

        let (tx, events) = mpsc::channel(8);
        let bridge = sensor_bridge(registry);
        let task = tokio::spawn(bridge.run(ChannelSource::new(events)));

        for node in ["a", "b", "c"] {
            tx.send(BrokerEvent {
                topic: "sensors/data".to_string(),
                payload: format!(r#"{{"node_id":"{node}"}}"#).into_bytes(),
            })
            .await
            .unwrap();
        }
        drop(tx);
        task.await.unwrap();

        for node in ["a", "b", "c"] {
            let frame = rx.recv().await.unwrap();
            assert!(frame.contains(&format!(r#""{node}""#)), "got {frame}");
        }
    }
}
