//! MQTT ingestion: the concrete broker transport behind [`EventSource`].

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};

use crate::bridge::{BrokerEvent, EventSource};
use crate::config::MqttConfig;

/// Back-off between polls after the event loop reports a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("MQTT subscribe failed: {0}")]
    Subscribe(#[from] rumqttc::ClientError),
}

/// rumqttc-backed event source.
///
/// Subscriptions are issued once at startup and re-issued on every ConnAck,
/// so a broker reconnect resumes the feed without outside help. Connection
/// errors back off briefly and poll again; they never surface to the bridge.
pub struct MqttSource {
    client: AsyncClient,
    event_loop: EventLoop,
    topics: Vec<String>,
}

impl MqttSource {
    pub async fn new(config: &MqttConfig, topics: Vec<String>) -> Result<Self, TransportError> {
        let mut options = MqttOptions::new(
            config.client_id.as_str(),
            config.host.as_str(),
            config.port,
        );
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

        let (client, event_loop) = AsyncClient::new(options, 64);
        for topic in &topics {
            client.subscribe(topic.as_str(), QoS::AtMostOnce).await?;
        }

        Ok(Self {
            client,
            event_loop,
            topics,
        })
    }

    async fn resubscribe(client: &AsyncClient, topics: &[String]) {
        for topic in topics {
            if let Err(e) = client.subscribe(topic.as_str(), QoS::AtMostOnce).await {
                tracing::warn!("Re-subscribe to '{}' failed: {}", topic, e);
            }
        }
    }
}

#[async_trait]
impl EventSource for MqttSource {
    async fn next_event(&mut self) -> Option<BrokerEvent> {
        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    return Some(BrokerEvent {
                        topic: publish.topic.clone(),
                        payload: publish.payload.to_vec(),
                    });
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!("Connected to MQTT broker");
                    Self::resubscribe(&self.client, &self.topics).await;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        "MQTT connection error: {}, retrying in {:?}",
                        e,
                        RECONNECT_DELAY
                    );
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }
}
