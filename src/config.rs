//! Startup configuration.
//!
//! Everything comes from environment variables with working defaults, plus
//! the explicit tables that used to be implicit in URL-pattern registration:
//! WebSocket path segment → (group, welcome message), and broker topic →
//! (group, normalizer).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use crate::bridge::BridgeRoute;
use crate::normalize::{SecurityNormalizer, SensorNormalizer};

/// One WebSocket endpoint: `/ws/{key}` joins `group` and greets with `welcome`.
#[derive(Debug, Clone)]
pub struct WsEndpoint {
    pub group: String,
    pub welcome: String,
}

/// Broker connection settings.
#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
}

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub bind: SocketAddr,
    pub mqtt: MqttConfig,
    pub sensor_topic: String,
    pub security_topic: String,
    endpoints: Vec<(String, WsEndpoint)>,
}

impl HubConfig {
    /// Load configuration from environment variables.
    /// Unset or unparseable values fall back to defaults.
    pub fn from_env() -> Self {
        let addr: IpAddr = std::env::var("HUB_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let port: u16 = std::env::var("HUB_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8000);

        let mqtt = MqttConfig {
            host: std::env::var("MQTT_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("MQTT_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1883),
            client_id: std::env::var("MQTT_CLIENT_ID").unwrap_or_else(|_| "sensorhub".to_string()),
            keep_alive_secs: std::env::var("MQTT_KEEP_ALIVE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        };

        Self {
            bind: SocketAddr::new(addr, port),
            mqtt,
            sensor_topic: std::env::var("SENSOR_TOPIC")
                .unwrap_or_else(|_| "sensors/data".to_string()),
            security_topic: std::env::var("SECURITY_TOPIC")
                .unwrap_or_else(|_| "security/events".to_string()),
            endpoints: vec![
                (
                    "sensors".to_string(),
                    WsEndpoint {
                        group: "sensors".to_string(),
                        welcome: "Connected to sensor updates".to_string(),
                    },
                ),
                (
                    "security".to_string(),
                    WsEndpoint {
                        group: "security".to_string(),
                        welcome: "Connected to security updates".to_string(),
                    },
                ),
            ],
        }
    }

    /// Endpoint for a `/ws/{key}` path segment, if one is configured.
    pub fn endpoint(&self, key: &str) -> Option<&WsEndpoint> {
        self.endpoints
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, endpoint)| endpoint)
    }

    /// Topic routing table for the broker bridge.
    pub fn bridge_routes(&self) -> Vec<BridgeRoute> {
        vec![
            BridgeRoute {
                topic: self.sensor_topic.clone(),
                group: "sensors".to_string(),
                normalizer: Arc::new(SensorNormalizer),
            },
            BridgeRoute {
                topic: self.security_topic.clone(),
                group: "security".to_string(),
                normalizer: Arc::new(SecurityNormalizer),
            },
        ]
    }

    /// Topics the broker subscription covers.
    pub fn topics(&self) -> Vec<String> {
        vec![self.sensor_topic.clone(), self.security_topic.clone()]
    }
}
