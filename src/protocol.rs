//! Wire shapes for the two broadcast groups.
//!
//! The outbound envelopes are shared contract with the companion REST status
//! API; key names are fixed and exact. Inbound broker payloads carry no
//! schema at all, so the raw types pull each field leniently out of a JSON
//! value and treat a wrong-typed field the same as a missing one.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Number, Value};

/// One-time frame sent to a client right after the upgrade is accepted.
#[derive(Debug, Clone, Serialize)]
pub struct Welcome {
    pub message: String,
}

impl Welcome {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Untyped sensor payload as published on the broker.
#[derive(Debug, Clone, Default)]
pub struct RawSensorEvent {
    pub node_id: Option<String>,
    pub status: Option<String>,
    pub sensor_type: Option<String>,
    pub value: Option<Number>,
    pub unit: Option<String>,
    pub timestamp: Option<String>,
}

impl RawSensorEvent {
    pub fn from_value(raw: &Value) -> Self {
        Self {
            node_id: string_field(raw, "node_id"),
            status: string_field(raw, "status"),
            sensor_type: string_field(raw, "sensor_type"),
            value: number_field(raw, "value"),
            unit: string_field(raw, "unit"),
            timestamp: string_field(raw, "timestamp"),
        }
    }
}

/// Per-node reading inside a [`SensorUpdate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    pub connected: bool,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub value: Number,
    pub unit: String,
    pub timestamp: Option<String>,
}

/// Canonical broadcast envelope for the sensors group.
/// Exactly one `data` entry, keyed by the event's resolved node id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorUpdate {
    pub status: String,
    pub data: HashMap<String, SensorReading>,
}

impl SensorUpdate {
    pub fn new(node_id: String, reading: SensorReading) -> Self {
        Self {
            status: "success".to_string(),
            data: HashMap::from([(node_id, reading)]),
        }
    }
}

/// Untyped security payload as published on the broker.
#[derive(Debug, Clone, Default)]
pub struct RawSecurityEvent {
    pub node_id: Option<String>,
    pub event: Option<String>,
    pub severity: Option<String>,
    pub message: Option<String>,
    pub timestamp: Option<String>,
}

impl RawSecurityEvent {
    pub fn from_value(raw: &Value) -> Self {
        Self {
            node_id: string_field(raw, "node_id"),
            event: string_field(raw, "event"),
            severity: string_field(raw, "severity"),
            message: string_field(raw, "message"),
            timestamp: string_field(raw, "timestamp"),
        }
    }
}

/// Per-node entry inside a [`SecurityUpdate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityReading {
    pub event: String,
    pub severity: String,
    pub message: String,
    pub timestamp: Option<String>,
}

/// Canonical broadcast envelope for the security group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityUpdate {
    pub status: String,
    pub data: HashMap<String, SecurityReading>,
}

impl SecurityUpdate {
    pub fn new(node_id: String, reading: SecurityReading) -> Self {
        Self {
            status: "success".to_string(),
            data: HashMap::from([(node_id, reading)]),
        }
    }
}

fn string_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn number_field(raw: &Value, key: &str) -> Option<Number> {
    match raw.get(key) {
        Some(Value::Number(n)) => Some(n.clone()),
        _ => None,
    }
}
