//! Pure normalization from raw broker payloads to canonical wire frames.

use serde_json::{Number, Value};

use crate::protocol::{
    RawSecurityEvent, RawSensorEvent, SecurityReading, SecurityUpdate, SensorReading, SensorUpdate,
};

/// Canonicalize a raw sensor event, applying the documented defaults.
///
/// `connected` derives from the raw `status` field alone: anything other
/// than the literal `"disconnected"` — a missing field included — counts as
/// connected. The REST status endpoint shares this contract.
pub fn normalize_sensor(raw: RawSensorEvent) -> SensorUpdate {
    let node_id = raw.node_id.unwrap_or_else(|| "unknown".to_string());
    let reading = SensorReading {
        connected: raw.status.as_deref() != Some("disconnected"),
        sensor_type: raw.sensor_type.unwrap_or_else(|| "unknown".to_string()),
        value: raw.value.unwrap_or_else(|| Number::from(0)),
        unit: raw.unit.unwrap_or_default(),
        timestamp: raw.timestamp,
    };
    SensorUpdate::new(node_id, reading)
}

/// Canonicalize a raw security event.
pub fn normalize_security(raw: RawSecurityEvent) -> SecurityUpdate {
    let node_id = raw.node_id.unwrap_or_else(|| "unknown".to_string());
    let reading = SecurityReading {
        event: raw.event.unwrap_or_else(|| "unknown".to_string()),
        severity: raw.severity.unwrap_or_else(|| "info".to_string()),
        message: raw.message.unwrap_or_default(),
        timestamp: raw.timestamp,
    };
    SecurityUpdate::new(node_id, reading)
}

/// Seam between the bridge and a concrete event schema: payload bytes in,
/// one serialized frame out. Missing or wrong-typed fields default; only
/// undecodable JSON is an error.
pub trait EventNormalizer: Send + Sync {
    fn frame(&self, payload: &[u8]) -> Result<String, serde_json::Error>;
}

pub struct SensorNormalizer;

impl EventNormalizer for SensorNormalizer {
    fn frame(&self, payload: &[u8]) -> Result<String, serde_json::Error> {
        let value: Value = serde_json::from_slice(payload)?;
        let update = normalize_sensor(RawSensorEvent::from_value(&value));
        serde_json::to_string(&update)
    }
}

pub struct SecurityNormalizer;

impl EventNormalizer for SecurityNormalizer {
    fn frame(&self, payload: &[u8]) -> Result<String, serde_json::Error> {
        let value: Value = serde_json::from_slice(payload)?;
        let update = normalize_security(RawSecurityEvent::from_value(&value));
        serde_json::to_string(&update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_event_gets_all_defaults() {
        let update = normalize_sensor(RawSensorEvent::default());

        let reading = update.data.get("unknown").expect("keyed under 'unknown'");
        assert!(reading.connected);
        assert_eq!(reading.sensor_type, "unknown");
        assert_eq!(reading.value, Number::from(0));
        assert_eq!(reading.unit, "");
        assert_eq!(reading.timestamp, None);
        assert_eq!(update.status, "success");
        assert_eq!(update.data.len(), 1);
    }

    #[test]
    fn disconnected_status_clears_connected() {
        let raw = RawSensorEvent {
            status: Some("disconnected".to_string()),
            ..Default::default()
        };
        let update = normalize_sensor(raw);
        assert!(!update.data["unknown"].connected);
    }

    #[test]
    fn any_other_status_counts_as_connected() {
        for status in [Some("ok"), Some("error"), Some("DISCONNECTED"), None] {
            let raw = RawSensorEvent {
                status: status.map(str::to_owned),
                ..Default::default()
            };
            let update = normalize_sensor(raw);
            assert!(
                update.data["unknown"].connected,
                "status {status:?} should count as connected"
            );
        }
    }

    #[test]
    fn full_sensor_event_serializes_exactly() {
        let frame = SensorNormalizer
            .frame(
                br#"{"node_id":"n1","status":"ok","sensor_type":"temp","value":21.5,"unit":"C","timestamp":"2024-01-01T00:00:00Z"}"#,
            )
            .unwrap();

        assert_eq!(
            frame,
            r#"{"status":"success","data":{"n1":{"connected":true,"type":"temp","value":21.5,"unit":"C","timestamp":"2024-01-01T00:00:00Z"}}}"#
        );
    }

    #[test]
    fn disconnected_partial_event_serializes_exactly() {
        let frame = SensorNormalizer
            .frame(br#"{"node_id":"n2","status":"disconnected"}"#)
            .unwrap();

        assert_eq!(
            frame,
            r#"{"status":"success","data":{"n2":{"connected":false,"type":"unknown","value":0,"unit":"","timestamp":null}}}"#
        );
    }

    #[test]
    fn invalid_json_is_the_only_error() {
        assert!(SensorNormalizer.frame(b"not json").is_err());
        assert!(SensorNormalizer.frame(b"{}").is_ok());
    }

    #[test]
    fn security_event_gets_defaults_and_envelope() {
        let update = normalize_security(RawSecurityEvent::default());

        let reading = update.data.get("unknown").expect("keyed under 'unknown'");
        assert_eq!(reading.event, "unknown");
        assert_eq!(reading.severity, "info");
        assert_eq!(reading.message, "");
        assert_eq!(reading.timestamp, None);
        assert_eq!(update.status, "success");
    }

    #[test]
    fn security_frame_serializes_exactly() {
        let frame = SecurityNormalizer
            .frame(
                br#"{"node_id":"door1","event":"motion","severity":"alert","message":"front door","timestamp":"2024-01-01T00:00:00Z"}"#,
            )
            .unwrap();

        assert_eq!(
            frame,
            r#"{"status":"success","data":{"door1":{"event":"motion","severity":"alert","message":"front door","timestamp":"2024-01-01T00:00:00Z"}}}"#
        );
    }
}
