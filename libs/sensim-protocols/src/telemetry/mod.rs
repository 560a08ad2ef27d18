//! Telemetry protocol port
//!
//! One JSON message per mapped point and tick:
//! `{"value": <2 decimals>, "timestamp": <unix seconds>}`.

pub mod frontend;
pub mod mqtt;
pub mod publisher;

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

pub use frontend::TelemetryFrontend;
pub use mqtt::{MqttConfig, MqttPublisher};
pub use publisher::{MemoryPublisher, PublishedMessage, Publisher};

/// Process-wide telemetry enable flag
#[derive(Debug)]
pub struct TelemetrySwitch {
    enabled: AtomicBool,
}

impl TelemetrySwitch {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Set the flag; returns the previous state
    pub fn set(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::Relaxed)
    }
}

impl Default for TelemetrySwitch {
    fn default() -> Self {
        Self::new(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPayload {
    pub value: f64,
    pub timestamp: i64,
}

impl TelemetryPayload {
    pub fn new(value: f64, timestamp: i64) -> Self {
        Self {
            value: round2(value),
            timestamp,
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_payload_json() {
        let payload = TelemetryPayload::new(21.456_7, 1_700_000_000);
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"value":21.46,"timestamp":1700000000}"#
        );
        assert_eq!(round2(-3.14159), -3.14);
    }

    #[test]
    fn test_switch() {
        let switch = TelemetrySwitch::default();
        assert!(switch.is_enabled());
        assert!(switch.set(false));
        assert!(!switch.is_enabled());
    }
}
