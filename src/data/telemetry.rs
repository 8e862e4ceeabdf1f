//! Telemetry document models for the device pull endpoint.
//!
//! These types match the JSON document served by the sensing device's
//! telemetry endpoint. The whole document is replaced on every successful
//! poll; nothing here is merged incrementally.

use serde::{Deserialize, Serialize};

/// Point-in-time device metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceMetrics {
    pub cpu_percent: f64,
    pub memory_used_mb: f64,
    pub memory_total_mb: f64,
    pub memory_percent: f64,
    pub temperature_c: f64,
    pub uptime_seconds: f64,
    /// Seconds since the epoch, as stamped by the device.
    pub timestamp: f64,
}

/// Lifecycle state of a service container on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Running,
    Stopped,
    Restarting,
    /// Anything the device reports that we don't recognize.
    #[serde(other)]
    Unknown,
}

impl ContainerState {
    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running)
    }

    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            ContainerState::Running => "running",
            ContainerState::Stopped => "stopped",
            ContainerState::Restarting => "restarting",
            ContainerState::Unknown => "unknown",
        }
    }
}

/// Status of one service container, in the order the device reports them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub name: String,
    pub status: ContainerState,
    /// Human-readable uptime as reported by the container runtime.
    pub uptime: String,
    pub cpu_percent: f64,
    pub memory_mb: f64,
}

/// The full telemetry document served by the pull endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryData {
    /// Absent until the device has collected its first sample.
    pub device: Option<DeviceMetrics>,
    pub containers: Vec<ContainerStatus>,
    pub is_raspberry_pi: bool,
    pub timestamp: f64,
}

impl TelemetryData {
    /// How many containers are currently running.
    pub fn running_containers(&self) -> usize {
        self.containers.iter().filter(|c| c.status.is_running()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_document() {
        let json = r#"{
            "device": {
                "cpu_percent": 23.4,
                "memory_used_mb": 1203.5,
                "memory_total_mb": 3906.2,
                "memory_percent": 30.8,
                "temperature_c": 48.3,
                "uptime_seconds": 93784.0,
                "timestamp": 1754300000.0
            },
            "containers": [
                {"name": "vision-service", "status": "running", "uptime": "2d 14h 32m", "cpu_percent": 23.4, "memory_mb": 456.0},
                {"name": "mqtt-broker", "status": "stopped", "uptime": "N/A", "cpu_percent": 0.0, "memory_mb": 0.0}
            ],
            "is_raspberry_pi": true,
            "timestamp": 1754300000.0
        }"#;

        let data: TelemetryData = serde_json::from_str(json).unwrap();
        let device = data.device.as_ref().unwrap();
        assert_eq!(device.cpu_percent, 23.4);
        assert_eq!(data.containers.len(), 2);
        assert_eq!(data.containers[0].status, ContainerState::Running);
        assert_eq!(data.containers[1].status, ContainerState::Stopped);
        assert_eq!(data.running_containers(), 1);
        assert!(data.is_raspberry_pi);
    }

    #[test]
    fn test_deserialize_without_device() {
        let json = r#"{"device": null, "containers": [], "is_raspberry_pi": false, "timestamp": 0.0}"#;
        let data: TelemetryData = serde_json::from_str(json).unwrap();
        assert!(data.device.is_none());
        assert_eq!(data.running_containers(), 0);
    }

    #[test]
    fn test_unrecognized_container_state() {
        let json = r#"{"name": "x", "status": "paused", "uptime": "1m", "cpu_percent": 0.0, "memory_mb": 1.0}"#;
        let status: ContainerStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.status, ContainerState::Unknown);
        assert!(!status.status.is_running());
    }
}
