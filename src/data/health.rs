//! Device health classification.
//!
//! Health is a judgment over the latest metrics, never a stored value: it
//! is recomputed from thresholds on every read so a threshold change takes
//! effect without waiting for a new sample.

use super::telemetry::DeviceMetrics;

/// Thresholds for device health classification.
///
/// Comparisons are strict: a reading must exceed a threshold to trip it,
/// so a cpu of exactly 90.0 is warning, not critical.
#[derive(Debug, Clone)]
pub struct Thresholds {
    pub cpu_warning: f64,
    pub cpu_critical: f64,
    pub memory_warning: f64,
    pub memory_critical: f64,
    pub temperature_warning: f64,
    pub temperature_critical: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_warning: 70.0,
            cpu_critical: 90.0,
            memory_warning: 75.0,
            memory_critical: 90.0,
            temperature_warning: 70.0,
            temperature_critical: 80.0,
        }
    }
}

/// Health status derived from device metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "OK",
            HealthStatus::Warning => "WARN",
            HealthStatus::Critical => "CRIT",
        }
    }
}

impl Thresholds {
    /// Classify the most recent metrics.
    ///
    /// `None` means no metrics have ever been received, which reads as
    /// critical on a monitoring surface.
    pub fn classify(&self, metrics: Option<&DeviceMetrics>) -> HealthStatus {
        let Some(m) = metrics else {
            return HealthStatus::Critical;
        };

        if m.cpu_percent > self.cpu_critical
            || m.memory_percent > self.memory_critical
            || m.temperature_c > self.temperature_critical
        {
            HealthStatus::Critical
        } else if m.cpu_percent > self.cpu_warning
            || m.memory_percent > self.memory_warning
            || m.temperature_c > self.temperature_warning
        {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(cpu: f64, memory: f64, temperature: f64) -> DeviceMetrics {
        DeviceMetrics {
            cpu_percent: cpu,
            memory_used_mb: 0.0,
            memory_total_mb: 0.0,
            memory_percent: memory,
            temperature_c: temperature,
            uptime_seconds: 0.0,
            timestamp: 0.0,
        }
    }

    #[test]
    fn test_critical_cpu() {
        let t = Thresholds::default();
        assert_eq!(
            t.classify(Some(&metrics(95.0, 10.0, 10.0))),
            HealthStatus::Critical
        );
    }

    #[test]
    fn test_warning_cpu() {
        let t = Thresholds::default();
        assert_eq!(
            t.classify(Some(&metrics(75.0, 10.0, 10.0))),
            HealthStatus::Warning
        );
    }

    #[test]
    fn test_healthy() {
        let t = Thresholds::default();
        assert_eq!(
            t.classify(Some(&metrics(10.0, 10.0, 10.0))),
            HealthStatus::Healthy
        );
    }

    #[test]
    fn test_no_metrics_is_critical() {
        let t = Thresholds::default();
        assert_eq!(t.classify(None), HealthStatus::Critical);
    }

    #[test]
    fn test_boundaries_are_strict() {
        let t = Thresholds::default();
        // Exactly at a threshold does not trip it.
        assert_eq!(
            t.classify(Some(&metrics(90.0, 10.0, 10.0))),
            HealthStatus::Warning
        );
        assert_eq!(
            t.classify(Some(&metrics(70.0, 10.0, 10.0))),
            HealthStatus::Healthy
        );
        assert_eq!(
            t.classify(Some(&metrics(10.0, 10.0, 80.0))),
            HealthStatus::Warning
        );
    }

    #[test]
    fn test_temperature_and_memory_trip_independently() {
        let t = Thresholds::default();
        assert_eq!(
            t.classify(Some(&metrics(10.0, 91.0, 10.0))),
            HealthStatus::Critical
        );
        assert_eq!(
            t.classify(Some(&metrics(10.0, 10.0, 80.5))),
            HealthStatus::Critical
        );
        assert_eq!(
            t.classify(Some(&metrics(10.0, 76.0, 10.0))),
            HealthStatus::Warning
        );
    }

    #[test]
    fn test_status_ordering() {
        assert!(HealthStatus::Critical > HealthStatus::Warning);
        assert!(HealthStatus::Warning > HealthStatus::Healthy);
        assert_eq!(HealthStatus::Critical.symbol(), "CRIT");
    }
}
