//! Runtime configuration for the synchronization core.
//!
//! Settings layer three sources, later ones winning: built-in defaults, an
//! optional TOML file, and `TRACKWATCH_`-prefixed environment variables
//! (nested keys separated with `__`, e.g. `TRACKWATCH_THRESHOLDS__CPU_WARNING`).
//! The binary applies its CLI flags on top. Validation fails fast so a bad
//! value is a startup error, not a surprise at use time.

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::channel::ChannelConfig;
use crate::data::geometry::{FrameGeometry, DEFAULT_REFERENCE_HEIGHT, DEFAULT_REFERENCE_WIDTH};
use crate::data::health::Thresholds;
use crate::telemetry::TelemetryConfig;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Health thresholds as they appear in the settings file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThresholdSettings {
    pub cpu_warning: f64,
    pub cpu_critical: f64,
    pub memory_warning: f64,
    pub memory_critical: f64,
    pub temperature_warning: f64,
    pub temperature_critical: f64,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Thresholds::default().into()
    }
}

impl From<Thresholds> for ThresholdSettings {
    fn from(t: Thresholds) -> Self {
        Self {
            cpu_warning: t.cpu_warning,
            cpu_critical: t.cpu_critical,
            memory_warning: t.memory_warning,
            memory_critical: t.memory_critical,
            temperature_warning: t.temperature_warning,
            temperature_critical: t.temperature_critical,
        }
    }
}

impl From<ThresholdSettings> for Thresholds {
    fn from(t: ThresholdSettings) -> Self {
        Self {
            cpu_warning: t.cpu_warning,
            cpu_critical: t.cpu_critical,
            memory_warning: t.memory_warning,
            memory_critical: t.memory_critical,
            temperature_warning: t.temperature_warning,
            temperature_critical: t.temperature_critical,
        }
    }
}

/// The full configuration surface consumed from file, environment, and CLI.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Backend address (host:port) shared by the push channel and the pull
    /// endpoint.
    pub base_address: String,
    pub channel_path: String,
    pub telemetry_path: String,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    /// Wait before a dropped channel fails the outstanding query.
    pub query_grace_ms: u64,
    /// Fixed capture resolution of the upstream source.
    pub reference_width: f64,
    pub reference_height: f64,
    pub thresholds: ThresholdSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_address: "127.0.0.1:5000".to_string(),
            channel_path: "/ws".to_string(),
            telemetry_path: "/api/telemetry".to_string(),
            max_reconnect_attempts: 5,
            reconnect_delay_ms: 2000,
            poll_interval_ms: 2000,
            request_timeout_ms: 10_000,
            query_grace_ms: 1500,
            reference_width: DEFAULT_REFERENCE_WIDTH,
            reference_height: DEFAULT_REFERENCE_HEIGHT,
            thresholds: ThresholdSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from an optional file and the environment, validated.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(Environment::with_prefix("TRACKWATCH").separator("__"))
            .build()?;
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the core cannot run with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.base_address.is_empty() {
            return Err(SettingsError::Invalid(
                "base_address must not be empty".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(SettingsError::Invalid(
                "poll_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(SettingsError::Invalid(
                "request_timeout_ms must be non-zero".to_string(),
            ));
        }
        for (name, value) in [
            ("reference_width", self.reference_width),
            ("reference_height", self.reference_height),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SettingsError::Invalid(format!("{name} must be positive")));
            }
        }
        let t = &self.thresholds;
        for (name, warning, critical) in [
            ("cpu", t.cpu_warning, t.cpu_critical),
            ("memory", t.memory_warning, t.memory_critical),
            ("temperature", t.temperature_warning, t.temperature_critical),
        ] {
            if warning > critical {
                return Err(SettingsError::Invalid(format!(
                    "{name} warning threshold exceeds its critical threshold"
                )));
            }
        }
        Ok(())
    }

    pub fn channel_url(&self) -> String {
        format!("ws://{}{}", self.base_address, self.channel_path)
    }

    pub fn telemetry_url(&self) -> String {
        format!("http://{}{}", self.base_address, self.telemetry_path)
    }

    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            url: self.channel_url(),
            max_reconnect_attempts: self.max_reconnect_attempts,
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
        }
    }

    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            endpoint: self.telemetry_url(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    /// The overlay mapper for the configured capture resolution.
    ///
    /// Call [`Settings::validate`] first; an invalid resolution panics here.
    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(self.reference_width, self.reference_height)
    }

    pub fn health_thresholds(&self) -> Thresholds {
        self.thresholds.clone().into()
    }

    pub fn query_grace(&self) -> Duration {
        Duration::from_millis(self.query_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.channel_url(), "ws://127.0.0.1:5000/ws");
        assert_eq!(
            settings.telemetry_url(),
            "http://127.0.0.1:5000/api/telemetry"
        );
        assert_eq!(settings.max_reconnect_attempts, 5);
        assert_eq!(settings.poll_interval_ms, 2000);
        assert_eq!(settings.health_thresholds().cpu_critical, 90.0);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
base_address = "sensor.local:8080"
poll_interval_ms = 500

[thresholds]
cpu_warning = 60.0
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.base_address, "sensor.local:8080");
        assert_eq!(settings.poll_interval_ms, 500);
        assert_eq!(settings.thresholds.cpu_warning, 60.0);
        // Untouched values keep their defaults.
        assert_eq!(settings.thresholds.cpu_critical, 90.0);
        assert_eq!(settings.channel_path, "/ws");
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let settings = Settings {
            poll_interval_ms: 0,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn test_bad_reference_resolution_rejected() {
        let settings = Settings {
            reference_width: 0.0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            reference_height: -640.0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut settings = Settings::default();
        settings.thresholds.memory_warning = 95.0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("memory"));
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let err = Settings::load(Some(Path::new("/nonexistent/trackwatch.toml")));
        assert!(matches!(err, Err(SettingsError::Load(_))));
    }
}
