//! Device telemetry poller.
//!
//! Runs a background fetch task against the device's telemetry endpoint on
//! a fixed interval, independent of the push channel. The owning side
//! applies results with [`TelemetryMonitor::poll`]: a success replaces the
//! document wholesale and feeds the scalar histories, a failure records a
//! reason and leaves stale data visible. The cadence never backs off; a
//! bounded, predictable interval is what a monitoring surface wants.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::data::duration::format_uptime;
use crate::data::health::{HealthStatus, Thresholds};
use crate::data::history::RollingHistory;
use crate::data::telemetry::{ContainerStatus, DeviceMetrics, TelemetryData};

/// Samples retained per telemetry chart.
pub const TELEMETRY_HISTORY_SAMPLES: usize = 30;

/// Poll results buffered between the fetch task and the owner.
const RESULT_QUEUE: usize = 8;

/// Why a poll cycle failed. Stale data stays visible while one of these is
/// recorded.
#[derive(Debug, Clone, Error)]
pub enum PollError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("endpoint returned status {0}")]
    Status(u16),

    #[error("failed to parse telemetry document: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for PollError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PollError::Timeout
        } else {
            PollError::Transport(err.to_string())
        }
    }
}

/// Poll policy for the telemetry endpoint.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Full URL of the telemetry document.
    pub endpoint: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5000/api/telemetry".to_string(),
            poll_interval: Duration::from_millis(2000),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Polls the telemetry endpoint and keeps the latest document.
///
/// Owns its fetch task and timer exclusively; dropping the monitor aborts
/// them, so no timer outlives a teardown.
#[derive(Debug)]
pub struct TelemetryMonitor {
    rx: mpsc::Receiver<Result<TelemetryData, PollError>>,
    refresh: Arc<Notify>,
    task: JoinHandle<()>,
    thresholds: Thresholds,
    data: Option<TelemetryData>,
    last_error: Option<String>,
    cpu_history: RollingHistory<f64>,
    memory_history: RollingHistory<f64>,
    temperature_history: RollingHistory<f64>,
}

impl TelemetryMonitor {
    /// Start polling in the background.
    pub fn spawn(config: TelemetryConfig, thresholds: Thresholds) -> Self {
        let (tx, rx) = mpsc::channel(RESULT_QUEUE);
        let refresh = Arc::new(Notify::new());
        let task = tokio::spawn(poll_loop(config, tx, refresh.clone()));
        Self {
            rx,
            refresh,
            task,
            thresholds,
            data: None,
            last_error: None,
            cpu_history: RollingHistory::new(TELEMETRY_HISTORY_SAMPLES),
            memory_history: RollingHistory::new(TELEMETRY_HISTORY_SAMPLES),
            temperature_history: RollingHistory::new(TELEMETRY_HISTORY_SAMPLES),
        }
    }

    /// Apply any completed poll cycles. Returns true if anything changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(result) = self.rx.try_recv() {
            changed = true;
            match result {
                Ok(data) => self.apply(data),
                Err(e) => self.last_error = Some(e.to_string()),
            }
        }
        changed
    }

    fn apply(&mut self, data: TelemetryData) {
        if let Some(device) = &data.device {
            self.cpu_history.push(device.cpu_percent);
            self.memory_history.push(device.memory_percent);
            self.temperature_history.push(device.temperature_c);
        }
        self.data = Some(data);
        self.last_error = None;
    }

    /// The latest full document, possibly stale if polling is failing.
    pub fn data(&self) -> Option<&TelemetryData> {
        self.data.as_ref()
    }

    pub fn device(&self) -> Option<&DeviceMetrics> {
        self.data.as_ref().and_then(|d| d.device.as_ref())
    }

    pub fn containers(&self) -> &[ContainerStatus] {
        self.data.as_ref().map(|d| d.containers.as_slice()).unwrap_or(&[])
    }

    /// Recomputed from the latest metrics on every call; never cached.
    pub fn health(&self) -> HealthStatus {
        self.thresholds.classify(self.device())
    }

    /// Device uptime rendered for display.
    pub fn uptime_label(&self) -> Option<String> {
        self.device().map(|d| format_uptime(d.uptime_seconds as u64))
    }

    /// Reason the most recent poll cycle failed, if it did.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn cpu_history(&self) -> &RollingHistory<f64> {
        &self.cpu_history
    }

    pub fn memory_history(&self) -> &RollingHistory<f64> {
        &self.memory_history
    }

    pub fn temperature_history(&self) -> &RollingHistory<f64> {
        &self.temperature_history
    }

    /// Trigger a fetch now, without waiting for the next tick.
    pub fn refresh_now(&self) {
        self.refresh.notify_one();
    }

    /// Stop the fetch task. Also happens on drop.
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for TelemetryMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn poll_loop(
    config: TelemetryConfig,
    tx: mpsc::Sender<Result<TelemetryData, PollError>>,
    refresh: Arc<Notify>,
) {
    let client = Client::builder()
        .timeout(config.request_timeout)
        .build()
        .expect("Failed to build HTTP client");

    let mut ticker = tokio::time::interval(config.poll_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = refresh.notified() => {}
        }

        let result = fetch(&client, &config.endpoint).await;
        if let Err(e) = &result {
            warn!(endpoint = %config.endpoint, error = %e, "telemetry poll failed");
        }
        if tx.send(result).await.is_err() {
            return;
        }
    }
}

async fn fetch(client: &Client, endpoint: &str) -> Result<TelemetryData, PollError> {
    let response = client.get(endpoint).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(PollError::Status(status.as_u16()));
    }
    response
        .json::<TelemetryData>()
        .await
        .map_err(|e| PollError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const SAMPLE_DOC: &str = r#"{
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
            {"name": "vision-service", "status": "running", "uptime": "2d 14h 32m", "cpu_percent": 23.4, "memory_mb": 456.0}
        ],
        "is_raspberry_pi": true,
        "timestamp": 1754300000.0
    }"#;

    const HOT_DOC: &str = r#"{
        "device": {
            "cpu_percent": 95.0,
            "memory_used_mb": 1203.5,
            "memory_total_mb": 3906.2,
            "memory_percent": 30.8,
            "temperature_c": 48.3,
            "uptime_seconds": 100.0,
            "timestamp": 1754300000.0
        },
        "containers": [],
        "is_raspberry_pi": false,
        "timestamp": 1754300000.0
    }"#;

    /// Serve one canned HTTP response per connection, in order; the last
    /// response repeats for any further connections.
    async fn spawn_http_server(responses: Vec<(u16, String)>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut served = 0usize;
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let (status, body) = responses[served.min(responses.len() - 1)].clone();
                served += 1;

                // Read until the end of the request headers.
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    match stream.read(&mut chunk).await {
                        Ok(0) => break,
                        Ok(n) => {
                            buf.extend_from_slice(&chunk[..n]);
                            if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }

                let reason = if status == 200 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        addr
    }

    fn monitor_for(addr: SocketAddr, interval: Duration) -> TelemetryMonitor {
        TelemetryMonitor::spawn(
            TelemetryConfig {
                endpoint: format!("http://{}/api/telemetry", addr),
                poll_interval: interval,
                request_timeout: Duration::from_secs(2),
            },
            Thresholds::default(),
        )
    }

    #[tokio::test]
    async fn test_successful_poll_replaces_document() {
        let addr = spawn_http_server(vec![(200, SAMPLE_DOC.to_string())]).await;
        let mut monitor = monitor_for(addr, Duration::from_secs(60));

        // First tick fires immediately.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(monitor.poll());

        let device = monitor.device().unwrap();
        assert_eq!(device.cpu_percent, 23.4);
        assert_eq!(monitor.containers().len(), 1);
        assert_eq!(monitor.health(), HealthStatus::Healthy);
        assert_eq!(monitor.uptime_label().as_deref(), Some("1d 2h 3m"));
        assert!(monitor.last_error().is_none());
        assert_eq!(monitor.cpu_history().to_vec(), vec![23.4]);
    }

    #[tokio::test]
    async fn test_health_before_first_sample_is_critical() {
        let addr = spawn_http_server(vec![(200, SAMPLE_DOC.to_string())]).await;
        let monitor = monitor_for(addr, Duration::from_secs(60));
        assert_eq!(monitor.health(), HealthStatus::Critical);
    }

    #[tokio::test]
    async fn test_failure_keeps_stale_data_and_sets_reason() {
        let addr = spawn_http_server(vec![
            (200, SAMPLE_DOC.to_string()),
            (500, "{}".to_string()),
            (200, HOT_DOC.to_string()),
        ])
        .await;
        let mut monitor = monitor_for(addr, Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(150)).await;
        monitor.poll();
        assert_eq!(monitor.device().unwrap().cpu_percent, 23.4);

        // The 500 lands next: error recorded, metrics untouched.
        tokio::time::sleep(Duration::from_millis(120)).await;
        monitor.poll();
        assert_eq!(monitor.device().unwrap().cpu_percent, 23.4);
        assert!(monitor.last_error().unwrap().contains("500"));
        assert_eq!(monitor.cpu_history().len(), 1);

        // Polling continued on schedule; the next success clears the error.
        tokio::time::sleep(Duration::from_millis(120)).await;
        monitor.poll();
        assert_eq!(monitor.device().unwrap().cpu_percent, 95.0);
        assert!(monitor.last_error().is_none());
        assert_eq!(monitor.health(), HealthStatus::Critical);
        assert_eq!(monitor.cpu_history().to_vec(), vec![23.4, 95.0]);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_sets_transport_error() {
        // Bind then drop to get a refusing port.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut monitor = monitor_for(addr, Duration::from_secs(60));
        tokio::time::sleep(Duration::from_millis(300)).await;
        monitor.poll();

        assert!(monitor.data().is_none());
        assert!(monitor.last_error().is_some());
        assert_eq!(monitor.health(), HealthStatus::Critical);
    }

    #[tokio::test]
    async fn test_refresh_now_fetches_off_schedule() {
        let addr = spawn_http_server(vec![
            (200, SAMPLE_DOC.to_string()),
            (200, HOT_DOC.to_string()),
        ])
        .await;
        let mut monitor = monitor_for(addr, Duration::from_secs(60));

        tokio::time::sleep(Duration::from_millis(200)).await;
        monitor.poll();
        assert_eq!(monitor.device().unwrap().cpu_percent, 23.4);

        // The next scheduled tick is a minute away; a nudge fetches now.
        monitor.refresh_now();
        tokio::time::sleep(Duration::from_millis(200)).await;
        monitor.poll();
        assert_eq!(monitor.device().unwrap().cpu_percent, 95.0);
    }

    #[tokio::test]
    async fn test_unparseable_body_is_a_poll_failure() {
        let addr = spawn_http_server(vec![(200, "not json".to_string())]).await;
        let mut monitor = monitor_for(addr, Duration::from_secs(60));

        tokio::time::sleep(Duration::from_millis(200)).await;
        monitor.poll();
        assert!(monitor.data().is_none());
        assert!(monitor.last_error().unwrap().contains("parse"));
    }
}
