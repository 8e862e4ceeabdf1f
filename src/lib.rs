//! # trackwatch
//!
//! Client-side synchronization core for a remote tracking sensor.
//!
//! This crate keeps a local, render-ready view of a sensing backend
//! consistent over an unreliable network. Two independently-paced data
//! sources feed it: a high-frequency push stream of object-tracking updates
//! over a persistent WebSocket, and a low-frequency HTTP poll of device and
//! container health metrics. A single-in-flight natural-language query
//! exchange is layered on the push channel.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                         Presentation                           │
//! │   reads snapshots, histories, health; sends query / refresh    │
//! └───────▲──────────────────▲──────────────────▲──────────────────┘
//!         │                  │                  │
//!   ┌─────┴──────┐    ┌──────┴──────┐    ┌──────┴──────┐
//!   │  tracking  │    │  telemetry  │    │    query    │
//!   │ (decoder)  │    │  (poller)   │    │  (bridge)   │
//!   └─────┬──────┘    └──────┬──────┘    └──────┬──────┘
//!         │                  │                  │
//!   ┌─────┴──────────────────┼──────────────────┴──────┐
//!   │        channel (WebSocket lifecycle, fan-out)    │
//!   │                        │        HTTP pull ◀──────┼── device
//!   └────────────────────────┴──────────────────▲──────┘
//!                                          backend
//! ```
//!
//! - **[`channel`]**: the persistent push channel. [`ChannelManager`] is the
//!   only owner of the WebSocket; it applies the bounded reconnection policy,
//!   publishes [`ConnectionState`] transitions, and fans decoded frames out
//!   to typed per-kind subscriptions.
//! - **[`tracking`]**: [`TrackingMonitor`] holds the single current tracking
//!   snapshot, bounded fps and active-count history, and derives the active
//!   subset with percent-of-frame overlay boxes.
//! - **[`telemetry`]**: [`TelemetryMonitor`] polls the device's telemetry
//!   endpoint on a fixed interval, keeps bounded cpu/memory/temperature
//!   history, and classifies device health on read.
//! - **[`query`]**: [`QueryBridge`] serializes one natural-language query at
//!   a time over the channel and demultiplexes replies from unsolicited
//!   alerts.
//! - **[`data`]**: pure models and utilities shared by the above.
//! - **[`config`]**: the file/environment/CLI settings surface.
//!
//! All state mutation happens in `poll()` and command calls on the owning
//! component; background tasks only move decoded values across channels.
//! Dropping a manager or monitor aborts its task, so no timer outlives a
//! teardown.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use trackwatch::channel::ChannelManager;
//! use trackwatch::config::Settings;
//! use trackwatch::query::QueryBridge;
//! use trackwatch::telemetry::TelemetryMonitor;
//! use trackwatch::tracking::TrackingMonitor;
//!
//! # tokio_test::block_on(async {
//! let settings = Settings::load(None).unwrap();
//!
//! let manager = Arc::new(ChannelManager::new(settings.channel_config()));
//! let mut tracking = TrackingMonitor::new(&manager, settings.geometry());
//! let mut telemetry =
//!     TelemetryMonitor::spawn(settings.telemetry_config(), settings.health_thresholds());
//! let mut bridge = QueryBridge::new(manager.clone(), settings.query_grace());
//!
//! manager.connect();
//!
//! loop {
//!     tokio::time::sleep(Duration::from_millis(250)).await;
//!     tracking.poll();
//!     telemetry.poll();
//!     for event in bridge.poll() {
//!         println!("{:?}", event);
//!     }
//!     if let Some(snapshot) = tracking.snapshot() {
//!         println!(
//!             "fps {:.1}, {} active, health {}",
//!             snapshot.fps,
//!             snapshot.active_count,
//!             telemetry.health().symbol()
//!         );
//!     }
//! }
//! # });
//! ```

pub mod channel;
pub mod config;
pub mod data;
pub mod query;
pub mod telemetry;
pub mod tracking;

pub use channel::{
    Alert, AlertSeverity, ChannelConfig, ChannelManager, ConnectionPhase, ConnectionState,
    QueryContext, QueryReply,
};
pub use config::{Settings, SettingsError};
pub use data::{
    ContainerState, ContainerStatus, DeviceMetrics, FrameGeometry, HealthStatus, OverlayBox,
    RollingHistory, TelemetryData, Thresholds, TrackedEntity, TrackingSnapshot,
};
pub use query::{PendingQuery, QueryBridge, QueryError, QueryEvent};
pub use telemetry::{TelemetryConfig, TelemetryMonitor};
pub use tracking::TrackingMonitor;
