//! Data models and pure utilities for the synchronization core.
//!
//! ## Submodules
//!
//! - [`duration`]: uptime formatting for display
//! - [`geometry`]: pixel-space to percent-of-frame coordinate mapping
//! - [`health`]: threshold-based device health classification
//! - [`history`]: bounded FIFO sample history for charting
//! - [`telemetry`]: the device telemetry document models
//! - [`tracking`]: tracking stream wire and snapshot models
//!
//! Everything here is pure or minimal-state; the only failure modes are
//! programmer errors (zero capacity, non-positive resolution), which fail
//! fast at construction.

pub mod duration;
pub mod geometry;
pub mod health;
pub mod history;
pub mod telemetry;
pub mod tracking;

pub use geometry::{FrameGeometry, OverlayBox, PixelBox};
pub use health::{HealthStatus, Thresholds};
pub use history::RollingHistory;
pub use telemetry::{ContainerState, ContainerStatus, DeviceMetrics, TelemetryData};
pub use tracking::{TrackedEntity, TrackingSnapshot, TrackingUpdate, WorldPoint};
