//! Tracking stream models.
//!
//! Wire shapes match the tracking-update payload pushed by the sensing
//! backend. Entities arrive fresh on every update and wholly replace the
//! previous set; the only identity carried across updates is `id`, which
//! the upstream source may reuse.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::geometry::PixelBox;

/// Calibrated ground-plane coordinates attached by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

/// One tracked object as reported by the sensing backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedEntity {
    pub id: u64,
    /// Box origin and size in source pixel coordinates.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: f64,
    /// Whether the track was matched to a detection this frame.
    pub active: bool,
    /// Frames since the track was last matched.
    pub age: u32,
    pub color: (u8, u8, u8),
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_pixel: Option<(f64, f64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_world: Option<WorldPoint>,
}

impl TrackedEntity {
    /// The entity's bounding box in source pixel space.
    pub fn pixel_box(&self) -> PixelBox {
        PixelBox {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// Payload of a tracking-update frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingUpdate {
    pub active_count: u64,
    pub fps: f64,
    /// Full track list; the active subset is filtered client-side.
    pub people: Vec<TrackedEntity>,
}

/// The single current view of the tracking stream.
///
/// Exactly one snapshot is current at a time; older snapshots survive only
/// as scalar history (fps, active count), never as full entity sets.
#[derive(Debug, Clone)]
pub struct TrackingSnapshot {
    pub active_count: u64,
    pub fps: f64,
    pub entities: Vec<TrackedEntity>,
    pub received_at: Instant,
}
