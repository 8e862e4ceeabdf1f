//! Tracking stream decoder.
//!
//! Drains tracking-update frames from the channel without blocking and
//! keeps exactly one current [`TrackingSnapshot`], plus bounded scalar
//! history of fps and active count for charting. Updates apply in arrival
//! order and wholly replace the previous snapshot; nothing is merged.

use std::time::Instant;

use tokio::sync::broadcast;
use tracing::debug;

use crate::channel::ChannelManager;
use crate::data::geometry::{FrameGeometry, OverlayBox};
use crate::data::history::RollingHistory;
use crate::data::tracking::{TrackedEntity, TrackingSnapshot, TrackingUpdate};

/// Samples retained for fps and active-count charting.
pub const TRACKING_HISTORY_SAMPLES: usize = 60;

/// Maintains the client-side view of the tracking stream.
#[derive(Debug)]
pub struct TrackingMonitor {
    rx: broadcast::Receiver<TrackingUpdate>,
    geometry: FrameGeometry,
    snapshot: Option<TrackingSnapshot>,
    fps_history: RollingHistory<f64>,
    active_history: RollingHistory<u64>,
}

impl TrackingMonitor {
    /// Subscribe a new monitor to the manager's tracking stream.
    pub fn new(manager: &ChannelManager, geometry: FrameGeometry) -> Self {
        Self::with_receiver(manager.subscribe_tracking(), geometry)
    }

    /// Build directly from a subscription receiver.
    pub fn with_receiver(
        rx: broadcast::Receiver<TrackingUpdate>,
        geometry: FrameGeometry,
    ) -> Self {
        Self {
            rx,
            geometry,
            snapshot: None,
            fps_history: RollingHistory::new(TRACKING_HISTORY_SAMPLES),
            active_history: RollingHistory::new(TRACKING_HISTORY_SAMPLES),
        }
    }

    /// Drain pending updates. Returns true if the snapshot changed.
    ///
    /// Non-blocking; on silence or subscription closure the last-known-good
    /// snapshot stays in place.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.rx.try_recv() {
                Ok(update) => {
                    self.apply(update);
                    changed = true;
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "tracking stream lagged, resuming at newest");
                }
                Err(_) => break,
            }
        }
        changed
    }

    fn apply(&mut self, update: TrackingUpdate) {
        self.fps_history.push(update.fps);
        self.active_history.push(update.active_count);
        self.snapshot = Some(TrackingSnapshot {
            active_count: update.active_count,
            fps: update.fps,
            entities: update.people,
            received_at: Instant::now(),
        });
    }

    /// The current snapshot, if any update has arrived yet.
    pub fn snapshot(&self) -> Option<&TrackingSnapshot> {
        self.snapshot.as_ref()
    }

    /// Entities matched to a detection in the current frame.
    pub fn active_entities(&self) -> Vec<&TrackedEntity> {
        self.snapshot
            .as_ref()
            .map(|s| s.entities.iter().filter(|e| e.active).collect())
            .unwrap_or_default()
    }

    /// Percent-of-frame overlay boxes for the active subset.
    pub fn overlays(&self) -> Vec<(u64, OverlayBox)> {
        self.active_entities()
            .into_iter()
            .map(|e| (e.id, self.geometry.normalize(&e.pixel_box())))
            .collect()
    }

    pub fn fps_history(&self) -> &RollingHistory<f64> {
        &self.fps_history
    }

    pub fn active_history(&self) -> &RollingHistory<u64> {
        &self.active_history
    }

    /// Re-attach to the manager after a manual disconnect/reconnect cycle
    /// (manual disconnect closes all subscriptions). History and the
    /// current snapshot are kept.
    pub fn resubscribe(&mut self, manager: &ChannelManager) {
        self.rx = manager.subscribe_tracking();
    }
}
