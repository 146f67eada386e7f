/// Device liveness from two independent signals: image arrival and heartbeat.
///
/// Either signal proves the device is reachable, so the most recent one decides.
/// Timestamps come from the server's monotonic clock.

use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub const DEFAULT_THRESHOLD: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceStatus {
    /// Nothing heard from the device since start (or since a reset).
    Unknown,
    Online { seconds_since_seen: f64 },
    Offline { seconds_since_seen: f64 },
}

impl DeviceStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, DeviceStatus::Online { .. })
    }
}

/// `/esp-status` response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl From<DeviceStatus> for StatusReport {
    fn from(status: DeviceStatus) -> Self {
        match status {
            DeviceStatus::Unknown => StatusReport {
                status: "offline",
                last_seen: None,
                reason: Some("no data yet"),
            },
            DeviceStatus::Online { seconds_since_seen } => StatusReport {
                status: "online",
                last_seen: Some(seconds_since_seen),
                reason: None,
            },
            DeviceStatus::Offline { seconds_since_seen } => StatusReport {
                status: "offline",
                last_seen: Some(seconds_since_seen),
                reason: None,
            },
        }
    }
}

#[derive(Default)]
pub struct LivenessTracker {
    last_image_at: RwLock<Option<Instant>>,
    last_heartbeat_at: RwLock<Option<Instant>>,
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn mark_image_received(&self, now: Instant) {
        *self.last_image_at.write().await = Some(now);
    }

    pub async fn mark_heartbeat(&self, now: Instant) {
        *self.last_heartbeat_at.write().await = Some(now);
    }

    pub async fn last_image_at(&self) -> Option<Instant> {
        *self.last_image_at.read().await
    }

    pub async fn last_heartbeat_at(&self) -> Option<Instant> {
        *self.last_heartbeat_at.read().await
    }

    /// Online iff the newest signal is younger than `threshold`.
    pub async fn status(&self, now: Instant, threshold: Duration) -> DeviceStatus {
        let image = self.last_image_at().await;
        let heartbeat = self.last_heartbeat_at().await;

        let Some(last_seen) = image.into_iter().chain(heartbeat).max() else {
            return DeviceStatus::Unknown;
        };

        let age = now.saturating_duration_since(last_seen);
        let seconds_since_seen = age.as_secs_f64();
        if age < threshold {
            DeviceStatus::Online { seconds_since_seen }
        } else {
            DeviceStatus::Offline { seconds_since_seen }
        }
    }

    pub async fn clear(&self) {
        *self.last_image_at.write().await = None;
        *self.last_heartbeat_at.write().await = None;
    }
}
