/// Most recent prediction and the image it was made from.
///
/// The three fields live in one immutable value behind an `Arc`; `replace` swaps
/// the pointer, so readers see either the old pair or the new pair, never a mix.

use crate::pipeline::PredictionResult;
use axum::body::Bytes;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredSnapshot {
    pub result: PredictionResult,
    pub image: Bytes,
    pub image_mime: String,
}

#[derive(Default)]
pub struct StateStore {
    current: RwLock<Option<Arc<StoredSnapshot>>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `snapshot`, discarding whatever was there.
    pub async fn replace(&self, snapshot: StoredSnapshot) {
        let snapshot = Arc::new(snapshot);
        *self.current.write().await = Some(snapshot);
    }

    /// `None` until the first successful inference (or after `clear`).
    pub async fn read(&self) -> Option<Arc<StoredSnapshot>> {
        self.current.read().await.clone()
    }

    pub async fn clear(&self) {
        *self.current.write().await = None;
    }
}
