pub mod liveness;
pub mod mailbox;
pub mod snapshot;

use crate::config::Config;
use crate::pipeline::InferencePipeline;
use liveness::LivenessTracker;
use mailbox::CommandMailbox;
use snapshot::StateStore;
use std::sync::Arc;

/// Everything the handlers share. Built once in `main` and handed out as `Arc<AppState>`.
pub struct AppState {
    pub pipeline: Arc<InferencePipeline>,
    pub snapshots: StateStore,
    pub commands: CommandMailbox,
    pub liveness: LivenessTracker,
    pub config: Config,
}

impl AppState {
    pub fn new(pipeline: InferencePipeline, config: Config) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            snapshots: StateStore::new(),
            commands: CommandMailbox::new(),
            liveness: LivenessTracker::new(),
            config,
        }
    }

    /// Drop the stored prediction, any pending command and all liveness signals.
    pub async fn reset(&self) {
        self.snapshots.clear().await;
        self.commands.clear().await;
        self.liveness.clear().await;
    }
}
