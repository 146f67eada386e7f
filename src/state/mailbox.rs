/// Single-slot command mailbox the device polls.
///
/// Delivery is at most once: `take` empties the slot under the same lock it
/// reads it with, so among concurrent pollers only one gets the command.

use serde::Serialize;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum DeviceCommand {
    Spray { volume_ml: f64 },
    Stop,
    Capture,
    #[default]
    None,
}

impl DeviceCommand {
    pub fn is_none(&self) -> bool {
        matches!(self, DeviceCommand::None)
    }
}

#[derive(Default)]
pub struct CommandMailbox {
    slot: Mutex<DeviceCommand>,
}

impl CommandMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `command`. Spray and stop replace anything pending; capture is only
    /// queued into an empty slot. Returns whether the slot now holds `command`.
    pub async fn put(&self, command: DeviceCommand) -> bool {
        let mut slot = self.slot.lock().await;
        match command {
            DeviceCommand::None => false,
            DeviceCommand::Capture if !slot.is_none() => false,
            _ => {
                *slot = command;
                true
            }
        }
    }

    /// Remove and return the pending command, or `DeviceCommand::None`.
    pub async fn take(&self) -> DeviceCommand {
        std::mem::take(&mut *self.slot.lock().await)
    }

    pub async fn peek(&self) -> DeviceCommand {
        *self.slot.lock().await
    }

    pub async fn clear(&self) {
        *self.slot.lock().await = DeviceCommand::None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn take_on_empty_is_none() {
        assert_eq!(CommandMailbox::new().take().await, DeviceCommand::None);
    }

    #[tokio::test]
    async fn take_clears_the_slot() {
        let mailbox = CommandMailbox::new();
        assert!(mailbox.put(DeviceCommand::Stop).await);
        assert_eq!(mailbox.take().await, DeviceCommand::Stop);
        assert_eq!(mailbox.take().await, DeviceCommand::None);
    }

    #[tokio::test]
    async fn newer_command_preempts_older() {
        let mailbox = CommandMailbox::new();
        mailbox.put(DeviceCommand::Spray { volume_ml: 5.0 }).await;
        mailbox.put(DeviceCommand::Spray { volume_ml: 7.5 }).await;
        assert_eq!(mailbox.peek().await, DeviceCommand::Spray { volume_ml: 7.5 });

        mailbox.put(DeviceCommand::Stop).await;
        assert_eq!(mailbox.take().await, DeviceCommand::Stop);
    }

    #[tokio::test]
    async fn capture_does_not_clobber_pending_command() {
        let mailbox = CommandMailbox::new();
        mailbox.put(DeviceCommand::Spray { volume_ml: 3.0 }).await;
        assert!(!mailbox.put(DeviceCommand::Capture).await);
        assert_eq!(mailbox.take().await, DeviceCommand::Spray { volume_ml: 3.0 });

        assert!(mailbox.put(DeviceCommand::Capture).await);
        assert_eq!(mailbox.take().await, DeviceCommand::Capture);
    }

    #[tokio::test]
    async fn spray_replaces_pending_capture() {
        let mailbox = CommandMailbox::new();
        mailbox.put(DeviceCommand::Capture).await;
        assert!(mailbox.put(DeviceCommand::Spray { volume_ml: 1.0 }).await);
        assert_eq!(mailbox.take().await, DeviceCommand::Spray { volume_ml: 1.0 });
    }

    #[tokio::test]
    async fn putting_none_is_ignored() {
        let mailbox = CommandMailbox::new();
        mailbox.put(DeviceCommand::Stop).await;
        assert!(!mailbox.put(DeviceCommand::None).await);
        assert_eq!(mailbox.take().await, DeviceCommand::Stop);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_takes_deliver_once() {
        for _ in 0..50 {
            let mailbox = Arc::new(CommandMailbox::new());
            mailbox.put(DeviceCommand::Spray { volume_ml: 5.0 }).await;

            let takers: Vec<_> = (0..8)
                .map(|_| {
                    let mailbox = mailbox.clone();
                    tokio::spawn(async move { mailbox.take().await })
                })
                .collect();

            let taken: Vec<DeviceCommand> = futures::future::join_all(takers)
                .await
                .into_iter()
                .map(|r| r.unwrap())
                .collect();

            let delivered: Vec<_> = taken.iter().filter(|c| !c.is_none()).collect();
            assert_eq!(delivered, vec![&DeviceCommand::Spray { volume_ml: 5.0 }]);
        }
    }

    #[test]
    fn wire_format() {
        let spray = serde_json::to_value(DeviceCommand::Spray { volume_ml: 12.5 }).unwrap();
        assert_eq!(spray, serde_json::json!({"command": "spray", "volume_ml": 12.5}));
        assert_eq!(
            serde_json::to_value(DeviceCommand::Stop).unwrap(),
            serde_json::json!({"command": "stop"})
        );
        assert_eq!(
            serde_json::to_value(DeviceCommand::Capture).unwrap(),
            serde_json::json!({"command": "capture"})
        );
        assert_eq!(
            serde_json::to_value(DeviceCommand::None).unwrap(),
            serde_json::json!({"command": "none"})
        );
    }
}
