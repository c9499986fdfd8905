// src/watch/broadcast.rs

//! Public side channel for change notifications.
//!
//! Third parties (plugins, editors, tests) can subscribe and receive a
//! `(kind, path)` notification for every observed change, independently of
//! whether any task runs. Emission is fire-and-forget.

use tokio::sync::broadcast;
use tracing::debug;

use crate::types::{ChangeKind, TargetName};

pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotification {
    pub kind: ChangeKind,
    pub path: String,
    /// Target whose session observed the change.
    pub target: TargetName,
}

#[derive(Debug, Clone)]
pub struct ChangeBroadcast {
    sender: broadcast::Sender<ChangeNotification>,
}

impl Default for ChangeBroadcast {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_CAPACITY)
    }
}

impl ChangeBroadcast {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a listener.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.sender.subscribe()
    }

    pub fn has_listeners(&self) -> bool {
        self.sender.receiver_count() > 0
    }

    /// Send to every current listener. Returns `false` when nobody is
    /// listening, in which case nothing is sent.
    pub fn emit(&self, notification: ChangeNotification) -> bool {
        if !self.has_listeners() {
            return false;
        }
        match self.sender.send(notification) {
            Ok(receivers) => {
                debug!(receivers, "broadcast change notification");
                true
            }
            // Last listener dropped between the check and the send.
            Err(_) => false,
        }
    }
}
