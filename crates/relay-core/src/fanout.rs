//! Live fanout of appended messages.
//!
//! Each followed channel gets a broadcast sender; connections hold receivers.
//! The message log stays the source of truth, so a lagging receiver simply
//! skips ahead.

use dashmap::DashMap;
use relay_protocol::{ChannelId, MessageEntry};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Default broadcast capacity per channel.
pub const DEFAULT_LIVE_CAPACITY: usize = 256;

/// Per-channel broadcast hub.
#[derive(Debug)]
pub struct Fanout {
    senders: DashMap<ChannelId, broadcast::Sender<Arc<MessageEntry>>>,
    capacity: usize,
}

impl Fanout {
    /// Create a hub with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LIVE_CAPACITY)
    }

    /// Create a hub with a specific per-channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            senders: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Follow a channel.
    pub fn subscribe(&self, channel_id: &str) -> broadcast::Receiver<Arc<MessageEntry>> {
        let sender = self
            .senders
            .entry(channel_id.to_string())
            .or_insert_with(|| {
                debug!(channel = %channel_id, "Opening live channel");
                broadcast::channel(self.capacity).0
            });
        sender.subscribe()
    }

    /// Hand an entry to everyone following the channel.
    ///
    /// Returns the number of receivers reached; zero when nobody follows.
    pub fn publish(&self, channel_id: &str, entry: MessageEntry) -> usize {
        match self.senders.get(channel_id) {
            Some(sender) => {
                let count = sender.send(Arc::new(entry)).unwrap_or_default();
                trace!(channel = %channel_id, recipients = count, "Fanned out message");
                count
            }
            None => 0,
        }
    }

    /// Drop the channel's sender once its last receiver is gone.
    ///
    /// Returns `true` if the sender was removed.
    pub fn release(&self, channel_id: &str) -> bool {
        let removed = self
            .senders
            .remove_if(channel_id, |_, sender| sender.receiver_count() == 0)
            .is_some();
        if removed {
            debug!(channel = %channel_id, "Closed live channel");
        }
        removed
    }

    /// Number of receivers following a channel.
    #[must_use]
    pub fn follower_count(&self, channel_id: &str) -> usize {
        self.senders
            .get(channel_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    /// Hub statistics.
    #[must_use]
    pub fn stats(&self) -> FanoutStats {
        FanoutStats {
            channel_count: self.senders.len(),
            follower_count: self.senders.iter().map(|s| s.receiver_count()).sum(),
        }
    }
}

impl Default for Fanout {
    fn default() -> Self {
        Self::new()
    }
}

/// Fanout statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanoutStats {
    /// Channels with an open sender.
    pub channel_count: usize,
    /// Receivers across all channels.
    pub follower_count: usize,
}
