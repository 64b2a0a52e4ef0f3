//! In-memory store.

use super::{ChannelStore, MessageStore, StoreError};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use relay_protocol::{ChannelId, ChannelRecord, MessageRecord};
use serde_json::Value;
use tracing::trace;

/// A store that lives and dies with the process.
///
/// Each operation holds a single `DashMap` shard lock, which gives the same
/// per-item atomicity a document store would.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Channels indexed by id.
    channels: DashMap<ChannelId, ChannelRecord>,
    /// Per-channel messages, ascending by time, ties in insertion order.
    messages: DashMap<ChannelId, Vec<MessageRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of stored messages across all channels.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.iter().map(|m| m.len()).sum()
    }
}

#[async_trait]
impl ChannelStore for MemoryStore {
    async fn insert_channel(&self, record: ChannelRecord) -> Result<bool, StoreError> {
        match self.channels.entry(record.channel_id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(true)
            }
        }
    }

    async fn find_channels(&self, channel_id: &str) -> Result<Vec<ChannelRecord>, StoreError> {
        Ok(self
            .channels
            .get(channel_id)
            .map(|record| vec![record.clone()])
            .unwrap_or_default())
    }

    async fn upsert_subscription(
        &self,
        channel_id: &str,
        subscriber_id: &str,
        subscription: Value,
    ) -> Result<bool, StoreError> {
        match self.channels.get_mut(channel_id) {
            Some(mut record) => {
                record
                    .subscriptions
                    .insert(subscriber_id.to_string(), subscription);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append_message(&self, record: MessageRecord) -> Result<(), StoreError> {
        let mut log = self.messages.entry(record.channel_id.clone()).or_default();
        // Clocks can step backwards; keep the vector sorted by time.
        let position = log.partition_point(|m| m.message_time <= record.message_time);
        trace!(channel = %record.channel_id, position, "Appending message");
        log.insert(position, record);
        Ok(())
    }

    async fn query_messages(&self, channel_id: &str) -> Result<Vec<MessageRecord>, StoreError> {
        Ok(self
            .messages
            .get(channel_id)
            .map(|log| log.iter().rev().cloned().collect())
            .unwrap_or_default())
    }
}
