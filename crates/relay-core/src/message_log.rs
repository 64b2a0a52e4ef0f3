//! Per-channel message log.

use crate::error::RelayError;
use crate::registry::ChannelRegistry;
use crate::store::MessageStore;
use chrono::{SubsecRound, Utc};
use relay_protocol::{MessageEntry, MessageRecord};
use std::sync::Arc;
use tracing::trace;

/// Append-only message history, read newest first.
///
/// Every operation checks channel existence through the registry first.
pub struct MessageLog {
    registry: Arc<ChannelRegistry>,
    store: Arc<dyn MessageStore>,
}

impl MessageLog {
    /// Create a log over the given store.
    #[must_use]
    pub fn new(registry: Arc<ChannelRegistry>, store: Arc<dyn MessageStore>) -> Self {
        Self { registry, store }
    }

    /// Append a message stamped with the current time.
    ///
    /// Returns the stored entry.
    ///
    /// # Errors
    ///
    /// Returns `NoSuchChannel` if the channel does not exist.
    pub async fn put_message(
        &self,
        channel_id: &str,
        message: impl Into<String>,
    ) -> Result<MessageEntry, RelayError> {
        self.ensure_channel(channel_id).await?;

        // Microseconds survive every backend unchanged.
        let time = Utc::now().trunc_subsecs(6);
        let record = MessageRecord::new(channel_id, message, time);
        self.store.append_message(record.clone()).await?;

        trace!(channel = %channel_id, bytes = record.message.len(), "Stored message");
        Ok(record.into_entry())
    }

    /// All messages of a channel, newest first.
    ///
    /// # Errors
    ///
    /// Returns `NoSuchChannel` if the channel does not exist.
    pub async fn get_messages(&self, channel_id: &str) -> Result<Vec<MessageEntry>, RelayError> {
        self.ensure_channel(channel_id).await?;

        let records = self.store.query_messages(channel_id).await?;
        Ok(records.into_iter().map(MessageRecord::into_entry).collect())
    }

    async fn ensure_channel(&self, channel_id: &str) -> Result<(), RelayError> {
        if self.registry.channel_exists(channel_id).await? {
            Ok(())
        } else {
            Err(RelayError::NoSuchChannel(channel_id.to_string()))
        }
    }
}
