//! The relay facade.
//!
//! [`Relay`] exposes the four relay operations to transport adapters and
//! forwards every appended message to the live fanout.

use crate::error::RelayError;
use crate::fanout::{Fanout, FanoutStats, DEFAULT_LIVE_CAPACITY};
use crate::message_log::MessageLog;
use crate::registry::{ChannelRegistry, DEFAULT_MAX_ID_ATTEMPTS};
use crate::store::{ChannelStore, MemoryStore, MessageStore};
use relay_protocol::{ChannelId, ChannelRecord, MessageEntry, Meta, Subscription};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Generated ids tried per registration.
    pub max_id_attempts: usize,
    /// Live broadcast capacity per channel.
    pub live_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_id_attempts: DEFAULT_MAX_ID_ATTEMPTS,
            live_capacity: DEFAULT_LIVE_CAPACITY,
        }
    }
}

/// Channel registry, message log and live fanout behind one handle.
pub struct Relay {
    registry: Arc<ChannelRegistry>,
    log: MessageLog,
    fanout: Fanout,
}

impl Relay {
    /// Create a relay over separate channel and message stores.
    #[must_use]
    pub fn new(
        channels: Arc<dyn ChannelStore>,
        messages: Arc<dyn MessageStore>,
        config: RelayConfig,
    ) -> Self {
        info!("Creating relay with config: {:?}", config);
        let registry =
            Arc::new(ChannelRegistry::new(channels).with_max_id_attempts(config.max_id_attempts));
        Self {
            log: MessageLog::new(Arc::clone(&registry), messages),
            registry,
            fanout: Fanout::with_capacity(config.live_capacity),
        }
    }

    /// Create a relay over a store that holds both channels and messages.
    #[must_use]
    pub fn with_store<S>(store: Arc<S>, config: RelayConfig) -> Self
    where
        S: ChannelStore + MessageStore + 'static,
    {
        let channels: Arc<dyn ChannelStore> = store.clone();
        let messages: Arc<dyn MessageStore> = store;
        Self::new(channels, messages, config)
    }

    /// Create a relay over a fresh in-memory store.
    #[must_use]
    pub fn in_memory(config: RelayConfig) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), config)
    }

    /// The channel registry.
    #[must_use]
    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// The message log.
    #[must_use]
    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// Live fanout statistics.
    #[must_use]
    pub fn live_stats(&self) -> FanoutStats {
        self.fanout.stats()
    }

    /// Create a channel.
    ///
    /// # Errors
    ///
    /// See [`ChannelRegistry::register_channel`].
    pub async fn register_channel(&self, meta: Meta) -> Result<ChannelId, RelayError> {
        self.registry.register_channel(meta).await
    }

    /// Add or replace a subscription.
    ///
    /// # Errors
    ///
    /// See [`ChannelRegistry::add_subscription`].
    pub async fn add_subscription(
        &self,
        channel_id: &str,
        subscription: Subscription,
    ) -> Result<(), RelayError> {
        self.registry.add_subscription(channel_id, subscription).await
    }

    /// Fetch a channel record.
    ///
    /// # Errors
    ///
    /// See [`ChannelRegistry::get_channel`].
    pub async fn get_channel(&self, channel_id: &str) -> Result<ChannelRecord, RelayError> {
        self.registry.get_channel(channel_id).await
    }

    /// Append a message and push it to live followers.
    ///
    /// # Errors
    ///
    /// See [`MessageLog::put_message`].
    pub async fn put_message(
        &self,
        channel_id: &str,
        message: impl Into<String>,
    ) -> Result<MessageEntry, RelayError> {
        let entry = self.log.put_message(channel_id, message).await?;
        let recipients = self.fanout.publish(channel_id, entry.clone());
        debug!(channel = %channel_id, recipients, "Message relayed");
        Ok(entry)
    }

    /// All messages of a channel, newest first.
    ///
    /// # Errors
    ///
    /// See [`MessageLog::get_messages`].
    pub async fn get_messages(&self, channel_id: &str) -> Result<Vec<MessageEntry>, RelayError> {
        self.log.get_messages(channel_id).await
    }

    /// Follow a channel's new messages.
    ///
    /// # Errors
    ///
    /// Returns `NoSuchChannel` if the channel does not exist.
    pub async fn follow(
        &self,
        channel_id: &str,
    ) -> Result<broadcast::Receiver<Arc<MessageEntry>>, RelayError> {
        if !self.registry.channel_exists(channel_id).await? {
            return Err(RelayError::NoSuchChannel(channel_id.to_string()));
        }
        Ok(self.fanout.subscribe(channel_id))
    }

    /// Stop following a channel. Consumes the receiver.
    pub fn unfollow(&self, channel_id: &str, receiver: broadcast::Receiver<Arc<MessageEntry>>) {
        drop(receiver);
        self.fanout.release(channel_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RedbStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_full_flow_in_memory() {
        let relay = Relay::in_memory(RelayConfig::default());
        let id = relay.register_channel(Meta::new()).await.unwrap();

        relay
            .add_subscription(&id, Subscription::new("s1", json!({"endpoint": "e"})))
            .await
            .unwrap();
        relay.put_message(&id, "hello").await.unwrap();
        relay.put_message(&id, "world").await.unwrap();

        let record = relay.get_channel(&id).await.unwrap();
        assert_eq!(record.subscriber_ids(), vec!["s1"]);

        let texts: Vec<_> = relay
            .get_messages(&id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.message)
            .collect();
        assert_eq!(texts, vec!["world", "hello"]);
    }

    #[tokio::test]
    async fn test_full_flow_redb() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(RedbStore::open(dir.path().join("relay.redb")).unwrap());
        let relay = Relay::with_store(store, RelayConfig::default());

        let id = relay.register_channel(Meta::new()).await.unwrap();
        relay.put_message(&id, "hello").await.unwrap();
        relay.put_message(&id, "world").await.unwrap();

        let texts: Vec<_> = relay
            .get_messages(&id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.message)
            .collect();
        assert_eq!(texts, vec!["world", "hello"]);
        assert!(matches!(
            relay.get_messages("nonexistent").await,
            Err(RelayError::NoSuchChannel(_))
        ));
    }

    #[tokio::test]
    async fn test_follow_receives_new_messages() {
        let relay = Relay::in_memory(RelayConfig::default());
        let id = relay.register_channel(Meta::new()).await.unwrap();

        let mut rx = relay.follow(&id).await.unwrap();
        let entry = relay.put_message(&id, "live").await.unwrap();

        assert_eq!(*rx.recv().await.unwrap(), entry);
        assert_eq!(relay.live_stats().follower_count, 1);

        relay.unfollow(&id, rx);
        assert_eq!(relay.live_stats().channel_count, 0);
    }

    #[tokio::test]
    async fn test_follow_missing_channel() {
        let relay = Relay::in_memory(RelayConfig::default());
        assert!(matches!(
            relay.follow("abcdefgh").await,
            Err(RelayError::NoSuchChannel(_))
        ));
        assert_eq!(relay.live_stats().channel_count, 0);
    }
}
