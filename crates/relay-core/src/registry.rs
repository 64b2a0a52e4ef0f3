//! Channel registry.
//!
//! The registry owns channel identity, creation and subscription records.
//! Nothing else writes channel records.

use crate::error::RelayError;
use crate::id::{generate_channel_id, is_well_formed};
use crate::store::ChannelStore;
use chrono::{SubsecRound, Utc};
use relay_protocol::{ChannelId, ChannelRecord, Meta, SubscriberId, Subscription};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default number of ids tried before registration gives up.
pub const DEFAULT_MAX_ID_ATTEMPTS: usize = 5;

type IdGenerator = Box<dyn Fn() -> ChannelId + Send + Sync>;

/// Creates channels and records their subscriptions.
pub struct ChannelRegistry {
    store: Arc<dyn ChannelStore>,
    generate_id: IdGenerator,
    max_id_attempts: usize,
}

impl ChannelRegistry {
    /// Create a registry over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn ChannelStore>) -> Self {
        Self {
            store,
            generate_id: Box::new(generate_channel_id),
            max_id_attempts: DEFAULT_MAX_ID_ATTEMPTS,
        }
    }

    /// Set how many generated ids are tried before giving up.
    #[must_use]
    pub fn with_max_id_attempts(mut self, attempts: usize) -> Self {
        self.max_id_attempts = attempts.max(1);
        self
    }

    /// Replace the id generator.
    #[must_use]
    pub fn with_id_generator<F>(mut self, generate_id: F) -> Self
    where
        F: Fn() -> ChannelId + Send + Sync + 'static,
    {
        self.generate_id = Box::new(generate_id);
        self
    }

    /// Create a channel with the given metadata and no subscriptions.
    ///
    /// A generated id that is already taken, or that is not well formed, is
    /// discarded and another one drawn.
    ///
    /// # Errors
    ///
    /// Returns `IdSpaceExhausted` if every attempt collided, or a store error.
    pub async fn register_channel(&self, meta: Meta) -> Result<ChannelId, RelayError> {
        for attempt in 1..=self.max_id_attempts {
            let channel_id = (self.generate_id)();
            if !is_well_formed(&channel_id) {
                // Could never be looked up again; never store it.
                warn!(channel = %channel_id, attempt, "Generated channel id is malformed");
                continue;
            }
            let created = Utc::now().trunc_subsecs(6);
            let record = ChannelRecord::new(channel_id.clone(), created, meta.clone());

            if self.store.insert_channel(record).await? {
                info!(channel = %channel_id, "Registered channel");
                return Ok(channel_id);
            }

            warn!(channel = %channel_id, attempt, "Channel id already taken");
        }

        Err(RelayError::IdSpaceExhausted(self.max_id_attempts))
    }

    /// Add or replace a subscription on a channel.
    ///
    /// # Errors
    ///
    /// Returns `NoSuchChannel` if the channel does not exist, or
    /// `InvalidInput` for an empty subscriber id.
    pub async fn add_subscription(
        &self,
        channel_id: &str,
        subscription: Subscription,
    ) -> Result<(), RelayError> {
        if subscription.id.is_empty() {
            return Err(RelayError::InvalidInput("Subscriber id cannot be empty"));
        }
        if !is_well_formed(channel_id) {
            return Err(RelayError::NoSuchChannel(channel_id.to_string()));
        }

        let updated = self
            .store
            .upsert_subscription(channel_id, &subscription.id, subscription.subscription)
            .await?;
        if !updated {
            return Err(RelayError::NoSuchChannel(channel_id.to_string()));
        }

        debug!(channel = %channel_id, subscriber = %subscription.id, "Subscription stored");
        Ok(())
    }

    /// Fetch a channel record.
    ///
    /// # Errors
    ///
    /// Returns `NoSuchChannel` unless exactly one record matches.
    pub async fn get_channel(&self, channel_id: &str) -> Result<ChannelRecord, RelayError> {
        if !is_well_formed(channel_id) {
            return Err(RelayError::NoSuchChannel(channel_id.to_string()));
        }

        let mut records = self.store.find_channels(channel_id).await?;
        if records.len() != 1 {
            if records.len() > 1 {
                warn!(channel = %channel_id, count = records.len(), "Duplicate channel records");
            }
            return Err(RelayError::NoSuchChannel(channel_id.to_string()));
        }

        Ok(records.remove(0))
    }

    /// Check whether a channel exists.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails; a missing channel is `false`.
    pub async fn channel_exists(&self, channel_id: &str) -> Result<bool, RelayError> {
        if !is_well_formed(channel_id) {
            return Ok(false);
        }
        Ok(!self.store.find_channels(channel_id).await?.is_empty())
    }

    /// Subscription records of a channel, for the push delivery mechanism.
    ///
    /// # Errors
    ///
    /// Returns `NoSuchChannel` if the channel does not exist.
    pub async fn subscriptions(
        &self,
        channel_id: &str,
    ) -> Result<BTreeMap<SubscriberId, Value>, RelayError> {
        Ok(self.get_channel(channel_id).await?.subscriptions)
    }
}
