//! Durable store on an embedded redb database.
//!
//! Tables:
//! - channels: channel id → channel record JSON
//! - messages: (channel id, time in µs, seq) → message record JSON
//! - meta: key → u64 counters
//!
//! The message key sorts by time and then by a store-wide sequence number
//! bumped in the same write transaction, so a reverse range scan over one
//! channel yields newest-first order with insertion-order tie-breaking.

use super::{ChannelStore, MessageStore, StoreError};
use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use relay_protocol::{ChannelRecord, MessageRecord};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

const CHANNELS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("channels");
const MESSAGES_TABLE: TableDefinition<(&str, i64, u64), &[u8]> = TableDefinition::new("messages");
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_MESSAGE_SEQ: &str = "next_message_seq";

/// A store persisted to a single redb file.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the tables created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = Database::create(path)?;

        // Ensure tables exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CHANNELS_TABLE)?;
            let _ = write_txn.open_table(MESSAGES_TABLE)?;
            let _ = write_txn.open_table(META_TABLE)?;
        }
        write_txn.commit()?;

        debug!(path = %path.display(), "Opened redb store");
        Ok(Self { db: Arc::new(db) })
    }

    /// Run a blocking database closure off the async runtime.
    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db)).await?
    }
}

#[async_trait]
impl ChannelStore for RedbStore {
    async fn insert_channel(&self, record: ChannelRecord) -> Result<bool, StoreError> {
        self.blocking(move |db| {
            let bytes = serde_json::to_vec(&record)?;
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(CHANNELS_TABLE)?;
                if table.get(record.channel_id.as_str())?.is_some() {
                    // Dropping the transaction aborts it.
                    return Ok(false);
                }
                table.insert(record.channel_id.as_str(), bytes.as_slice())?;
            }
            write_txn.commit()?;
            Ok(true)
        })
        .await
    }

    async fn find_channels(&self, channel_id: &str) -> Result<Vec<ChannelRecord>, StoreError> {
        let channel_id = channel_id.to_string();
        self.blocking(move |db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(CHANNELS_TABLE)?;
            let mut records = Vec::new();
            if let Some(value) = table.get(channel_id.as_str())? {
                records.push(serde_json::from_slice(value.value())?);
            }
            Ok(records)
        })
        .await
    }

    async fn upsert_subscription(
        &self,
        channel_id: &str,
        subscriber_id: &str,
        subscription: Value,
    ) -> Result<bool, StoreError> {
        let channel_id = channel_id.to_string();
        let subscriber_id = subscriber_id.to_string();
        self.blocking(move |db| {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(CHANNELS_TABLE)?;
                let existing = table
                    .get(channel_id.as_str())?
                    .map(|value| value.value().to_vec());
                let Some(existing) = existing else {
                    return Ok(false);
                };

                let mut record: ChannelRecord = serde_json::from_slice(&existing)?;
                record.subscriptions.insert(subscriber_id, subscription);
                let bytes = serde_json::to_vec(&record)?;
                table.insert(channel_id.as_str(), bytes.as_slice())?;
            }
            write_txn.commit()?;
            Ok(true)
        })
        .await
    }
}

#[async_trait]
impl MessageStore for RedbStore {
    async fn append_message(&self, record: MessageRecord) -> Result<(), StoreError> {
        self.blocking(move |db| {
            let bytes = serde_json::to_vec(&record)?;
            let micros = record.message_time.timestamp_micros();
            let write_txn = db.begin_write()?;
            {
                let mut meta = write_txn.open_table(META_TABLE)?;
                let seq = meta.get(NEXT_MESSAGE_SEQ)?.map(|v| v.value()).unwrap_or(0);
                meta.insert(NEXT_MESSAGE_SEQ, seq + 1)?;

                let mut messages = write_txn.open_table(MESSAGES_TABLE)?;
                messages.insert((record.channel_id.as_str(), micros, seq), bytes.as_slice())?;
                trace!(channel = %record.channel_id, seq, "Appended message");
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn query_messages(&self, channel_id: &str) -> Result<Vec<MessageRecord>, StoreError> {
        let channel_id = channel_id.to_string();
        self.blocking(move |db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(MESSAGES_TABLE)?;
            let start = (channel_id.as_str(), i64::MIN, 0u64);
            let end = (channel_id.as_str(), i64::MAX, u64::MAX);

            let mut records = Vec::new();
            for entry in table.range(start..=end)?.rev() {
                let (_, value) = entry?;
                records.push(serde_json::from_slice(value.value())?);
            }
            Ok(records)
        })
        .await
    }
}
