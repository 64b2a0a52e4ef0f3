//! Backing-store ports.
//!
//! The registry and the log only ever talk to these traits. Each method maps
//! to a single store call, and each backend makes that call atomic:
//! conditional create, single-key subscription upsert, insert-only append and
//! a snapshot range read.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use async_trait::async_trait;
use relay_protocol::{ChannelRecord, MessageRecord};
use serde_json::Value;
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database could not be opened.
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Table could not be opened.
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Transaction could not be started.
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Transaction could not be committed.
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Read or write failed.
    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    /// Stored record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Blocking store task panicked or was cancelled.
    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Channel records, keyed by channel id.
#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// Insert a record unless its id is taken.
    ///
    /// Returns `false`, leaving the existing record untouched, if a channel
    /// with the same id already exists.
    async fn insert_channel(&self, record: ChannelRecord) -> Result<bool, StoreError>;

    /// All records whose id equals `channel_id`.
    async fn find_channels(&self, channel_id: &str) -> Result<Vec<ChannelRecord>, StoreError>;

    /// Set `subscriptions[subscriber_id] = subscription` on a channel.
    ///
    /// Returns `false` without writing anything if the channel is missing.
    async fn upsert_subscription(
        &self,
        channel_id: &str,
        subscriber_id: &str,
        subscription: Value,
    ) -> Result<bool, StoreError>;
}

/// Message records, keyed by channel id and write time.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append a record. Records are never updated.
    async fn append_message(&self, record: MessageRecord) -> Result<(), StoreError>;

    /// All records of a channel, newest first.
    ///
    /// Records with equal timestamps come back in reverse insertion order.
    async fn query_messages(&self, channel_id: &str) -> Result<Vec<MessageRecord>, StoreError>;
}
