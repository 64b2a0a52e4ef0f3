//! Persisted record layouts.
//!
//! Field names are camelCase on the wire and in every storage backend, so a
//! record written by one backend reads back identically from any other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A channel identifier.
pub type ChannelId = String;

/// A caller-chosen subscriber identifier.
pub type SubscriberId = String;

/// Creator-supplied channel metadata.
pub type Meta = serde_json::Map<String, Value>;

/// A stored channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRecord {
    /// Channel identifier, immutable.
    pub channel_id: ChannelId,
    /// Creation time, immutable.
    pub created: DateTime<Utc>,
    /// Metadata supplied at registration.
    #[serde(default)]
    pub meta: Meta,
    /// Subscriber id to opaque push subscription.
    #[serde(default)]
    pub subscriptions: BTreeMap<SubscriberId, Value>,
}

impl ChannelRecord {
    /// Create a fresh record with no subscriptions.
    #[must_use]
    pub fn new(channel_id: impl Into<ChannelId>, created: DateTime<Utc>, meta: Meta) -> Self {
        Self {
            channel_id: channel_id.into(),
            created,
            meta,
            subscriptions: BTreeMap::new(),
        }
    }

    /// Subscriber ids in key order.
    #[must_use]
    pub fn subscriber_ids(&self) -> Vec<SubscriberId> {
        self.subscriptions.keys().cloned().collect()
    }
}

/// A push subscription as submitted by a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscriber id; upserts replace any previous record with this id.
    pub id: SubscriberId,
    /// Opaque payload for the delivery mechanism.
    pub subscription: Value,
}

impl Subscription {
    /// Create a subscription.
    #[must_use]
    pub fn new(id: impl Into<SubscriberId>, subscription: Value) -> Self {
        Self {
            id: id.into(),
            subscription,
        }
    }
}

/// A stored message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    /// Owning channel.
    pub channel_id: ChannelId,
    /// Server-assigned write time; the ordering key.
    pub message_time: DateTime<Utc>,
    /// Opaque text payload.
    pub message: String,
}

impl MessageRecord {
    /// Create a message record.
    #[must_use]
    pub fn new(
        channel_id: impl Into<ChannelId>,
        message: impl Into<String>,
        message_time: DateTime<Utc>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_time,
            message: message.into(),
        }
    }

    /// The caller-facing view of this record.
    #[must_use]
    pub fn into_entry(self) -> MessageEntry {
        MessageEntry {
            message: self.message,
            time: self.message_time,
        }
    }
}

/// A message as returned to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntry {
    /// Message text.
    pub message: String,
    /// Write time.
    pub time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_channel_record_layout() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut meta = Meta::new();
        meta.insert("client".into(), json!("cli"));
        let record = ChannelRecord::new("ab23Cd45", created, meta);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["channelId"], "ab23Cd45");
        assert_eq!(value["created"], "2024-03-01T12:00:00Z");
        assert_eq!(value["meta"]["client"], "cli");
        assert_eq!(value["subscriptions"], json!({}));
    }

    #[test]
    fn test_channel_record_missing_maps_default() {
        let record: ChannelRecord = serde_json::from_value(json!({
            "channelId": "ab23Cd45",
            "created": "2024-03-01T12:00:00Z",
        }))
        .unwrap();

        assert!(record.meta.is_empty());
        assert!(record.subscriptions.is_empty());
    }

    #[test]
    fn test_message_record_layout() {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 5).unwrap();
        let record = MessageRecord::new("ab23Cd45", "hello", time);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["channelId"], "ab23Cd45");
        assert_eq!(value["messageTime"], "2024-03-01T12:00:05Z");
        assert_eq!(value["message"], "hello");

        let entry = record.into_entry();
        assert_eq!(entry.message, "hello");
        assert_eq!(entry.time, time);
    }

    #[test]
    fn test_subscriber_ids_sorted() {
        let mut record = ChannelRecord::new("ab23Cd45", Utc::now(), Meta::new());
        record.subscriptions.insert("zeta".into(), json!({}));
        record.subscriptions.insert("alpha".into(), json!({}));

        assert_eq!(record.subscriber_ids(), vec!["alpha", "zeta"]);
    }
}
