//! HTTP request and response bodies.

use crate::records::{ChannelId, MessageEntry, SubscriberId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where to send messages for a channel and where to subscribe to it.
///
/// Returned by channel registration and by the channel info endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointInfo {
    /// Channel identifier.
    #[serde(rename = "channelId")]
    pub channel_id: ChannelId,
    /// URL that accepts message posts.
    pub endpoint: String,
    /// Web page for subscribing to the channel.
    pub channel_page: String,
}

/// Full channel view served to subscribers and polling clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelView {
    /// Channel identifier.
    pub channel_id: ChannelId,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Messages, newest first.
    pub messages: Vec<MessageEntry>,
    /// Registered subscriber ids.
    pub subscriptions: Vec<SubscriberId>,
    /// Public key subscribers pass to the push service.
    pub pub_key: String,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Machine-readable error kind.
    pub error: String,
    /// Human-readable description.
    pub message: String,
    /// Offending channel, if the error concerns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<ChannelId>,
}

impl ErrorBody {
    /// Create an error body without a channel reference.
    #[must_use]
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            channel_id: None,
        }
    }

    /// Attach the offending channel id.
    #[must_use]
    pub fn with_channel(mut self, channel_id: impl Into<ChannelId>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_info_field_names() {
        let info = EndpointInfo {
            channel_id: "ab23Cd45".into(),
            endpoint: "https://relay.example/ab23Cd45".into(),
            channel_page: "https://relay.example/c/ab23Cd45".into(),
        };

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(
            value,
            json!({
                "channelId": "ab23Cd45",
                "endpoint": "https://relay.example/ab23Cd45",
                "channel_page": "https://relay.example/c/ab23Cd45",
            })
        );
    }

    #[test]
    fn test_error_body_omits_missing_channel() {
        let body = ErrorBody::new("bad_request", "nope");
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("channelId").is_none());

        let body = body.with_channel("zz");
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["channelId"], "zz");
    }
}
