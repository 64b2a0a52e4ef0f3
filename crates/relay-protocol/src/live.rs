//! Frames pushed to live (WebSocket) subscribers.
//!
//! Frames are JSON text, internally tagged by `type`. The server only ever
//! sends frames; anything a client sends is ignored apart from control
//! messages handled by the WebSocket layer.

use crate::records::{ChannelId, MessageEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version announced in the `hello` frame.
pub const LIVE_PROTOCOL_VERSION: u8 = 1;

/// Maximum encoded frame size (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Errors raised while encoding or decoding live frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame exceeds maximum size.
    #[error("Frame size {0} exceeds maximum {MAX_FRAME_SIZE}")]
    FrameTooLarge(usize),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A frame sent to a live subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveFrame {
    /// First frame after the upgrade.
    Hello {
        /// Channel being followed.
        #[serde(rename = "channelId")]
        channel_id: ChannelId,
        /// Live protocol version.
        version: u8,
    },

    /// A message appended to the channel.
    Message {
        /// Message text.
        message: String,
        /// Write time.
        time: DateTime<Utc>,
    },

    /// The subscriber fell behind and missed frames; re-read the history.
    Lagged {
        /// Number of skipped messages.
        skipped: u64,
    },

    /// Error notice; the server closes the socket after sending one.
    Error {
        /// Error code.
        code: u16,
        /// Human-readable error message.
        message: String,
    },
}

impl LiveFrame {
    /// Get the frame type name.
    #[must_use]
    pub fn frame_type(&self) -> &'static str {
        match self {
            LiveFrame::Hello { .. } => "hello",
            LiveFrame::Message { .. } => "message",
            LiveFrame::Lagged { .. } => "lagged",
            LiveFrame::Error { .. } => "error",
        }
    }

    /// Create a new Hello frame.
    #[must_use]
    pub fn hello(channel_id: impl Into<ChannelId>) -> Self {
        LiveFrame::Hello {
            channel_id: channel_id.into(),
            version: LIVE_PROTOCOL_VERSION,
        }
    }

    /// Create a new Message frame.
    #[must_use]
    pub fn message(entry: &MessageEntry) -> Self {
        LiveFrame::Message {
            message: entry.message.clone(),
            time: entry.time,
        }
    }

    /// Create a new Lagged frame.
    #[must_use]
    pub fn lagged(skipped: u64) -> Self {
        LiveFrame::Lagged { skipped }
    }

    /// Create a new Error frame.
    #[must_use]
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        LiveFrame::Error {
            code,
            message: message.into(),
        }
    }
}

/// Encode a frame to JSON text.
///
/// # Errors
///
/// Returns an error if the frame is too large or encoding fails.
pub fn encode(frame: &LiveFrame) -> Result<String, ProtocolError> {
    let text = serde_json::to_string(frame)?;

    if text.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(text.len()));
    }

    Ok(text)
}

/// Decode a frame from JSON text.
///
/// # Errors
///
/// Returns an error if the text is too large or not a valid frame.
pub fn decode(text: &str) -> Result<LiveFrame, ProtocolError> {
    if text.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(text.len()));
    }

    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_frame_type() {
        assert_eq!(LiveFrame::hello("ab23Cd45").frame_type(), "hello");
        assert_eq!(LiveFrame::lagged(3).frame_type(), "lagged");
        assert_eq!(LiveFrame::error(404, "gone").frame_type(), "error");
    }

    #[test]
    fn test_message_frame_wire_format() {
        let entry = MessageEntry {
            message: "hello".into(),
            time: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        };

        let text = encode(&LiveFrame::message(&entry)).unwrap();
        assert_eq!(
            text,
            r#"{"type":"message","message":"hello","time":"2024-03-01T12:00:00Z"}"#
        );
    }

    #[test]
    fn test_decode_hello() {
        let frame = decode(r#"{"type":"hello","channelId":"ab23Cd45","version":1}"#).unwrap();
        assert_eq!(frame, LiveFrame::hello("ab23Cd45"));
    }

    #[test]
    fn test_decode_unknown_type() {
        assert!(matches!(
            decode(r#"{"type":"subscribe","channel":"x"}"#),
            Err(ProtocolError::Json(_))
        ));
    }

    #[test]
    fn test_frame_too_large() {
        let frame = LiveFrame::error(500, "x".repeat(MAX_FRAME_SIZE + 1));

        match encode(&frame) {
            Err(ProtocolError::FrameTooLarge(_)) => {}
            other => panic!("Expected FrameTooLarge error, got {:?}", other),
        }
    }
}
