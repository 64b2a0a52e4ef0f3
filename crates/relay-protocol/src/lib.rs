//! # relay-protocol
//!
//! Wire shapes shared by the notify-relay core, server and clients.
//!
//! - [`records`] - the persisted channel and message record layouts
//! - [`api`] - HTTP request and response bodies
//! - [`live`] - frames pushed to WebSocket subscribers, with a JSON codec
//!
//! ## Example
//!
//! ```rust
//! use relay_protocol::{live, LiveFrame};
//!
//! let frame = LiveFrame::hello("ab23Cd45");
//! let text = live::encode(&frame).unwrap();
//! assert_eq!(live::decode(&text).unwrap(), frame);
//! ```

pub mod api;
pub mod live;
pub mod records;

pub use api::{ChannelView, EndpointInfo, ErrorBody};
pub use live::{LiveFrame, ProtocolError, LIVE_PROTOCOL_VERSION};
pub use records::{
    ChannelId, ChannelRecord, MessageEntry, MessageRecord, Meta, SubscriberId, Subscription,
};
