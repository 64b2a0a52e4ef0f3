//! # notify-relay-core
//!
//! The channel and message relay model behind notify-relay.
//!
//! - **ChannelRegistry** - channel identity, creation and subscription records
//! - **MessageLog** - append-only, newest-first message history per channel
//! - **Store** - the backing-store ports, with in-memory and redb backends
//! - **Fanout** - hands freshly appended messages to live subscribers
//! - **Relay** - wires the above together behind the four relay operations
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │    Relay    │────▶│ MessageLog  │────▶│ MessageStore│
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                   │ exists?
//!        │            ┌─────────────┐     ┌─────────────┐
//!        ├───────────▶│  Registry   │────▶│ ChannelStore│
//!        │            └─────────────┘     └─────────────┘
//!        ▼
//! ┌─────────────┐
//! │   Fanout    │
//! └─────────────┘
//! ```

pub mod error;
pub mod fanout;
pub mod id;
pub mod message_log;
pub mod registry;
pub mod relay;
pub mod store;

pub use error::RelayError;
pub use fanout::{Fanout, FanoutStats};
pub use message_log::MessageLog;
pub use registry::ChannelRegistry;
pub use relay::{Relay, RelayConfig};
pub use store::{ChannelStore, MemoryStore, MessageStore, RedbStore, StoreError};

pub use relay_protocol::{
    ChannelId, ChannelRecord, MessageEntry, MessageRecord, Meta, SubscriberId, Subscription,
};
