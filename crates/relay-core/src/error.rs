//! Relay errors.

use crate::store::StoreError;
use relay_protocol::ChannelId;
use thiserror::Error;

/// Errors returned by relay operations.
///
/// `NoSuchChannel` is the only domain error; the rest are infrastructure
/// failures passed through to the caller untouched.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No channel with this id exists.
    #[error("No such channel: {0}")]
    NoSuchChannel(ChannelId),

    /// Malformed caller input.
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),

    /// Every generated id collided with an existing channel.
    #[error("Could not allocate a channel id after {0} attempts")]
    IdSpaceExhausted(usize),

    /// Backing store failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl RelayError {
    /// The channel id carried by a `NoSuchChannel` error.
    #[must_use]
    pub fn missing_channel(&self) -> Option<&str> {
        match self {
            RelayError::NoSuchChannel(id) => Some(id),
            _ => None,
        }
    }
}
