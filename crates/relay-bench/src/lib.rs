//! Shared fixtures for notify-relay benchmarks.

use notify_relay_core::{Meta, RedbStore, Relay, RelayConfig};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::runtime::Runtime;

/// Build a multi-threaded runtime for async benchmarks.
///
/// # Panics
///
/// Panics if the runtime cannot be created.
pub fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}

/// An in-memory relay with one channel holding `messages` messages.
///
/// # Panics
///
/// Panics if the relay rejects the fixture data.
pub async fn seeded_relay(messages: usize) -> (Relay, String) {
    let relay = Relay::in_memory(RelayConfig::default());
    let channel_id = seed(&relay, messages).await;
    (relay, channel_id)
}

/// A redb-backed relay in a temporary directory, seeded like [`seeded_relay`].
/// Keep the returned directory alive for as long as the relay is used.
///
/// # Panics
///
/// Panics if the database cannot be created or rejects the fixture data.
pub async fn seeded_redb_relay(messages: usize) -> (Relay, String, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = RedbStore::open(dir.path().join("bench.redb")).expect("open redb");
    let relay = Relay::with_store(Arc::new(store), RelayConfig::default());
    let channel_id = seed(&relay, messages).await;
    (relay, channel_id, dir)
}

async fn seed(relay: &Relay, messages: usize) -> String {
    let channel_id = relay
        .register_channel(Meta::new())
        .await
        .expect("register channel");
    for i in 0..messages {
        relay
            .put_message(&channel_id, format!("message {}", i))
            .await
            .expect("put message");
    }
    channel_id
}

/// A message body of `size` bytes.
pub fn payload(size: usize) -> String {
    "x".repeat(size)
}
