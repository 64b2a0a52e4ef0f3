//! Throughput benchmarks for notify-relay.
//!
//! These benchmarks measure the raw throughput of the relay operations.

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use notify_relay_bench::{payload, runtime, seeded_redb_relay, seeded_relay};
use notify_relay_core::{id, Meta, Relay, RelayConfig};
use relay_protocol::{live, LiveFrame, MessageEntry};

/// Benchmark channel id generation.
fn bench_generate_id(c: &mut Criterion) {
    c.bench_function("generate_channel_id", |b| b.iter(id::generate_channel_id));
}

/// Benchmark channel registration.
fn bench_register(c: &mut Criterion) {
    let rt = runtime();
    let relay = Relay::in_memory(RelayConfig::default());
    let relay = &relay;

    c.bench_function("register_channel", |b| {
        b.to_async(&rt)
            .iter(|| async move { relay.register_channel(Meta::new()).await.unwrap() });
    });
}

/// Benchmark message appends by body size.
fn bench_put_message(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("put_message");

    for size in [64usize, 1024] {
        let (relay, channel_id) = rt.block_on(seeded_relay(0));
        let (relay, channel_id) = (&relay, channel_id.as_str());
        let body = payload(size);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("memory", size), &body, |b, body| {
            b.to_async(&rt).iter(|| async move {
                relay.put_message(channel_id, body.clone()).await.unwrap()
            });
        });
    }

    let (relay, channel_id, _dir) = rt.block_on(seeded_redb_relay(0));
    let (relay, channel_id) = (&relay, channel_id.as_str());
    let body = payload(64);
    let body = &body;
    group.throughput(Throughput::Bytes(64));
    group.bench_function(BenchmarkId::new("redb", 64), |b| {
        b.to_async(&rt).iter(|| async move {
            relay.put_message(channel_id, body.clone()).await.unwrap()
        });
    });

    group.finish();
}

/// Benchmark history reads by history length.
fn bench_get_messages(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("get_messages");

    for count in [10usize, 100, 1000] {
        let (relay, channel_id) = rt.block_on(seeded_relay(count));
        let (relay, channel_id) = (&relay, channel_id.as_str());

        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(BenchmarkId::new("memory", count), |b| {
            b.to_async(&rt)
                .iter(|| async move { relay.get_messages(black_box(channel_id)).await.unwrap() });
        });
    }

    let (relay, channel_id, _dir) = rt.block_on(seeded_redb_relay(100));
    let (relay, channel_id) = (&relay, channel_id.as_str());
    group.throughput(Throughput::Elements(100));
    group.bench_function(BenchmarkId::new("redb", 100), |b| {
        b.to_async(&rt)
            .iter(|| async move { relay.get_messages(black_box(channel_id)).await.unwrap() });
    });

    group.finish();
}

/// Benchmark live frame encoding.
fn bench_encode_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_frame");

    for size in [64usize, 1024] {
        let entry = MessageEntry {
            message: payload(size),
            time: Utc::now(),
        };
        let frame = LiveFrame::message(&entry);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &frame, |b, frame| {
            b.iter(|| live::encode(black_box(frame)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_generate_id,
    bench_register,
    bench_put_message,
    bench_get_messages,
    bench_encode_frame,
);
criterion_main!(benches);
