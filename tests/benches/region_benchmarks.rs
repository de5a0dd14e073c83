//! # Region Replicator Benchmarks
//!
//! Hot paths on every write and every replicated event:
//!
//! | Component | Operation | Target |
//! |-----------|-----------|--------|
//! | rr-01 Record Store | version-guarded upsert decision | < 1µs |
//! | rr-02 Idempotency Guard | reserve + commit | < 10µs |
//! | shared-bus | event encode/decode | < 10µs |
//! | rr-04 Command Handler | end-to-end local write | < 100µs |

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rr_01_record_store::{decide_upsert, InMemoryRecordStore};
use rr_02_idempotency_guard::{IdempotencyConfig, IdempotencyGuard};
use rr_04_command_handler::{CommandConfig, CommandHandler, UpdateCommand};
use shared_bus::{InMemoryEventLog, ReplicationEvent};
use shared_types::{AttributeUpdate, EntityId, EntityRecord, RegionId};

fn record(version: u64, origin: &str) -> EntityRecord {
    EntityRecord {
        id: EntityId(1),
        price: 450_000.0,
        bedrooms: 3,
        bathrooms: 2,
        region_origin: RegionId::new(origin),
        version,
        updated_at: Utc::now(),
    }
}

// ============================================================================
// RR-01: Upsert decision
// ============================================================================

fn bench_decide_upsert(c: &mut Criterion) {
    let mut group = c.benchmark_group("rr-01-record-store");

    let stored = record(5, "us");
    let newer = record(6, "eu");
    let tie = record(5, "eu");

    group.bench_function("decide_upsert_newer", |b| {
        b.iter(|| black_box(decide_upsert(Some(&stored), black_box(&newer))))
    });
    group.bench_function("decide_upsert_tie", |b| {
        b.iter(|| black_box(decide_upsert(Some(&stored), black_box(&tie))))
    });

    group.finish();
}

// ============================================================================
// RR-02: Idempotency guard
// ============================================================================

fn bench_idempotency_guard(c: &mut Criterion) {
    let mut group = c.benchmark_group("rr-02-idempotency-guard");

    for capacity in [1_000usize, 100_000] {
        let guard = IdempotencyGuard::new(IdempotencyConfig {
            max_entries: capacity,
            ..IdempotencyConfig::default()
        });
        let mut next = 0u64;

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("reserve_and_commit", capacity),
            &capacity,
            |b, _| {
                b.iter(|| {
                    next += 1;
                    let id = format!("req-{next}");
                    black_box(guard.try_reserve(&id));
                    guard.mark_seen(&id);
                })
            },
        );
    }

    group.finish();
}

// ============================================================================
// SHARED-BUS: Wire codec
// ============================================================================

fn bench_event_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared-bus-codec");

    let event = ReplicationEvent::new(record(1, "us"));
    let key = event.key();
    let payload = event.encode().expect("encodes");

    group.bench_function("encode", |b| b.iter(|| black_box(event.encode())));
    group.bench_function("decode", |b| {
        b.iter(|| black_box(ReplicationEvent::decode(&key, black_box(&payload))))
    });

    group.finish();
}

// ============================================================================
// RR-04: Local write path
// ============================================================================

fn bench_command_handler(c: &mut Criterion) {
    let mut group = c.benchmark_group("rr-04-command-handler");
    group.measurement_time(Duration::from_secs(5));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");

    let handler = CommandHandler::new(
        CommandConfig::for_region(RegionId::new("us")),
        Arc::new(IdempotencyGuard::default()),
        Arc::new(InMemoryRecordStore::new()),
        Arc::new(InMemoryEventLog::new()),
    );
    let mut next = 0u64;

    group.bench_function("create_entity", |b| {
        b.iter(|| {
            next += 1;
            let command = UpdateCommand::new(
                EntityId(next),
                format!("req-{next}"),
                AttributeUpdate::price(100.0),
                0,
            );
            black_box(runtime.block_on(handler.handle(command)).is_ok())
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_decide_upsert,
    bench_idempotency_guard,
    bench_event_codec,
    bench_command_handler
);
criterion_main!(benches);
