use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use feedline_core::{ContainerId, IdentityId, NewRecord, Record};
use feedline_events::{InMemoryTopicBus, Topic, TopicBus};
use feedline_infra::pagination::{Cursor, CursorCodec, PageWindowResolver, WindowSpec};
use feedline_infra::record_store::{InMemoryRecordStore, RecordSource, RecordStore};
use serde_json::json;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

fn seeded_store(rt: &Runtime, container_id: ContainerId, n: usize) -> Arc<InMemoryRecordStore> {
    let store = Arc::new(InMemoryRecordStore::new());
    rt.block_on(async {
        for i in 0..n {
            store
                .append(NewRecord::new(container_id, IdentityId::new(), json!({ "i": i })))
                .await
                .unwrap();
        }
    });
    store
}

fn bench_cursor_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("cursor_codec");
    let cursor = Cursor::from("18446744073709551615");

    group.bench_function("decode", |b| {
        b.iter(|| CursorCodec::decode(black_box(&cursor)).unwrap());
    });
    group.bench_function("encode", |b| {
        let id = CursorCodec::decode(&cursor).unwrap();
        b.iter(|| CursorCodec::encode(black_box(id)));
    });

    group.finish();
}

fn bench_page_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("page_resolution");
    let rt = runtime();
    let container_id = ContainerId::new();
    let store = seeded_store(&rt, container_id, 10_000);
    let source: Arc<dyn RecordSource> = store;
    let resolver = PageWindowResolver::default();

    for page_size in [10u32, 50, 100] {
        group.throughput(Throughput::Elements(page_size as u64));

        group.bench_with_input(BenchmarkId::new("forward", page_size), &page_size, |b, &n| {
            let spec = WindowSpec::forward(n, Some(Cursor::from("5000")));
            b.iter(|| {
                rt.block_on(async {
                    let conn = resolver
                        .resolve(container_id, &spec, Arc::clone(&source))
                        .await
                        .unwrap();
                    black_box(conn.into_view().await.unwrap())
                })
            });
        });

        group.bench_with_input(BenchmarkId::new("backward", page_size), &page_size, |b, &n| {
            let spec = WindowSpec::backward(n, Some(Cursor::from("5000")));
            b.iter(|| {
                rt.block_on(async {
                    let conn = resolver
                        .resolve(container_id, &spec, Arc::clone(&source))
                        .await
                        .unwrap();
                    black_box(conn.into_view().await.unwrap())
                })
            });
        });
    }

    group.finish();
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");
    let topic = Topic::record_created();
    let record = Arc::new(Record::commit(
        NewRecord::new(ContainerId::new(), IdentityId::new(), json!({ "text": "hello" })),
        feedline_core::RecordId::MIN,
        chrono::Utc::now(),
    ));

    for subscribers in [1usize, 16, 256] {
        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::new("publish", subscribers),
            &subscribers,
            |b, &count| {
                let bus: InMemoryTopicBus<Arc<Record>> = InMemoryTopicBus::new();
                let subs: Vec<_> = (0..count).map(|_| bus.subscribe(&topic)).collect();

                b.iter(|| {
                    let delivered = bus.publish(&topic, Arc::clone(&record));
                    for sub in &subs {
                        sub.drain();
                    }
                    black_box(delivered)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_cursor_codec, bench_page_resolution, bench_fan_out);
criterion_main!(benches);
