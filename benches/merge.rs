//! Benchmarks for smsmerge grouping and merging

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use smsmerge::{merge, AggregationStore, Message, SIZE_LIMIT};

fn generate_group(count: usize, body_len: usize) -> Vec<Message> {
    (0..count)
        .map(|_| Message::new("acme", "31600000000", "x".repeat(body_len)).unwrap())
        .collect()
}

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition");

    for body_len in [10usize, 50, 160] {
        let msgs = generate_group(100, body_len);
        group.throughput(Throughput::Elements(msgs.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("group_of_100", body_len),
            &msgs,
            |b, msgs| {
                b.iter(|| {
                    let split = merge::partition(msgs.clone(), SIZE_LIMIT);
                    black_box(split);
                })
            },
        );
    }

    group.finish();
}

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");

    let msgs: Vec<Message> = (0..1000)
        .map(|i| Message::new("acme", format!("316{:04}", i % 50), "ping").unwrap())
        .collect();

    group.throughput(Throughput::Elements(1000));

    group.bench_function("insert_1000_into_50_groups", |b| {
        b.iter(|| {
            let store = AggregationStore::new();
            for msg in &msgs {
                black_box(store.insert(msg.clone()));
            }
            black_box(store.group_count());
        })
    });

    group.bench_function("insert_and_drain", |b| {
        b.iter(|| {
            let store = AggregationStore::new();
            for msg in &msgs {
                store.insert(msg.clone());
            }
            for msg in msgs.iter().take(50) {
                let key = msg.key();
                let drained = store.drain(&key, |group| {
                    let split = merge::partition(group, SIZE_LIMIT);
                    (split.accepted(), split.remainder)
                });
                black_box(drained);
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_partition, bench_store);
criterion_main!(benches);
