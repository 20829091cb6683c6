//! Throughput benchmarks for tallykv
//!
//! Measures the command path (dispatcher, type guard, keyspace) and the RESP
//! decoder under a few representative workloads.

use bytes::{Bytes, BytesMut};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;
use tallykv::commands::Dispatcher;
use tallykv::protocol::{decode, encode_request};
use tallykv::storage::Keyspace;

fn frame(parts: &[&str]) -> Vec<Bytes> {
    parts
        .iter()
        .map(|p| Bytes::copy_from_slice(p.as_bytes()))
        .collect()
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new(Arc::new(Keyspace::new()))
}

/// Benchmark HSET on fresh fields
fn bench_hset(c: &mut Criterion) {
    let d = dispatcher();

    let mut group = c.benchmark_group("hset");
    group.throughput(Throughput::Elements(1));

    group.bench_function("hset_spread", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("hash:{}", i % 1000);
            let field = format!("field:{}", i);
            black_box(d.execute(&frame(&["HSET", &key, &field, "value"])).unwrap());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark HINCRBYFLOAT
fn bench_hincrbyfloat(c: &mut Criterion) {
    let d = dispatcher();

    let mut group = c.benchmark_group("hincrbyfloat");
    group.throughput(Throughput::Elements(1));

    // Single field (high contention on one shard)
    group.bench_function("single_field", |b| {
        let request = frame(&["HINCRBYFLOAT", "prices", "apple", "0.1"]);
        b.iter(|| {
            black_box(d.execute(&request).unwrap());
        });
    });

    // Many keys (spread over shards)
    group.bench_function("many_keys", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("prices:{}", i % 1000);
            let request = frame(&["HINCRBYFLOAT", &key, "f", "1.5"]);
            black_box(d.execute(&request).unwrap());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark mixed workload (80% reads, 20% writes)
fn bench_mixed(c: &mut Criterion) {
    let d = dispatcher();

    for i in 0..10_000 {
        let key = format!("key:{}", i);
        let value = format!("value:{}", i);
        d.execute(&frame(&["SET", &key, &value])).unwrap();
    }

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 10_000);
            if i % 5 == 0 {
                black_box(d.execute(&frame(&["SET", &key, "value"])).unwrap());
            } else {
                black_box(d.execute(&frame(&["GET", &key])).unwrap());
            }
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark concurrent increments from several threads
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_hincrbyfloat", |b| {
        b.iter(|| {
            let d = Arc::new(dispatcher());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let d = Arc::clone(&d);
                    thread::spawn(move || {
                        for i in 0..2_500 {
                            let key = format!("hash:{}", (t * 7 + i) % 64);
                            let request = frame(&["HINCRBYFLOAT", &key, "f", "1"]);
                            d.execute(&request).unwrap();
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(d.keyspace().len());
        });
    });

    group.finish();
}

/// Benchmark RESP decoding
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    let single = encode_request(&["HINCRBYFLOAT", "prices", "apple", "10.5"]);
    group.throughput(Throughput::Bytes(single.len() as u64));
    group.bench_function("multibulk", |b| {
        b.iter(|| {
            let mut buf = single.clone();
            black_box(decode(&mut buf).unwrap());
        });
    });

    let mut pipelined = BytesMut::new();
    for _ in 0..100 {
        pipelined.extend_from_slice(&single);
    }
    group.throughput(Throughput::Elements(100));
    group.bench_function("pipelined_100", |b| {
        b.iter(|| {
            let mut buf = pipelined.clone();
            while let Some(frame) = decode(&mut buf).unwrap() {
                black_box(frame);
            }
        });
    });

    group.finish();
}

/// Benchmark KEYS pattern matching
fn bench_keys(c: &mut Criterion) {
    let d = dispatcher();

    for i in 0..1_000 {
        let (user, session, cache) = (
            format!("user:{}", i),
            format!("session:{}", i),
            format!("cache:{}", i),
        );
        d.execute(&frame(&["SET", &user, "user_data"])).unwrap();
        d.execute(&frame(&["HSET", &session, "f", "v"])).unwrap();
        d.execute(&frame(&["SADD", &cache, "m"])).unwrap();
    }

    let mut group = c.benchmark_group("keys");

    group.bench_function("keys_pattern", |b| {
        let request = frame(&["KEYS", "user:*"]);
        b.iter(|| {
            black_box(d.execute(&request).unwrap());
        });
    });

    group.bench_function("keys_all", |b| {
        let request = frame(&["KEYS", "*"]);
        b.iter(|| {
            black_box(d.execute(&request).unwrap());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_hset,
    bench_hincrbyfloat,
    bench_mixed,
    bench_concurrent,
    bench_decode,
    bench_keys,
);

criterion_main!(benches);
