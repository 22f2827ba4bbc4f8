//! B+-tree benchmarks for memdex.
//!
//! Measures the operations that dominate index build and serve time: random
//! insertion, sorted bulk insertion, point lookup, and ordered scan. The
//! interesting comparison is `put` vs `put_next` on the same sorted input —
//! the bulk path avoids split copies entirely.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use memdex::Btree;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

fn shuffled_keys(count: usize, seed: u64) -> Vec<[u8; 8]> {
    let mut keys: Vec<[u8; 8]> = (0..count as u64).map(|i| i.to_be_bytes()).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(seed));
    keys
}

fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_put");

    for count in [1_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));

        group.bench_with_input(BenchmarkId::new("random", count), count, |b, &count| {
            let keys = shuffled_keys(count, 42);
            b.iter(|| {
                let mut tree = Btree::new();
                for key in &keys {
                    tree.put(key, key);
                }
                tree.size()
            });
        });

        group.bench_with_input(BenchmarkId::new("bulk_ordered", count), count, |b, &count| {
            b.iter(|| {
                let mut tree = Btree::new();
                for i in 0..count as u64 {
                    let key = i.to_be_bytes();
                    tree.put_next(&key, &key);
                }
                tree.size()
            });
        });
    }

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_get");

    for count in [1_000, 100_000].iter() {
        let keys = shuffled_keys(*count, 7);
        let mut tree = Btree::new();
        for key in &keys {
            tree.put(key, key);
        }

        group.throughput(Throughput::Elements(keys.len() as u64));
        group.bench_with_input(BenchmarkId::new("existing", count), count, |b, _| {
            b.iter(|| {
                let mut hits = 0usize;
                for key in &keys {
                    if tree.get(black_box(key)).is_some() {
                        hits += 1;
                    }
                }
                hits
            });
        });

        group.bench_with_input(BenchmarkId::new("absent", count), count, |b, &count| {
            let missing = (count as u64 + 1).to_be_bytes();
            b.iter(|| tree.get(black_box(&missing)).is_some());
        });
    }

    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_scan");

    for count in [100_000].iter() {
        let mut tree = Btree::new();
        for i in 0..*count as u64 {
            let key = i.to_be_bytes();
            tree.put_next(&key, &key);
        }

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("full", count), count, |b, _| {
            b.iter(|| {
                let mut scanned = 0usize;
                for (key, value) in tree.start(&[]) {
                    black_box((key, value));
                    scanned += 1;
                }
                scanned
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_put, bench_get, bench_scan);
criterion_main!(benches);
