use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use leafchain::BPlusTreeMap;
use std::collections::BTreeMap;
use std::hint::black_box;

const N: usize = 10_000;

// ─── Key sequences ──────────────────────────────────────────────────────────

fn ordered_keys(n: usize) -> Vec<i64> {
    (0..n as i64).collect()
}

fn reverse_ordered_keys(n: usize) -> Vec<i64> {
    (0..n as i64).rev().collect()
}

fn random_keys(n: usize) -> Vec<i64> {
    // Deterministic LCG; duplicates are possible, so builders below upsert.
    let mut keys = Vec::with_capacity(n);
    let mut x: u64 = 12345;
    for _ in 0..n {
        x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
        keys.push((x >> 33) as i64);
    }
    keys
}

fn build_bptree(keys: &[i64]) -> BPlusTreeMap<i64, i64> {
    let mut map = BPlusTreeMap::new();
    map.extend(keys.iter().map(|&k| (k, k)));
    map
}

fn build_btree(keys: &[i64]) -> BTreeMap<i64, i64> {
    keys.iter().map(|&k| (k, k)).collect()
}

// ─── Insert ─────────────────────────────────────────────────────────────────

fn bench_insert(c: &mut Criterion, name: &str, keys: &[i64]) {
    let mut group = c.benchmark_group(name);

    group.bench_function(BenchmarkId::new("BPlusTreeMap", N), |b| {
        b.iter(|| {
            let mut map = BPlusTreeMap::new();
            for &k in keys {
                map.set(k, k);
            }
            map
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| {
            let mut map = BTreeMap::new();
            for &k in keys {
                map.insert(k, k);
            }
            map
        });
    });

    group.finish();
}

fn bench_map_insert_ordered(c: &mut Criterion) {
    bench_insert(c, "map_insert_ordered", &ordered_keys(N));
}

fn bench_map_insert_reverse(c: &mut Criterion) {
    bench_insert(c, "map_insert_reverse", &reverse_ordered_keys(N));
}

fn bench_map_insert_random(c: &mut Criterion) {
    bench_insert(c, "map_insert_random", &random_keys(N));
}

// ─── Lookup ─────────────────────────────────────────────────────────────────

fn bench_get(c: &mut Criterion, name: &str, keys: &[i64]) {
    let bp_map = build_bptree(keys);
    let bt_map = build_btree(keys);

    let mut group = c.benchmark_group(name);

    group.bench_function(BenchmarkId::new("BPlusTreeMap", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for &k in keys {
                if let Some(&v) = bp_map.get(&k) {
                    sum = sum.wrapping_add(v);
                }
            }
            black_box(sum)
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for &k in keys {
                if let Some(&v) = bt_map.get(&k) {
                    sum = sum.wrapping_add(v);
                }
            }
            black_box(sum)
        });
    });

    group.finish();
}

fn bench_map_get_ordered(c: &mut Criterion) {
    bench_get(c, "map_get_ordered", &ordered_keys(N));
}

fn bench_map_get_random(c: &mut Criterion) {
    bench_get(c, "map_get_random", &random_keys(N));
}

// ─── Remove ─────────────────────────────────────────────────────────────────

fn bench_remove(c: &mut Criterion, name: &str, keys: &[i64]) {
    let mut group = c.benchmark_group(name);

    group.bench_function(BenchmarkId::new("BPlusTreeMap", N), |b| {
        b.iter_batched(
            || build_bptree(keys),
            |mut map| {
                for &k in keys {
                    map.remove(&k);
                }
                map
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter_batched(
            || build_btree(keys),
            |mut map| {
                for &k in keys {
                    map.remove(&k);
                }
                map
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_map_remove_ordered(c: &mut Criterion) {
    bench_remove(c, "map_remove_ordered", &ordered_keys(N));
}

fn bench_map_remove_reverse(c: &mut Criterion) {
    bench_remove(c, "map_remove_reverse", &reverse_ordered_keys(N));
}

fn bench_map_remove_random(c: &mut Criterion) {
    bench_remove(c, "map_remove_random", &random_keys(N));
}

// ─── Scan ───────────────────────────────────────────────────────────────────

fn bench_map_iter(c: &mut Criterion) {
    let keys = random_keys(N);
    let bp_map = build_bptree(&keys);
    let bt_map = build_btree(&keys);

    let mut group = c.benchmark_group("map_iter");

    group.bench_function(BenchmarkId::new("BPlusTreeMap", N), |b| {
        b.iter(|| black_box(bp_map.values().fold(0i64, |acc, &v| acc.wrapping_add(v))));
    });

    group.bench_function(BenchmarkId::new("BPlusTreeMap/cursor", N), |b| {
        b.iter(|| {
            let mut cursor = bp_map.cursor();
            let mut acc = 0i64;
            while let Ok(Some((_, &v))) = cursor.next(&bp_map) {
                acc = acc.wrapping_add(v);
            }
            black_box(acc)
        });
    });

    group.bench_function(BenchmarkId::new("BTreeMap", N), |b| {
        b.iter(|| black_box(bt_map.values().fold(0i64, |acc, &v| acc.wrapping_add(v))));
    });

    group.finish();
}

// ─── Criterion Groups ───────────────────────────────────────────────────────

criterion_group!(map_insert_benches, bench_map_insert_ordered, bench_map_insert_reverse, bench_map_insert_random,);

criterion_group!(map_get_benches, bench_map_get_ordered, bench_map_get_random,);

criterion_group!(map_remove_benches, bench_map_remove_ordered, bench_map_remove_reverse, bench_map_remove_random,);

criterion_group!(map_scan_benches, bench_map_iter,);

criterion_main!(map_insert_benches, map_get_benches, map_remove_benches, map_scan_benches,);
