use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use denseset::StringSet;

const ITER: u64 = 32 * 1024;

fn populated(n: u64) -> StringSet<'static> {
    let mut set = StringSet::default();
    for i in 0..n {
        set.add(format!("key:{i}").as_bytes(), None);
    }
    set
}

fn insert_string_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_string_set");
    group.throughput(Throughput::Elements(ITER));
    group.bench_function("fresh", |b| b.iter(|| populated(black_box(ITER))));
    group.finish();
}

fn contains_string_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("contains_string_set");
    group.throughput(Throughput::Elements(ITER));
    let mut set = populated(ITER);

    group.bench_function("hit", |b| {
        b.iter(|| {
            for i in 0..ITER {
                black_box(set.contains(format!("key:{i}").as_bytes()));
            }
        })
    });
    group.bench_function("miss", |b| {
        b.iter(|| {
            for i in 0..ITER {
                black_box(set.contains(format!("nope:{i}").as_bytes()));
            }
        })
    });
    group.finish();
}

fn scan_string_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_string_set");
    group.throughput(Throughput::Elements(ITER));
    let mut set = populated(ITER);

    group.bench_function("full_loop", |b| {
        b.iter(|| {
            let mut visited = 0u64;
            let mut cursor = 0;
            loop {
                cursor = set.scan(cursor, |_| visited += 1);
                if cursor == 0 {
                    break;
                }
            }
            black_box(visited)
        })
    });
    group.finish();
}

criterion_group!(benches, insert_string_set, contains_string_set, scan_string_set);
criterion_main!(benches);
