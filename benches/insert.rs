use criterion::{criterion_group, criterion_main, Criterion};
use hllpp::HyperLogLogPlus;
use std::hint::black_box;

fn sketch_benchmarks(c: &mut Criterion) {
    c.bench_function("insert_hash_p14", |b| {
        let mut sketch = HyperLogLogPlus::new(14).unwrap();
        let mut i = 0u64;
        b.iter(|| {
            i = i.wrapping_add(0x9E37_79B9_7F4A_7C15);
            sketch.insert_hash(black_box(i));
        });
    });

    c.bench_function("insert_item_p14", |b| {
        let mut sketch = HyperLogLogPlus::new(14).unwrap();
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            sketch.insert(black_box(&i));
        });
    });

    c.bench_function("raw_count_dense_p14", |b| {
        let mut sketch = HyperLogLogPlus::new(14).unwrap();
        sketch.extend(0..100_000u64);
        b.iter(|| black_box(sketch.raw_count()));
    });
}

criterion_group!(benches, sketch_benchmarks);
criterion_main!(benches);
