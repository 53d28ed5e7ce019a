use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use kurz::KeywordCodec;

fn bench_encode(c: &mut Criterion) {
    let codec36 = KeywordCodec::new(36);
    let codec62 = KeywordCodec::new(62);

    c.bench_function("encode_base36", |b| {
        b.iter(|| {
            for id in 0..1_000u64 {
                black_box(codec36.encode(black_box(id * 7_919)));
            }
        })
    });

    c.bench_function("encode_base62", |b| {
        b.iter(|| {
            for id in 0..1_000u64 {
                black_box(codec62.encode(black_box(id * 7_919)));
            }
        })
    });
}

fn bench_decode(c: &mut Criterion) {
    let codec = KeywordCodec::new(36);
    let keywords: Vec<String> = (0..1_000u64).map(|id| codec.encode(id * 7_919)).collect();

    c.bench_function("decode_base36", |b| {
        b.iter(|| {
            for keyword in &keywords {
                black_box(codec.decode(black_box(keyword)).unwrap());
            }
        })
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
