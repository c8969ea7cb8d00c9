#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use quill_chat::{LastSeenMessages, MessageSignature, MessageSignatureCache, SignedMessageBody};
use std::hint::black_box;

fn signatures(count: usize) -> Vec<MessageSignature> {
    (0..count)
        .map(|i| {
            let mut bytes = [0u8; 256];
            bytes[..8].copy_from_slice(&(i as u64).to_be_bytes());
            MessageSignature::new(bytes)
        })
        .collect()
}

/// A full cache, so that every push has to shift and evict.
fn warm_cache(pool: &[MessageSignature]) -> MessageSignatureCache {
    let mut cache = MessageSignatureCache::create_default();
    cache.push(&pool[..cache.capacity()]);
    cache
}

fn bench_push_body(c: &mut Criterion) {
    let pool = signatures(512);

    let mut group = c.benchmark_group("signature_cache_push_body");
    for last_seen in [0usize, 5, 20] {
        group.bench_with_input(
            BenchmarkId::from_parameter(last_seen),
            &last_seen,
            |b, &last_seen| {
                let mut cache = warm_cache(&pool);
                let mut cursor = 0;
                b.iter(|| {
                    let entries = pool[cursor..cursor + last_seen].to_vec();
                    let body = SignedMessageBody::new(
                        String::new(),
                        chrono::DateTime::<chrono::Utc>::MIN_UTC,
                        0,
                        LastSeenMessages::new(entries),
                    );
                    cache.push_body(black_box(&body), Some(&pool[cursor + last_seen]));
                    cursor = (cursor + last_seen + 1) % (pool.len() - 21);
                });
            },
        );
    }
    group.finish();
}

fn bench_pack(c: &mut Criterion) {
    let pool = signatures(512);
    let cache = warm_cache(&pool);

    c.bench_function("signature_cache_pack_hit", |b| {
        b.iter(|| black_box(cache.pack(black_box(&pool[100]))));
    });
    c.bench_function("signature_cache_pack_miss", |b| {
        b.iter(|| black_box(cache.pack(black_box(&pool[400]))));
    });
}

criterion_group!(benches, bench_push_body, bench_pack);
criterion_main!(benches);
