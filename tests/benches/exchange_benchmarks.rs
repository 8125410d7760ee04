//! # ASX Exchange Benchmarks
//!
//! Cost of the per-message work on both sides of an exchange:
//!
//! | Group | Measures |
//! |-------|----------|
//! | primitives | Ed25519 sign/verify, sealed box seal/open, fingerprint |
//! | pipelines | Inbound open and outbound seal of a full message |
//! | replay-cache | Contended admission of distinct fingerprints |

use asx_protocol::{ExchangeContext, Fingerprint, ReplayCache, SealedExchangeApi};
use asx_tests::harness::Harness;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use http::Method;
use serde_json::json;
use shared_crypto::Ed25519KeyPair;
use std::time::Duration;

// ============================================================================
// Primitives
// ============================================================================

fn bench_primitives(c: &mut Criterion) {
    let mut group = c.benchmark_group("primitives");

    let keys = Ed25519KeyPair::from_seed([1u8; 32]);
    let public = keys.public_key();
    let message = b"\"@method\": POST\n\"@path\": /echo\n\"signify-resource\": EAlice";
    let signature = keys.sign(message);

    group.bench_function("ed25519_sign", |b| b.iter(|| black_box(keys.sign(message))));
    group.bench_function("ed25519_verify", |b| {
        b.iter(|| black_box(public.verify(message, &signature).is_ok()))
    });

    let recipient = Ed25519KeyPair::from_seed([2u8; 32]);
    let encryption_key = recipient.public_key().to_encryption_key().unwrap();
    let decryption_key = recipient.decryption_key();

    for size in [64usize, 1024, 16 * 1024] {
        let plaintext = vec![0x42u8; size];
        let sealed = shared_crypto::seal(&encryption_key, &plaintext).unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("seal", size), &plaintext, |b, p| {
            b.iter(|| black_box(shared_crypto::seal(&encryption_key, p).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("open", size), &sealed, |b, s| {
            b.iter(|| black_box(shared_crypto::open(&decryption_key, s).unwrap()))
        });
    }

    group.bench_function("fingerprint", |b| {
        b.iter(|| {
            black_box(Fingerprint::compute(
                "indexed=\"?0\";signify=\"0BAbCdEf\"",
                Some("0BbodySignature"),
            ))
        })
    });

    group.finish();
}

// ============================================================================
// Pipelines
// ============================================================================

fn bench_pipelines(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipelines");
    group.measurement_time(Duration::from_secs(10));

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let h = Harness::new();
    let alice = h.party("EAlice", 1);

    group.bench_function("open_request", |b| {
        b.iter_batched(
            || {
                // Keeps timestamps distinct and lets old fingerprints expire.
                h.clock.advance(Duration::from_millis(1));
                runtime.block_on(alice.seal_request(
                    Method::POST,
                    "/echo",
                    &h.service,
                    Some(json!({"n": 1})),
                ))
            },
            |request| black_box(runtime.block_on(h.exchange.open_request(request, h.now()))),
            BatchSize::SmallInput,
        )
    });

    let context = ExchangeContext::new(Method::POST, "/echo", alice.id().clone());
    group.bench_function("seal_response", |b| {
        b.iter(|| {
            black_box(
                runtime
                    .block_on(h.exchange.seal_response(&context, Some(json!({"ok": true}))))
                    .unwrap(),
            )
        })
    });

    group.finish();
}

// ============================================================================
// Replay Cache
// ============================================================================

fn bench_replay_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay-cache");
    let now = chrono::Utc::now();
    let expires_at = now + chrono::Duration::seconds(1);

    for threads in [1usize, 4, 8] {
        group.throughput(Throughput::Elements((threads * 1000) as u64));
        group.bench_with_input(BenchmarkId::new("insert", threads), &threads, |b, &threads| {
            b.iter(|| {
                let cache = ReplayCache::new(threads * 1000);
                std::thread::scope(|scope| {
                    for t in 0..threads {
                        let cache = &cache;
                        scope.spawn(move || {
                            for i in 0..1000 {
                                let header = format!("signify=\"{}-{}\"", t, i);
                                cache.insert(Fingerprint::compute(&header, None), now, expires_at);
                            }
                        });
                    }
                });
                black_box(cache.len())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_primitives, bench_pipelines, bench_replay_cache);
criterion_main!(benches);
