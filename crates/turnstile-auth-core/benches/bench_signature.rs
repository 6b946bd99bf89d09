//! Benchmarks for request signing and credential verification hot paths

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use turnstile_auth_core::{
    canonicalize, AuthConfig, HmacKey, Params, RequestSigner, SystemClock, TokenService,
};

const SECRET: &str = "bench-secret-0123456789abcdef0123456";

fn params(count: usize) -> Params {
    (0..count)
        .map(|i| (format!("field_{i:03}"), format!("value-{i}")))
        .collect()
}

fn bench_signing(c: &mut Criterion) {
    let signer = RequestSigner::new(HmacKey::new(SECRET).unwrap());
    let sizes = [2, 8, 32, 128];

    let mut group = c.benchmark_group("canonicalize");
    for size in sizes {
        let p = params(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &p, |b, p| {
            b.iter(|| canonicalize(black_box(p)));
        });
    }
    group.finish();

    let mut group = c.benchmark_group("signature_verify");
    for size in sizes {
        let p = params(size);
        let tag = signer.sign(&p);
        group.bench_with_input(BenchmarkId::from_parameter(size), &(p, tag), |b, (p, tag)| {
            b.iter(|| signer.verify(black_box(p), black_box(tag)));
        });
    }
    group.finish();
}

fn bench_tokens(c: &mut Criterion) {
    let tokens = TokenService::new(&AuthConfig::new(SECRET), Arc::new(SystemClock)).unwrap();
    let pair = tokens.issue_pair("subject", "contact", "admin").unwrap();

    c.bench_function("token_issue_pair", |b| {
        b.iter(|| tokens.issue_pair(black_box("subject"), "contact", "admin"));
    });

    c.bench_function("token_verify", |b| {
        b.iter(|| tokens.verify(black_box(&pair.access_token)));
    });
}

criterion_group!(benches, bench_signing, bench_tokens);
criterion_main!(benches);
