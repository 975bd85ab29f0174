//! Benchmarks for symbol resolution.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use isoload::definition::RawDefinition;
use isoload::delegation::DelegationRelationship;
use isoload::isolation::IsolationLevel;
use isoload::loader::Loader;
use isoload::pattern::PatternSet;
use isoload::source::MemorySource;

fn host() -> Arc<Loader> {
    let source = (0..1_000).fold(MemorySource::new(), |src, i| {
        src.with_definition(format!("lib.Unit{i}"), RawDefinition::new("host"))
    });
    Loader::root("host", source)
}

fn child(host: Arc<Loader>) -> Arc<Loader> {
    let rel = DelegationRelationship::new(host, IsolationLevel::None)
        .with_blocked(PatternSet::compile(["internal.*", "impl.*"]).unwrap())
        .with_preferred(PatternSet::compile(["api.*"]).unwrap());
    Loader::new("child", MemorySource::new(), rel, Vec::new())
}

fn bench_cached(c: &mut Criterion) {
    let child = child(host());
    child.resolve("lib.Unit7", false).unwrap();

    c.bench_function("resolve_cached", |bench| {
        bench.iter(|| black_box(child.resolve(black_box("lib.Unit7"), false).unwrap()))
    });
}

fn bench_uncached(c: &mut Criterion) {
    let host = host();

    c.bench_function("resolve_cold_1000", |bench| {
        bench.iter(|| {
            // Fresh child each round so nothing is cached on its side.
            let child = child(Arc::clone(&host));
            for i in 0..1_000 {
                black_box(child.resolve(&format!("lib.Unit{i}"), false).unwrap());
            }
        })
    });
}

fn bench_not_found(c: &mut Criterion) {
    let child = child(host());

    c.bench_function("resolve_not_found", |bench| {
        bench.iter(|| black_box(child.resolve(black_box("lib.Missing"), false).is_err()))
    });
}

criterion_group!(benches, bench_cached, bench_uncached, bench_not_found);
criterion_main!(benches);
