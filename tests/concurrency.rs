//! Concurrent lookups and one-time transitional warnings.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use isoload::definition::RawDefinition;
use isoload::delegation::DelegationRelationship;
use isoload::isolation::IsolationLevel;
use isoload::loader::{Loader, ResolvedVia};
use isoload::source::MemorySource;

const THREADS: usize = 16;
const NAME: &str = "lib.Codec";

/// Counts WARN events.
struct WarnCounter(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn slow_source() -> MemorySource {
    MemorySource::new().with_latency(Duration::from_millis(20))
}

#[test]
fn concurrent_lookups_resolve_once() {
    let host_source = Arc::new(
        slow_source().with_definition(NAME, RawDefinition::new("host")),
    );
    let child_source = Arc::new(slow_source());
    let host = Loader::root("host", Arc::clone(&host_source));
    let child = Loader::new(
        "child",
        Arc::clone(&child_source),
        DelegationRelationship::new(host, IsolationLevel::Transitional),
        Vec::new(),
    );

    let barrier = Barrier::new(THREADS);
    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    child.resolve(NAME, false).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let first = &results[0];
    assert!(results.iter().all(|d| Arc::ptr_eq(d, first)));
    assert_eq!(first.namespace(), "host");
    assert_eq!(host_source.lookups_of(NAME), 1);
    assert_eq!(child_source.lookups_of(NAME), 1);
    assert_eq!(child.stats().isolation_warnings, 1);
}

#[test]
fn concurrent_local_definitions_are_not_duplicated() {
    let child_source = Arc::new(slow_source().with_definition(NAME, RawDefinition::new("child")));
    let host = Loader::root("host", MemorySource::new());
    let child = Loader::new(
        "child",
        Arc::clone(&child_source),
        DelegationRelationship::new(host, IsolationLevel::Full),
        Vec::new(),
    );

    let barrier = Barrier::new(THREADS);
    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    child.resolve(NAME, false).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(results.iter().all(|d| Arc::ptr_eq(d, &results[0])));
    assert_eq!(child_source.lookups_of(NAME), 1);
}

#[test]
fn concurrent_fallback_resolution_runs_once() {
    // The primary fully isolates and has nothing, so every lookup has to get
    // past it before the transitional fallback supplies the definition.
    let platform = Loader::root("platform", MemorySource::new());
    let shared_source = Arc::new(MemorySource::new().with_definition(NAME, RawDefinition::new("shared")));
    let shared = Loader::root("shared", Arc::clone(&shared_source));
    let child_source = Arc::new(slow_source());
    let child = Loader::new(
        "child",
        Arc::clone(&child_source),
        DelegationRelationship::new(platform, IsolationLevel::Full),
        vec![DelegationRelationship::new(shared, IsolationLevel::Transitional)],
    );

    let barrier = Barrier::new(THREADS);
    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    child.resolve_traced(NAME).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let first = &results[0].definition;
    assert!(results.iter().all(|r| Arc::ptr_eq(&r.definition, first)));
    assert_eq!(first.namespace(), "shared");

    let decided: Vec<_> = results
        .iter()
        .filter(|r| r.via != ResolvedVia::Cached)
        .collect();
    assert_eq!(decided.len(), 1);
    assert!(matches!(decided[0].via, ResolvedVia::Relationship { index: 1, .. }));

    assert_eq!(child_source.lookups_of(NAME), 1);
    assert_eq!(shared_source.lookups_of(NAME), 1);
    assert_eq!(child.stats().local_queries, 1);
    assert_eq!(child.stats().isolation_warnings, 1);
}

#[test]
fn concurrent_failures_all_report_not_found() {
    let host = Loader::root("host", slow_source());
    let child = Loader::new(
        "child",
        slow_source(),
        DelegationRelationship::new(host, IsolationLevel::None),
        Vec::new(),
    );

    let barrier = Barrier::new(THREADS);
    let failures = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    child.resolve(NAME, false).is_err()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|failed| *failed)
            .count()
    });

    assert_eq!(failures, THREADS);
    assert!(!child.is_cached(NAME));
}

#[test]
fn unrelated_names_resolve_independently() {
    let names: Vec<String> = (0..THREADS).map(|i| format!("lib.Unit{i}")).collect();
    let source = names
        .iter()
        .fold(slow_source(), |src, name| src.with_definition(name.as_str(), RawDefinition::new(name.as_str())));
    let root = Loader::root("host", source);

    std::thread::scope(|s| {
        for name in &names {
            let root = &root;
            s.spawn(move || {
                let definition = root.resolve(name, false).unwrap();
                assert_eq!(definition.body(), name);
            });
        }
    });

    assert_eq!(root.cached_names().len(), THREADS);
}

#[test]
fn transitional_warns_once_per_name() {
    let warnings = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarnCounter(Arc::clone(&warnings)));

    tracing::subscriber::with_default(subscriber, || {
        let host = Loader::root(
            "host",
            MemorySource::new()
                .with_definition(NAME, RawDefinition::new("host"))
                .with_definition("lib.Other", RawDefinition::new("other")),
        );
        let child = Loader::new(
            "child",
            MemorySource::new(),
            DelegationRelationship::new(host, IsolationLevel::Transitional),
            Vec::new(),
        );

        let first = child.resolve(NAME, false).unwrap();
        assert_eq!(first.namespace(), "host");
        assert_eq!(warnings.load(Ordering::SeqCst), 1);

        let second = child.resolve(NAME, false).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(warnings.load(Ordering::SeqCst), 1);

        child.resolve("lib.Other", false).unwrap();
        assert_eq!(warnings.load(Ordering::SeqCst), 2);
    });
}

#[test]
fn transitional_does_not_warn_when_local_shadows() {
    let warnings = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarnCounter(Arc::clone(&warnings)));

    tracing::subscriber::with_default(subscriber, || {
        let host = Loader::root("host", MemorySource::new().with_definition(NAME, RawDefinition::new("host")));
        let child = Loader::new(
            "child",
            MemorySource::new().with_definition(NAME, RawDefinition::new("child")),
            DelegationRelationship::new(host, IsolationLevel::Transitional),
            Vec::new(),
        );
        assert_eq!(child.resolve(NAME, false).unwrap().namespace(), "child");
    });

    assert_eq!(warnings.load(Ordering::SeqCst), 0);
}
