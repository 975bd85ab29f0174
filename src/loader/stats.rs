//! Lookup counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub(super) struct Counters {
    lookups: AtomicU64,
    cache_hits: AtomicU64,
    local_queries: AtomicU64,
    isolation_warnings: AtomicU64,
}

impl Counters {
    pub(super) fn lookup(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn local_query(&self) {
        self.local_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn isolation_warning(&self) {
        self.isolation_warnings.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn snapshot(&self) -> LoaderStats {
        LoaderStats {
            lookups: self.lookups.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            local_queries: self.local_queries.load(Ordering::Relaxed),
            isolation_warnings: self.isolation_warnings.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counters of one namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoaderStats {
    /// Calls into symbol resolution.
    pub lookups: u64,
    /// Lookups answered straight from the cache.
    pub cache_hits: u64,
    /// Queries made against the namespace's own code source.
    pub local_queries: u64,
    /// Transitional-isolation warnings emitted.
    pub isolation_warnings: u64,
}

impl std::fmt::Display for LoaderStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Lookups: {}", self.lookups)?;
        writeln!(f, "Cache hits: {}", self.cache_hits)?;
        writeln!(f, "Local queries: {}", self.local_queries)?;
        write!(f, "Isolation warnings: {}", self.isolation_warnings)
    }
}
