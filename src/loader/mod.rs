//! Isolating namespaces.
//!
//! A [`Loader`] owns one [`CodeSource`], a primary [`DelegationRelationship`],
//! an ordered list of fallback relationships, and a resolution cache. The
//! relationship graph is fixed at construction; the cache only grows.
//!
//! ## Caching and concurrency
//!
//! The cache maps each name to a compute-once cell. A successful resolution
//! is published into the cell exactly once and every later lookup returns
//! that same `Arc<Definition>`. Failures are never published, so a failed
//! name is retried on the next call, and its cell is dropped from the map
//! once nobody else holds it.
//!
//! The first caller for a name claims its cell and runs the whole resolution
//! across every relationship. Concurrent callers for the same name wait on
//! the cell's condition variable until the claim is released, then either
//! read the published definition or claim the cell themselves. No lock is
//! held while a provider resolves; the claim is a flag, and the delegation
//! graph is acyclic, so a claimed cell is never waited on by its own owner.

mod resolve;
mod stats;

use std::sync::{Arc, Condvar, Mutex, OnceLock, Weak};

use dashmap::DashMap;

use crate::definition::{Definition, ResourceHandle};
use crate::delegation::DelegationRelationship;
use crate::source::CodeSource;

pub use resolve::{Resolution, ResolvedVia, Verdict};
pub use stats::LoaderStats;
use stats::Counters;

/// Per-name resolution cell.
#[derive(Default)]
struct Cell {
    value: OnceLock<Arc<Definition>>,
    claimed: Mutex<bool>,
    released: Condvar,
}

impl Cell {
    /// Claim the cell for resolution, waiting while another caller holds it.
    ///
    /// Returns `None` as soon as a definition is published.
    fn claim(&self) -> Option<Claim<'_>> {
        // The guarded flag is only ever set whole, poisoning leaves it valid.
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if self.value.get().is_some() {
                return None;
            }
            if !*claimed {
                *claimed = true;
                return Some(Claim { cell: self });
            }
            claimed = self
                .released
                .wait(claimed)
                .unwrap_or_else(|e| e.into_inner());
        }
    }
}

/// Exclusive right to resolve one cell. Dropping it wakes the waiters.
struct Claim<'a> {
    cell: &'a Cell,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        *self.cell.claimed.lock().unwrap_or_else(|e| e.into_inner()) = false;
        self.cell.released.notify_all();
    }
}

/// An isolating namespace.
pub struct Loader {
    id: String,
    source: Box<dyn CodeSource>,
    primary: Option<DelegationRelationship>,
    fallbacks: Vec<DelegationRelationship>,
    cells: DashMap<String, Arc<Cell>>,
    counters: Counters,
    this: Weak<Loader>,
}

impl Loader {
    /// Create a namespace delegating to `primary`, then to each of `fallbacks`
    /// in order.
    pub fn new(
        id: impl Into<String>,
        source: impl CodeSource + 'static,
        primary: DelegationRelationship,
        fallbacks: Vec<DelegationRelationship>,
    ) -> Arc<Self> {
        Self::build(id.into(), Box::new(source), Some(primary), fallbacks)
    }

    /// Create a namespace with no providers. It resolves names from its own
    /// source only and sits at the top of a delegation chain.
    pub fn root(id: impl Into<String>, source: impl CodeSource + 'static) -> Arc<Self> {
        Self::build(id.into(), Box::new(source), None, Vec::new())
    }

    pub(crate) fn build(
        id: String,
        source: Box<dyn CodeSource>,
        primary: Option<DelegationRelationship>,
        fallbacks: Vec<DelegationRelationship>,
    ) -> Arc<Self> {
        tracing::debug!(
            namespace = %id,
            source = %source.describe(),
            providers = primary.iter().chain(fallbacks.iter()).count(),
            "creating namespace"
        );
        Arc::new_cyclic(|this| Self {
            id,
            source,
            primary,
            fallbacks,
            cells: DashMap::new(),
            counters: Counters::default(),
            this: this.clone(),
        })
    }

    /// Namespace id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether this namespace has no providers.
    pub fn is_root(&self) -> bool {
        self.primary.is_none()
    }

    pub fn primary(&self) -> Option<&DelegationRelationship> {
        self.primary.as_ref()
    }

    pub fn fallbacks(&self) -> &[DelegationRelationship] {
        &self.fallbacks
    }

    /// Primary relationship first, then fallbacks in declared order.
    pub fn relationships(&self) -> impl Iterator<Item = &DelegationRelationship> {
        self.primary.iter().chain(self.fallbacks.iter())
    }

    /// Whether `name` has been successfully resolved in this namespace.
    pub fn is_cached(&self, name: &str) -> bool {
        self.cells
            .get(name)
            .is_some_and(|cell| cell.value.get().is_some())
    }

    /// Names resolved so far, sorted.
    pub fn cached_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .cells
            .iter()
            .filter(|entry| entry.value().value.get().is_some())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Snapshot of the lookup counters.
    pub fn stats(&self) -> LoaderStats {
        self.counters.snapshot()
    }

    /// Look up a non-code resource.
    ///
    /// Resources come from this namespace's own source only; providers are
    /// never consulted.
    pub fn resolve_resource(&self, name: &str) -> Option<ResourceHandle> {
        let handle = self.source.find_resource(name);
        tracing::trace!(namespace = %self.id, name, found = handle.is_some(), "resource lookup");
        handle
    }

    /// The cell for `name`, created on first use.
    fn cell(&self, name: &str) -> Arc<Cell> {
        if let Some(cell) = self.cells.get(name) {
            return Arc::clone(cell.value());
        }
        Arc::clone(self.cells.entry(name.to_string()).or_default().value())
    }

    /// Drop the cell of a failed name unless a definition was published or
    /// another caller still holds it.
    fn forget(&self, name: &str) {
        self.cells.remove_if(name, |_, cell| {
            cell.value.get().is_none() && Arc::strong_count(cell) == 1
        });
    }

    fn cached_len(&self) -> usize {
        self.cells
            .iter()
            .filter(|entry| entry.value().value.get().is_some())
            .count()
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("id", &self.id)
            .field("source", &self.source.describe())
            .field("primary", &self.primary)
            .field("fallbacks", &self.fallbacks)
            .field("cached", &self.cached_len())
            .finish()
    }
}
