//! The resolution algorithm.
//!
//! For a name not yet cached, each relationship is tried in order (primary,
//! then fallbacks). Within one relationship the precedence is:
//!
//! 1. blocked patterns suppress the provider query entirely;
//! 2. an export-marked provider definition wins;
//! 3. a provider definition whose name is preferred wins;
//! 4. the isolation policy table decides between provider and local copies;
//! 5. when the table yields nothing, an allowed pattern lets the provider
//!    copy through.

use std::cell::OnceCell;
use std::sync::Arc;

use serde::Serialize;

use super::{Cell, Loader};
use crate::definition::Definition;
use crate::delegation::DelegationRelationship;
use crate::error::{ResolveError, ResolveResult, SourceError};
use crate::isolation::{Behavior, IsolationPolicyTable, Presence};

/// Why a relationship produced its definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", content = "behavior", rename_all = "snake_case")]
pub enum Verdict {
    /// The provider copy carries the export marker.
    Exported,
    /// The name matched a preferred pattern.
    Preferred,
    /// The isolation policy table decided.
    Policy(Behavior),
    /// The table said not found, an allowed pattern overrode it.
    Allowed,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Exported => write!(f, "exported"),
            Verdict::Preferred => write!(f, "preferred"),
            Verdict::Policy(behavior) => write!(f, "policy: {behavior}"),
            Verdict::Allowed => write!(f, "allowed"),
        }
    }
}

/// How a lookup was satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "via", rename_all = "snake_case")]
pub enum ResolvedVia {
    /// Served from the cache.
    Cached,
    /// A root namespace found it in its own source.
    Root,
    /// Relationship `index` decided (0 is the primary).
    Relationship {
        index: usize,
        provider: String,
        verdict: Verdict,
    },
}

/// A successful lookup together with how it was decided.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub definition: Arc<Definition>,
    pub via: ResolvedVia,
}

/// Local lookup result, computed at most once per resolve call.
type LocalMemo = OnceCell<Option<Arc<Definition>>>;

impl Loader {
    /// Resolve `name` in this namespace.
    ///
    /// With `eager_link`, every name the definition requires is resolved
    /// through the definition's own namespace before returning.
    pub fn resolve(&self, name: &str, eager_link: bool) -> ResolveResult<Arc<Definition>> {
        let resolution = self.resolve_traced(name)?;
        if eager_link {
            link(&resolution.definition)?;
        }
        Ok(resolution.definition)
    }

    /// Resolve `name` and report which rule produced the definition.
    pub fn resolve_traced(&self, name: &str) -> ResolveResult<Resolution> {
        self.counters.lookup();

        let cell = self.cell(name);
        if let Some(resolution) = self.cached(&cell, name) {
            return Ok(resolution);
        }

        // `None` means another caller published while we waited.
        let Some(claim) = cell.claim() else {
            return self.cached(&cell, name).ok_or_else(|| self.not_found(name));
        };
        let outcome = self.resolve_claimed(name, &cell);
        drop(claim);

        if outcome.is_err() {
            drop(cell);
            self.forget(name);
        }
        outcome
    }

    /// Run the full resolution of `name`. The caller holds the cell's claim.
    fn resolve_claimed(&self, name: &str, cell: &Cell) -> ResolveResult<Resolution> {
        let local = LocalMemo::new();

        if self.is_root() {
            if let Some(definition) = local.get_or_init(|| self.find_local(name)).clone() {
                return Ok(self.publish(cell, definition, ResolvedVia::Root));
            }
        }

        for (index, relationship) in self.relationships().enumerate() {
            if let Some(resolution) =
                self.try_resolve_with_delegate(name, index, relationship, cell, &local)
            {
                return Ok(resolution);
            }
        }

        tracing::debug!(namespace = %self.id, name, "not found");
        Err(self.not_found(name))
    }

    /// Decide `name` against one relationship. `None` means "try the next".
    fn try_resolve_with_delegate(
        &self,
        name: &str,
        index: usize,
        relationship: &DelegationRelationship,
        cell: &Cell,
        local: &LocalMemo,
    ) -> Option<Resolution> {
        let via = |verdict| ResolvedVia::Relationship {
            index,
            provider: relationship.provider().id().to_string(),
            verdict,
        };

        let provider_definition = if relationship.is_blocked(name) {
            tracing::trace!(
                namespace = %self.id,
                provider = %relationship.provider().id(),
                name,
                "blocked, provider not consulted"
            );
            None
        } else {
            self.query_provider(relationship, name)
        };

        if let Some(definition) = &provider_definition {
            if definition.is_exported() {
                return Some(self.publish(cell, Arc::clone(definition), via(Verdict::Exported)));
            }
            if relationship.is_preferred(name) {
                return Some(self.publish(cell, Arc::clone(definition), via(Verdict::Preferred)));
            }
        }

        let local_definition = local.get_or_init(|| self.find_local(name)).clone();
        let presence = Presence::of(provider_definition.is_some(), local_definition.is_some());
        let behavior = IsolationPolicyTable::decide(relationship.isolation(), presence);

        tracing::trace!(
            namespace = %self.id,
            provider = %relationship.provider().id(),
            name,
            isolation = %relationship.isolation(),
            %presence,
            %behavior,
            "policy decision"
        );

        if behavior == Behavior::UseProviderAndWarn {
            self.counters.isolation_warning();
            tracing::warn!(
                namespace = %self.id,
                provider = %relationship.provider().id(),
                name,
                "{name} is used from provider namespace \"{}\" and would not be visible under full isolation",
                relationship.provider().id()
            );
        }

        match behavior.select(provider_definition.clone(), local_definition) {
            Some(definition) => Some(self.publish(cell, definition, via(Verdict::Policy(behavior)))),
            None => {
                let definition = provider_definition?;
                (behavior == Behavior::NotFound && relationship.is_allowed(name))
                    .then(|| self.publish(cell, definition, via(Verdict::Allowed)))
            }
        }
    }

    /// Ask a provider for `name`. Any failure there counts as absent.
    fn query_provider(
        &self,
        relationship: &DelegationRelationship,
        name: &str,
    ) -> Option<Arc<Definition>> {
        match relationship.provider().resolve(name, false) {
            Ok(definition) => Some(definition),
            Err(ResolveError::NotFound { .. }) => {
                tracing::trace!(
                    namespace = %self.id,
                    provider = %relationship.provider().id(),
                    name,
                    "provider has no definition"
                );
                None
            }
        }
    }

    /// Query this namespace's own source. Source errors count as absent.
    fn find_local(&self, name: &str) -> Option<Arc<Definition>> {
        self.counters.local_query();
        match self.source.find(name) {
            Ok(Some(raw)) => Some(Arc::new(Definition::new(
                name,
                &self.id,
                self.this.clone(),
                raw,
            ))),
            Ok(None) => None,
            Err(e @ SourceError::Malformed { .. }) => {
                tracing::debug!(namespace = %self.id, name, error = %e, "malformed definition, treating as absent");
                None
            }
            Err(e @ SourceError::Unavailable { .. }) => {
                tracing::warn!(namespace = %self.id, name, error = %e, "code source unavailable, treating as absent");
                None
            }
        }
    }

    fn cached(&self, cell: &Cell, name: &str) -> Option<Resolution> {
        let definition = cell.value.get()?;
        self.counters.cache_hit();
        tracing::trace!(namespace = %self.id, name, "cache hit");
        Some(Resolution {
            definition: Arc::clone(definition),
            via: ResolvedVia::Cached,
        })
    }

    fn not_found(&self, name: &str) -> ResolveError {
        ResolveError::NotFound {
            namespace: self.id.clone(),
            name: name.to_string(),
        }
    }

    /// Publish `definition` into a claimed cell.
    fn publish(&self, cell: &Cell, definition: Arc<Definition>, via: ResolvedVia) -> Resolution {
        let stored = cell.value.get_or_init(|| definition);
        tracing::debug!(
            namespace = %self.id,
            name = %stored.name(),
            origin = %stored.namespace(),
            "resolved"
        );
        Resolution {
            definition: Arc::clone(stored),
            via,
        }
    }

    /// Resolve every requirement of a definition this namespace owns.
    fn link_owned(&self, definition: &Definition) -> ResolveResult<()> {
        for requirement in definition.requires() {
            self.resolve(requirement, false)?;
        }
        definition.mark_linked();
        tracing::debug!(namespace = %self.id, name = %definition.name(), "linked");
        Ok(())
    }
}

/// Link a definition through the namespace that owns it.
fn link(definition: &Definition) -> ResolveResult<()> {
    if definition.is_linked() {
        return Ok(());
    }
    match definition.origin() {
        Some(origin) => origin.link_owned(definition),
        None => {
            tracing::debug!(
                name = %definition.name(),
                origin = %definition.namespace(),
                "origin namespace dropped, skipping link"
            );
            Ok(())
        }
    }
}
