//! Delegation relationships: a namespace's link to one upstream provider.

use std::sync::Arc;

use crate::isolation::IsolationLevel;
use crate::loader::Loader;
use crate::pattern::PatternSet;

/// Immutable link from a namespace to a provider namespace.
///
/// The three pattern sets override the isolation policy for specific names:
/// - `preferred`: a provider copy wins outright, even under full isolation.
/// - `blocked`: the provider is never consulted.
/// - `allowed`: a provider copy is used when the policy would otherwise yield
///   nothing.
#[derive(Clone)]
pub struct DelegationRelationship {
    provider: Arc<Loader>,
    isolation: IsolationLevel,
    preferred: PatternSet,
    blocked: PatternSet,
    allowed: PatternSet,
}

impl DelegationRelationship {
    /// A relationship with empty pattern sets.
    pub fn new(provider: Arc<Loader>, isolation: IsolationLevel) -> Self {
        Self {
            provider,
            isolation,
            preferred: PatternSet::new(),
            blocked: PatternSet::new(),
            allowed: PatternSet::new(),
        }
    }

    pub fn with_preferred(mut self, patterns: PatternSet) -> Self {
        self.preferred = patterns;
        self
    }

    pub fn with_blocked(mut self, patterns: PatternSet) -> Self {
        self.blocked = patterns;
        self
    }

    pub fn with_allowed(mut self, patterns: PatternSet) -> Self {
        self.allowed = patterns;
        self
    }

    pub fn provider(&self) -> &Arc<Loader> {
        &self.provider
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    pub fn preferred(&self) -> &PatternSet {
        &self.preferred
    }

    pub fn blocked(&self) -> &PatternSet {
        &self.blocked
    }

    pub fn allowed(&self) -> &PatternSet {
        &self.allowed
    }

    pub fn is_blocked(&self, name: &str) -> bool {
        self.blocked.matches(name)
    }

    pub fn is_preferred(&self, name: &str) -> bool {
        self.preferred.matches(name)
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowed.matches(name)
    }
}

impl std::fmt::Debug for DelegationRelationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegationRelationship")
            .field("provider", &self.provider.id())
            .field("isolation", &self.isolation)
            .field("preferred", &self.preferred.len())
            .field("blocked", &self.blocked.len())
            .field("allowed", &self.allowed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    #[test]
    fn defaults_to_empty_pattern_sets() {
        let provider = Loader::root("host", MemorySource::new());
        let rel = DelegationRelationship::new(provider, IsolationLevel::Full);
        assert_eq!(rel.isolation(), IsolationLevel::Full);
        assert!(rel.preferred().is_empty());
        assert!(rel.blocked().is_empty());
        assert!(rel.allowed().is_empty());
        assert!(!rel.is_blocked("a.A"));
    }

    #[test]
    fn pattern_queries() {
        let provider = Loader::root("host", MemorySource::new());
        let rel = DelegationRelationship::new(provider, IsolationLevel::None)
            .with_preferred(PatternSet::compile(["api.*"]).unwrap())
            .with_blocked(PatternSet::compile(["internal.*"]).unwrap())
            .with_allowed(PatternSet::compile(["util.Logger"]).unwrap());

        assert!(rel.is_preferred("api.Service"));
        assert!(rel.is_blocked("internal.Impl"));
        assert!(rel.is_allowed("util.Logger"));
        assert!(!rel.is_allowed("util.Other"));
        assert_eq!(rel.provider().id(), "host");
    }
}
