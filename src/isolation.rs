//! Isolation levels and the fixed policy table.
//!
//! The table maps an isolation level and which of the two candidate
//! definitions exist (provider copy, local copy) to a [`Behavior`]. It is a
//! total, static mapping: every `(IsolationLevel, Presence)` pair has exactly
//! one entry and nothing mutates it at runtime.

use serde::{Deserialize, Serialize};

/// How strongly a namespace prefers its own definitions over a provider's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationLevel {
    /// Provider definitions are visible.
    None,
    /// Like `None`, but warns once per name that `Full` would hide.
    Transitional,
    /// Only the namespace's own definitions are visible.
    Full,
}

impl IsolationLevel {
    pub const ALL: [IsolationLevel; 3] = [Self::None, Self::Transitional, Self::Full];
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Transitional => write!(f, "transitional"),
            Self::Full => write!(f, "full"),
        }
    }
}

/// Which candidate definitions were found for a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presence {
    Neither,
    LocalOnly,
    ProviderOnly,
    Both,
}

impl Presence {
    pub const ALL: [Presence; 4] = [
        Self::Neither,
        Self::LocalOnly,
        Self::ProviderOnly,
        Self::Both,
    ];

    pub fn of(provider: bool, local: bool) -> Self {
        match (provider, local) {
            (false, false) => Self::Neither,
            (false, true) => Self::LocalOnly,
            (true, false) => Self::ProviderOnly,
            (true, true) => Self::Both,
        }
    }
}

impl std::fmt::Display for Presence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Neither => write!(f, "neither"),
            Self::LocalOnly => write!(f, "local only"),
            Self::ProviderOnly => write!(f, "provider only"),
            Self::Both => write!(f, "both"),
        }
    }
}

/// The outcome of a policy lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    UseLocal,
    UseProvider,
    /// Use the provider copy and emit a one-time warning.
    UseProviderAndWarn,
    NotFound,
}

impl Behavior {
    /// Pick the definition this behavior selects.
    pub fn select<T>(self, provider: Option<T>, local: Option<T>) -> Option<T> {
        match self {
            Self::UseLocal => local,
            Self::UseProvider | Self::UseProviderAndWarn => provider,
            Self::NotFound => None,
        }
    }
}

impl std::fmt::Display for Behavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UseLocal => write!(f, "use local"),
            Self::UseProvider => write!(f, "use provider"),
            Self::UseProviderAndWarn => write!(f, "use provider (warn)"),
            Self::NotFound => write!(f, "not found"),
        }
    }
}

/// The fixed isolation decision matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsolationPolicyTable;

impl IsolationPolicyTable {
    /// Decide what a lookup yields.
    pub const fn decide(level: IsolationLevel, presence: Presence) -> Behavior {
        use Behavior::*;
        match (level, presence) {
            (_, Presence::Neither) => NotFound,
            // The namespace's own copy shadows the provider unconditionally.
            (_, Presence::LocalOnly | Presence::Both) => UseLocal,
            (IsolationLevel::None, Presence::ProviderOnly) => UseProvider,
            (IsolationLevel::Transitional, Presence::ProviderOnly) => UseProviderAndWarn,
            (IsolationLevel::Full, Presence::ProviderOnly) => NotFound,
        }
    }

    /// All twelve entries, level-major.
    pub fn entries() -> impl Iterator<Item = (IsolationLevel, Presence, Behavior)> {
        IsolationLevel::ALL.into_iter().flat_map(|level| {
            Presence::ALL
                .into_iter()
                .map(move |presence| (level, presence, Self::decide(level, presence)))
        })
    }
}
