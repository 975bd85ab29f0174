//! Wildcard patterns used to override isolation for specific names.
//!
//! `*` matches any run of characters (including `.`), `?` matches exactly one.

use globset::{Glob, GlobMatcher as Compiled};

use crate::error::{ConfigError, ConfigResult};

/// A compiled wildcard pattern.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    pattern: String,
    compiled: Compiled,
}

impl GlobMatcher {
    /// Compile `pattern`.
    pub fn new(pattern: &str) -> ConfigResult<Self> {
        let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.kind().to_string(),
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            compiled: glob.compile_matcher(),
        })
    }

    /// Whether `name` matches this pattern.
    pub fn matches(&self, name: &str) -> bool {
        self.compiled.is_match(name)
    }

    /// The source text of the pattern.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

impl std::fmt::Display for GlobMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// An unordered collection of patterns. Empty sets never match.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    matchers: Vec<GlobMatcher>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every pattern in `patterns`.
    pub fn compile<I, S>(patterns: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let matchers = patterns
            .into_iter()
            .map(|p| GlobMatcher::new(p.as_ref()))
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(Self { matchers })
    }

    pub fn push(&mut self, matcher: GlobMatcher) {
        self.matchers.push(matcher);
    }

    /// Whether any pattern in the set matches `name`.
    pub fn matches(&self, name: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(name))
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GlobMatcher> {
        self.matchers.iter()
    }
}

impl FromIterator<GlobMatcher> for PatternSet {
    fn from_iter<T: IntoIterator<Item = GlobMatcher>>(iter: T) -> Self {
        Self {
            matchers: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_spans_dots() {
        let m = GlobMatcher::new("com.example.*").unwrap();
        assert!(m.matches("com.example.Api"));
        assert!(m.matches("com.example.inner.Impl"));
        assert!(!m.matches("com.other.Api"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        let m = GlobMatcher::new("util.V?").unwrap();
        assert!(m.matches("util.V1"));
        assert!(!m.matches("util.V10"));
    }

    #[test]
    fn exact_pattern_matches_only_itself() {
        let m = GlobMatcher::new("util.Logger").unwrap();
        assert!(m.matches("util.Logger"));
        assert!(!m.matches("util.LoggerFactory"));
    }

    #[test]
    fn empty_set_never_matches() {
        let set = PatternSet::new();
        assert!(set.is_empty());
        assert!(!set.matches("anything"));
    }

    #[test]
    fn set_matches_any() {
        let set = PatternSet::compile(["a.*", "b.Exact"]).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.matches("a.x"));
        assert!(set.matches("b.Exact"));
        assert!(!set.matches("b.Other"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = GlobMatcher::new("broken[").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }
}
