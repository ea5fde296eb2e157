// 📚 Pattern Registries - Titles, Locations, Skills
// Ordered pattern -> count tables. Order is the curated order below.

use crate::matcher::Matcher;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// CURATED PATTERN LISTS
// ============================================================================

pub const DEFAULT_TITLES: &[&str] = &[
    "Software Engineer",
    "Senior Software Engineer",
    "Product Manager",
    "Program Manager",
    "Engineering Manager",
    "Staff Software Engineer",
    "Principal Software Engineer",
    "Product Designer",
    "QA",
];

pub const DEFAULT_LOCATIONS: &[&str] = &[
    "New York",
    "San Francisco",
    "Los Angeles",
    "Boston",
    "Austin",
    "Dallas",
    "Denver",
    "Seattle",
    "NYC",
    "San Jose",
    "San Diego",
    "Salt Lake City",
    "Portland",
    "Kansas City",
];

/// Skills, taken from Stack Overflow tags
pub const DEFAULT_SKILLS: &[&str] = &[
    "scala",
    "awk",
    "julia",
    "rust",
    "haskell",
    "python",
    "java",
    "javascript",
    "typescript",
    "golang",
    "ruby",
    "perl",
    "shell",
    "kubernetes",
    "rails",
    "django",
    "spring boot",
    "graphql",
    "lua",
    "elixir",
    "erlang",
    "kotlin",
    "d",
    "docker",
    "spring",
    "hibernate",
    "android",
    "ios",
    "swift",
    "php",
    "css",
    "c#",
    ".net",
    "html",
    "c",
    "c++",
    "mysql",
    "postgres",
    "sql",
    "objective-c",
    "asp.net",
    "angular",
    "angularjs",
    "react",
    "reactjs",
    "react.js",
    "vuejs",
    "vue.js",
    "sql-server",
    "ajax",
    "excel",
    "linux",
    "html5",
    "git",
    "apache",
    "matlab",
    "f#",
];

// ============================================================================
// REGISTRY KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    Titles,
    Locations,
    Skills,
}

impl RegistryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryKind::Titles => "titles",
            RegistryKind::Locations => "locations",
            RegistryKind::Skills => "skills",
        }
    }

    pub fn default_patterns(&self) -> &'static [&'static str] {
        match self {
            RegistryKind::Titles => DEFAULT_TITLES,
            RegistryKind::Locations => DEFAULT_LOCATIONS,
            RegistryKind::Skills => DEFAULT_SKILLS,
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug, Clone)]
pub struct RegistryEntry {
    matcher: Matcher,
    pub count: u64,
}

impl RegistryEntry {
    pub fn pattern(&self) -> &str {
        self.matcher.pattern()
    }
}

/// PatternRegistry - ordered (pattern, count) pairs
///
/// Every pattern is compiled up front, so a bad pattern aborts
/// construction instead of surfacing halfway through a run.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    kind: RegistryKind,
    entries: Vec<RegistryEntry>,
}

impl PatternRegistry {
    /// Build a registry from patterns. Duplicates are rejected.
    pub fn from_patterns<S: AsRef<str>>(kind: RegistryKind, patterns: &[S]) -> Result<Self> {
        let mut entries: Vec<RegistryEntry> = Vec::with_capacity(patterns.len());

        for pattern in patterns {
            let pattern = pattern.as_ref();
            if entries.iter().any(|e| e.pattern() == pattern) {
                bail!("Duplicate pattern {:?} in {} registry", pattern, kind.as_str());
            }
            let matcher = Matcher::new(pattern)
                .with_context(|| format!("Invalid pattern in {} registry", kind.as_str()))?;
            entries.push(RegistryEntry { matcher, count: 0 });
        }

        Ok(PatternRegistry { kind, entries })
    }

    /// Registry with the built-in curated list for `kind`
    pub fn with_defaults(kind: RegistryKind) -> Result<Self> {
        Self::from_patterns(kind, kind.default_patterns())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Count of a single pattern, if registered
    pub fn count(&self, pattern: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.pattern() == pattern)
            .map(|e| e.count)
    }

    /// Add one to every pattern present in `text`. Returns the number of hits.
    pub fn record(&mut self, text: &str) -> usize {
        let mut hits = 0;
        for entry in &mut self.entries {
            let found = entry.matcher.presence(text);
            entry.count += found;
            hits += found as usize;
        }
        hits
    }

    /// Zero all counts
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            entry.count = 0;
        }
    }

    /// Same patterns, zero counts
    pub fn fresh(&self) -> Self {
        let mut copy = self.clone();
        copy.reset();
        copy
    }

    /// Sum another registry's counts into this one.
    ///
    /// Both sides must hold the same patterns in the same order.
    pub fn merge(&mut self, other: &PatternRegistry) -> Result<()> {
        if self.kind != other.kind || self.entries.len() != other.entries.len() {
            bail!(
                "Cannot merge {} registry ({} patterns) with {} registry ({} patterns)",
                self.kind.as_str(),
                self.entries.len(),
                other.kind.as_str(),
                other.entries.len()
            );
        }

        for (mine, theirs) in self.entries.iter_mut().zip(&other.entries) {
            if mine.pattern() != theirs.pattern() {
                bail!(
                    "Pattern mismatch while merging {} registry: {:?} vs {:?}",
                    self.kind.as_str(),
                    mine.pattern(),
                    theirs.pattern()
                );
            }
            mine.count += theirs.count;
        }

        Ok(())
    }

    /// (pattern, count) pairs in registry order
    pub fn tally(&self) -> Vec<(String, u64)> {
        self.entries
            .iter()
            .map(|e| (e.pattern().to_string(), e.count))
            .collect()
    }

    /// pattern -> count, sorted by pattern for reproducible output
    pub fn to_map(&self) -> BTreeMap<String, u64> {
        self.entries
            .iter()
            .map(|e| (e.pattern().to_string(), e.count))
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registries_compile() {
        for kind in [RegistryKind::Titles, RegistryKind::Locations, RegistryKind::Skills] {
            let registry = PatternRegistry::with_defaults(kind).unwrap();
            assert_eq!(registry.len(), kind.default_patterns().len());
            assert!(registry.entries().iter().all(|e| e.count == 0));
        }
    }

    #[test]
    fn test_record_counts_presence_per_text() {
        let mut skills =
            PatternRegistry::from_patterns(RegistryKind::Skills, &["rust", "c", "c++"]).unwrap();

        let hits = skills.record("rust rust and c++ but no scala");
        skills.record("plain c");

        // "c" is bounded by ' ' and '+' inside "c++", so it counts too
        assert_eq!(hits, 3);
        assert_eq!(skills.count("rust"), Some(1));
        assert_eq!(skills.count("c++"), Some(1));
        assert_eq!(skills.count("c"), Some(2));
        assert_eq!(skills.count("go"), None);
    }

    #[test]
    fn test_invalid_pattern_fails_construction() {
        let result = PatternRegistry::from_patterns(RegistryKind::Skills, &["rust", "bad\\"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_pattern_rejected() {
        let result = PatternRegistry::from_patterns(RegistryKind::Titles, &["QA", "QA"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_fresh_and_merge() {
        let mut total =
            PatternRegistry::from_patterns(RegistryKind::Skills, &["rust", "go"]).unwrap();
        let mut partial = total.fresh();

        total.record("rust");
        partial.record("rust and go");
        total.merge(&partial).unwrap();

        assert_eq!(total.tally(), vec![("rust".to_string(), 2), ("go".to_string(), 1)]);
        assert_eq!(partial.count("rust"), Some(1));
    }

    #[test]
    fn test_merge_rejects_different_patterns() {
        let mut a = PatternRegistry::from_patterns(RegistryKind::Skills, &["rust"]).unwrap();
        let b = PatternRegistry::from_patterns(RegistryKind::Skills, &["go"]).unwrap();
        let c = PatternRegistry::from_patterns(RegistryKind::Titles, &["rust"]).unwrap();

        assert!(a.merge(&b).is_err());
        assert!(a.merge(&c).is_err());
    }

    #[test]
    fn test_reset_and_map_order() {
        let mut registry =
            PatternRegistry::from_patterns(RegistryKind::Skills, &["zig", "ada"]).unwrap();
        registry.record("zig and ada");
        let keys: Vec<_> = registry.to_map().into_keys().collect();
        assert_eq!(keys, vec!["ada", "zig"]);

        registry.reset();
        assert_eq!(registry.count("zig"), Some(0));
    }
}
