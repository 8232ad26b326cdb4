//! Strategy registry - maps request URLs to caching strategies

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Caching strategy kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Serve fresh cache, fetch on miss, stale fallback on network failure
    CacheFirst,
    /// Fetch first, fall back to any cached entry on failure
    NetworkFirst,
    /// Serve fresh cache immediately, revalidate in the background
    StaleWhileRevalidate,
    /// Always fetch; never touches the cache
    NetworkOnly,
    /// Always serve cache; fail if absent
    CacheOnly,
}

/// One URL-pattern -> strategy mapping
#[derive(Debug, Clone)]
pub struct StrategyRule {
    /// Rule name (also selects the target partition)
    pub name: String,

    /// URL pattern this rule applies to
    pub pattern: Regex,

    /// Strategy to run for matching requests
    pub kind: StrategyKind,

    /// Entry freshness window in milliseconds (0 = never expires by age)
    pub max_age_ms: i64,

    /// Per-partition entry cap enforced after each write
    pub max_entries: usize,
}

/// Ordered rule set with a built-in default
///
/// Resolution walks the rules in declaration order and returns the first
/// match; unmatched URLs get the default rule. Rules are fixed at
/// construction time.
pub struct StrategyRegistry {
    rules: Vec<StrategyRule>,
    default_rule: StrategyRule,
}

impl StrategyRegistry {
    /// Registry with the built-in Kickoff Club rule set
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.add_rule(
            "static",
            r"\.(js|css|woff2?|png|jpg|jpeg|svg|ico)$",
            StrategyKind::CacheFirst,
            24 * 60 * 60 * 1000,
            100,
        );
        registry.add_rule("api", r"/api/", StrategyKind::NetworkFirst, 5 * 60 * 1000, 50);
        registry.add_rule(
            "lessons",
            r"/lessons?/",
            StrategyKind::StaleWhileRevalidate,
            60 * 60 * 1000,
            200,
        );
        registry.add_rule(
            "pages",
            r"/(lesson|profile|tracks|demo)",
            StrategyKind::NetworkFirst,
            10 * 60 * 1000,
            30,
        );
        registry
    }

    /// Registry with only the default rule
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            default_rule: StrategyRule {
                name: "default".to_string(),
                // Never consulted; the default applies when nothing matches
                pattern: Regex::new(".*").expect("literal pattern"),
                kind: StrategyKind::NetworkFirst,
                max_age_ms: 5 * 60 * 1000,
                max_entries: 20,
            },
        }
    }

    /// Append a rule; malformed patterns are skipped
    pub fn add_rule(
        &mut self,
        name: &str,
        pattern: &str,
        kind: StrategyKind,
        max_age_ms: i64,
        max_entries: usize,
    ) {
        if let Ok(pattern) = Regex::new(pattern) {
            self.rules.push(StrategyRule {
                name: name.to_string(),
                pattern,
                kind,
                max_age_ms,
                max_entries,
            });
        } else {
            tracing::warn!(rule = name, "skipping rule with malformed pattern");
        }
    }

    /// Resolve the strategy rule for a URL
    ///
    /// Always returns a rule: the first whose pattern matches, in
    /// declaration order, or the default rule.
    pub fn resolve(&self, url: &str) -> &StrategyRule {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(url))
            .unwrap_or(&self.default_rule)
    }

    /// The built-in default rule
    pub fn default_rule(&self) -> &StrategyRule {
        &self.default_rule
    }

    /// Configured rules in resolution order (default excluded)
    pub fn rules(&self) -> &[StrategyRule] {
        &self.rules
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
