//! Repository exclusion policy
//!
//! Decides which repositories are left out of star totals. There are two tiers:
//!
//! - name exclusion: caller-supplied names plus the configured exact list. Only
//!   needs a repository name, so it works outside repository listings too.
//! - policy exclusion: archived/fork/private flags and name patterns. Needs a
//!   full [`RepositoryDescriptor`].
//!
//! Rules are parsed from plain configuration strings. Malformed entries are
//! logged and skipped; they never fail the caller.

use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::warn;

pub const EXCLUDE_ARCHIVED_KEY: &str = "EXCLUDE_ARCHIVED";
pub const EXCLUDE_FORK_KEY: &str = "EXCLUDE_FORK";
pub const EXCLUDE_PRIVATE_KEY: &str = "EXCLUDE_PRIVATE";
pub const EXCLUDE_REPO_KEY: &str = "EXCLUDE_REPO";
pub const EXCLUDE_REPO_REGEX_KEY: &str = "EXCLUDE_REPO_REGEX";

/// Longest pattern body accepted from configuration
const MAX_PATTERN_LEN: usize = 256;
/// Compiled program size cap for configured patterns
const PATTERN_SIZE_LIMIT: usize = 256 * 1024;

static QUOTED_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("'([^']*)'").expect("quoted token pattern is valid"));

/// A repository as seen on one page of results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryDescriptor {
    pub name: String,
    pub star_count: u64,
    pub is_archived: bool,
    pub is_fork: bool,
    pub is_private: bool,
}

/// Attribute-based exclusion switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExclusionFlags {
    pub archived: bool,
    pub fork: bool,
    pub private: bool,
}

/// Extract every `'...'` token from `raw`, left to right.
///
/// Text outside quotes is ignored, empty tokens are kept and an unterminated
/// trailing quote contributes nothing.
pub fn parse_quoted_list(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    QUOTED_TOKEN
        .captures_iter(raw)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Parse a quoted list of patterns, each optionally wrapped in `/.../`.
///
/// At most one leading and one trailing slash are stripped, independently.
/// Tokens that fail to compile are logged and dropped; the rest are kept.
pub fn parse_regex_list(raw: &str) -> Vec<Regex> {
    let mut patterns = Vec::new();

    for token in parse_quoted_list(raw) {
        let body = strip_delimiters(&token);

        // An empty body would match every repository name.
        if body.is_empty() {
            warn!("Ignoring empty repository exclusion pattern {:?}", token);
            continue;
        }

        if body.len() > MAX_PATTERN_LEN {
            warn!(
                "Ignoring repository exclusion pattern longer than {} bytes",
                MAX_PATTERN_LEN
            );
            continue;
        }

        match RegexBuilder::new(body)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
        {
            Ok(pattern) => patterns.push(pattern),
            Err(e) => warn!("Ignoring invalid repository exclusion pattern {:?}: {}", token, e),
        }
    }

    patterns
}

fn strip_delimiters(token: &str) -> &str {
    let body = token.strip_prefix('/').unwrap_or(token);
    body.strip_suffix('/').unwrap_or(body)
}

/// `true` only for a case-insensitive `"true"`; anything else, including a
/// missing value, falls back to `default`.
pub fn parse_boolean(raw: Option<&str>, default: bool) -> bool {
    match raw {
        Some(value) if value.eq_ignore_ascii_case("true") => true,
        _ => default,
    }
}

pub fn read_exclusion_flags(lookup: impl Fn(&str) -> Option<String>) -> ExclusionFlags {
    let flag = |key: &str| parse_boolean(lookup(key).as_deref(), false);

    ExclusionFlags {
        archived: flag(EXCLUDE_ARCHIVED_KEY),
        fork: flag(EXCLUDE_FORK_KEY),
        private: flag(EXCLUDE_PRIVATE_KEY),
    }
}

pub fn read_exact_names(lookup: impl Fn(&str) -> Option<String>) -> HashSet<String> {
    lookup(EXCLUDE_REPO_KEY)
        .map(|raw| parse_quoted_list(&raw).into_iter().collect())
        .unwrap_or_default()
}

pub fn read_patterns(lookup: impl Fn(&str) -> Option<String>) -> Vec<Regex> {
    lookup(EXCLUDE_REPO_REGEX_KEY)
        .map(|raw| parse_regex_list(&raw))
        .unwrap_or_default()
}

/// Snapshot of every configured exclusion rule
#[derive(Debug, Clone, Default)]
pub struct ExclusionRules {
    pub flags: ExclusionFlags,
    pub exact_names: HashSet<String>,
    pub patterns: Vec<Regex>,
}

impl ExclusionRules {
    /// Build the rules from a key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            flags: read_exclusion_flags(&lookup),
            exact_names: read_exact_names(&lookup),
            patterns: read_patterns(&lookup),
        }
    }

    /// Build the rules from the current process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Whether any attribute flag, exact name or pattern matches `repo`
    pub fn is_excluded_by_policy(&self, repo: &RepositoryDescriptor) -> bool {
        (self.flags.archived && repo.is_archived)
            || (self.flags.fork && repo.is_fork)
            || (self.flags.private && repo.is_private)
            || self.exact_names.contains(&repo.name)
            || self.patterns.iter().any(|p| p.is_match(&repo.name))
    }

    /// Caller names unioned with the configured exact names.
    ///
    /// Flags and patterns are not part of this set.
    pub fn combined_excluded_names(&self, caller_names: &[String]) -> HashSet<String> {
        caller_names
            .iter()
            .cloned()
            .chain(self.exact_names.iter().cloned())
            .collect()
    }
}
