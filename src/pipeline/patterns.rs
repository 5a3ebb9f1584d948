//! Pattern resolution: prefix closure of path globs and important/ignore
//! precedence.
//!
//! Resolution happens once per run; the resulting [`MatchRules`] are pure
//! data and immutable for the run's duration.

use std::collections::{BTreeMap, BTreeSet};

use glob::Pattern;

/// Resolved path-matching rules for one run.
///
/// The guarantee upheld here: a path that matches any important pattern is
/// never excluded by ignore rules, regardless of declaration order in the
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRules {
    doc_extensions: BTreeSet<String>,
    important: BTreeSet<String>,
    effective_ignore: BTreeSet<String>,
    path_mappings: BTreeMap<String, String>,
}

/// Computes the prefix closure of a pattern list.
///
/// For a pattern `a/b/c` the closure contains `a`, `a/b`, and `a/b/c` as
/// independent entries, so matching any ancestor directory also counts as
/// a match. Entries are deduplicated as a set.
#[must_use]
pub fn prefix_closure(patterns: &[String]) -> BTreeSet<String> {
    let mut closed = BTreeSet::new();
    for pattern in patterns {
        let mut prefix = String::new();
        for segment in pattern.split('/').filter(|s| !s.is_empty()) {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            closed.insert(prefix.clone());
        }
    }
    closed
}

/// Returns `true` if `path` matches the closed entry.
///
/// Entries containing glob metacharacters use glob semantics; plain
/// entries match exactly or as a directory prefix of the path.
fn entry_matches(entry: &str, path: &str) -> bool {
    if entry.contains(['*', '?', '[']) {
        return Pattern::new(entry).is_ok_and(|p| p.matches(path));
    }
    entry == path || path.strip_prefix(entry).is_some_and(|rest| rest.starts_with('/'))
}

impl MatchRules {
    /// Resolves configured pattern lists into match rules.
    ///
    /// Both the important and ignore lists are prefix-closed identically;
    /// the effective ignore set is the closure of the ignore patterns
    /// minus the closure of the important patterns, compared by exact
    /// string equality on the closed entries.
    #[must_use]
    pub fn resolve(
        doc_extensions: &[String],
        ignore_patterns: &[String],
        important_patterns: &[String],
        path_mappings: BTreeMap<String, String>,
    ) -> Self {
        let important = prefix_closure(important_patterns);
        let ignore_closure = prefix_closure(ignore_patterns);
        let effective_ignore = ignore_closure.difference(&important).cloned().collect();

        Self {
            doc_extensions: doc_extensions.iter().cloned().collect(),
            important,
            effective_ignore,
            path_mappings,
        }
    }

    /// Returns `true` if `path` matches any important pattern.
    #[must_use]
    pub fn is_important(&self, path: &str) -> bool {
        self.important.iter().any(|entry| entry_matches(entry, path))
    }

    /// Returns `true` if `path` is excluded by the effective ignore set.
    ///
    /// Important paths are never ignored.
    #[must_use]
    pub fn is_ignored(&self, path: &str) -> bool {
        if self.is_important(path) {
            return false;
        }
        self.effective_ignore.iter().any(|entry| entry_matches(entry, path))
    }

    /// Returns `true` if `path` carries a documentation extension.
    #[must_use]
    pub fn is_doc_file(&self, path: &str) -> bool {
        self.doc_extensions.iter().any(|ext| path.ends_with(ext.as_str()))
    }

    /// The effective ignore set after important subtraction.
    #[must_use]
    pub fn effective_ignore(&self) -> &BTreeSet<String> {
        &self.effective_ignore
    }

    /// The prefix closure of the important patterns.
    #[must_use]
    pub fn important_closure(&self) -> &BTreeSet<String> {
        &self.important
    }

    /// Configured source-prefix to docs-prefix rewrites.
    #[must_use]
    pub fn path_mappings(&self) -> &BTreeMap<String, String> {
        &self.path_mappings
    }
}
