//! Match/ignore pattern compilation and the compiled traversal plan.

use std::path::Path;

use regex::{Regex, RegexSet};

use crate::config::{TimeFilter, TraversalOptions};
use crate::entry::EntryMetadata;
use crate::error::WalkError;

/// Inclusion predicate over path strings.
///
/// Ignore patterns always win over match patterns. With no match patterns
/// every non-ignored path is included.
#[derive(Debug, Clone)]
pub struct PathFilter {
    matches: Option<RegexSet>,
    ignores: Option<RegexSet>,
}

impl PathFilter {
    /// Compile match and ignore pattern lists.
    pub fn compile<S: AsRef<str>>(matches: &[S], ignores: &[S]) -> Result<Self, WalkError> {
        Ok(Self {
            matches: compile_set(matches)?,
            ignores: compile_set(ignores)?,
        })
    }

    /// Whether any match pattern accepts the path (true when there are none).
    pub fn is_match(&self, path: &str) -> bool {
        self.matches.as_ref().is_none_or(|set| set.is_match(path))
    }

    /// Whether any ignore pattern rejects the path (false when there are none).
    pub fn is_ignored(&self, path: &str) -> bool {
        self.ignores.as_ref().is_some_and(|set| set.is_match(path))
    }

    /// Final inclusion decision for a path.
    pub fn include(&self, path: &str) -> bool {
        !self.is_ignored(path) && self.is_match(path)
    }
}

fn compile_set<S: AsRef<str>>(patterns: &[S]) -> Result<Option<RegexSet>, WalkError> {
    if patterns.is_empty() {
        return Ok(None);
    }

    // Compile individually first so the error names the offending pattern.
    for pattern in patterns {
        Regex::new(pattern.as_ref()).map_err(|source| WalkError::InvalidPattern {
            pattern: pattern.as_ref().to_string(),
            source,
        })?;
    }

    RegexSet::new(patterns.iter().map(AsRef::as_ref))
        .map(Some)
        .map_err(|source| WalkError::InvalidPattern {
            pattern: patterns
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join("|"),
            source,
        })
}

/// Immutable, shareable form of `TraversalOptions`.
///
/// Built once per call before any I/O and then only read.
#[derive(Debug, Clone)]
pub struct CompiledOptions {
    options: TraversalOptions,
    filter: PathFilter,
    depth_limit: Option<usize>,
}

impl CompiledOptions {
    /// Validate options and compile their patterns.
    pub fn compile(options: &TraversalOptions) -> Result<Self, WalkError> {
        options.validate()?;
        let filter = PathFilter::compile(&options.match_patterns, &options.ignore_patterns)?;

        Ok(Self {
            depth_limit: options.depth_limit(),
            options: options.clone(),
            filter,
        })
    }

    /// The source options.
    pub fn options(&self) -> &TraversalOptions {
        &self.options
    }

    /// The compiled path filter.
    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    /// Deepest level visited, `None` when unbounded.
    pub fn depth_limit(&self) -> Option<usize> {
        self.depth_limit
    }

    /// Whether a directory at `depth` should have its contents read.
    pub fn descends_into(&self, depth: usize) -> bool {
        self.depth_limit.is_none_or(|limit| depth < limit)
    }

    /// Whether every time filter accepts the modification time.
    pub fn passes_time_filters(&self, metadata: &EntryMetadata) -> bool {
        self.options
            .time_filters
            .iter()
            .all(|t: &TimeFilter| t.accepts(metadata.modified))
    }

    /// Apply time filters, then ignore patterns, then match patterns.
    pub fn accepts(&self, key: &str, metadata: &EntryMetadata) -> bool {
        self.passes_time_filters(metadata) && self.filter.include(key)
    }
}

/// String a path is matched against: relative to `root`, or the full path
/// for the root itself.
pub fn filter_key(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative.to_string_lossy().into_owned(),
        _ => path.to_string_lossy().into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TimeOperator, TraversalOptions};
    use std::time::{Duration, SystemTime};

    #[test]
    fn test_empty_filter_includes_everything() {
        let filter = PathFilter::compile::<&str>(&[], &[]).unwrap();
        assert!(filter.include("anything"));
        assert!(!filter.is_ignored("anything"));
    }

    #[test]
    fn test_ignore_wins_over_match() {
        let filter = PathFilter::compile(&["fuga"], &["hoge", "fuga0$"]).unwrap();
        assert!(filter.include("fuga1"));
        assert!(!filter.include("fuga0"));
        assert!(!filter.include("hoge_fuga"));
        assert!(!filter.include("other"));
    }

    #[test]
    fn test_invalid_pattern_names_pattern() {
        let err = PathFilter::compile(&["ok", "(unclosed"], &[]).unwrap_err();
        match err {
            WalkError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "(unclosed"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_compiled_options_depth() {
        let compiled = CompiledOptions::compile(&TraversalOptions::default()).unwrap();
        assert!(compiled.descends_into(0));
        assert!(!compiled.descends_into(1));

        let compiled = CompiledOptions::compile(&TraversalOptions::recursive()).unwrap();
        assert!(compiled.descends_into(100));
    }

    #[test]
    fn test_compiled_options_time_then_pattern() {
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(10_000);
        let options = TraversalOptions {
            ignore_patterns: vec!["^tmp".to_string()],
            time_filters: vec![crate::TimeFilter::new(base, TimeOperator::Before)],
            ..TraversalOptions::default()
        };
        let compiled = CompiledOptions::compile(&options).unwrap();

        let newer = EntryMetadata::file(1, base + Duration::from_secs(5));
        let older = EntryMetadata::file(1, base - Duration::from_secs(5));

        assert!(compiled.accepts("keep.txt", &newer));
        assert!(!compiled.accepts("keep.txt", &older));
        assert!(!compiled.accepts("tmp/file", &newer));
    }

    #[test]
    fn test_filter_key() {
        let root = Path::new("/data");
        assert_eq!(filter_key(root, Path::new("/data/skip/a.txt")), format!("skip{}a.txt", std::path::MAIN_SEPARATOR));
        assert_eq!(filter_key(root, Path::new("/data")), "/data");
    }
}
