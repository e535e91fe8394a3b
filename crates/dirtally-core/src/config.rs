//! Traversal configuration types.

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::WalkError;

/// Default capacity of the result channel between producers and consumer.
pub const DEFAULT_BUFFER_SIZE: usize = 20;

/// Configuration shared by listing and aggregation.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct TraversalOptions {
    /// Regular expressions; a path is included if any matches (all paths if empty).
    #[builder(default)]
    #[serde(default)]
    pub match_patterns: Vec<String>,

    /// Regular expressions; a path matching any of these is excluded.
    #[builder(default)]
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Descend into subdirectories without a depth limit (unless `max_depth` is set).
    #[builder(default = "false")]
    #[serde(default)]
    pub recurse: bool,

    /// Maximum depth below the root (0 = unbounded if recursing, direct children otherwise).
    #[builder(default = "0")]
    #[serde(default)]
    pub max_depth: usize,

    /// Modification-time filters, all of which must pass.
    #[builder(default)]
    #[serde(default)]
    pub time_filters: Vec<TimeFilter>,

    /// Exclude failing subtrees from aggregate totals instead of failing the parent.
    #[builder(default = "false")]
    #[serde(default)]
    pub err_skip: bool,

    /// Emit the root directory itself when listing.
    #[builder(default = "false")]
    #[serde(default)]
    pub include_root: bool,

    /// Keep child aggregates in `DirectoryAggregate::children`.
    #[builder(default = "false")]
    #[serde(default)]
    pub keep_children: bool,

    /// Concurrent descent permits (0 = available parallelism).
    #[builder(default = "0")]
    #[serde(default)]
    pub concurrency: usize,

    /// Capacity of the result stream buffer.
    #[builder(default = "DEFAULT_BUFFER_SIZE")]
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

impl TraversalOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.buffer_size == Some(0) {
            return Err("Buffer size must be at least 1".to_string());
        }
        Ok(())
    }
}

impl TraversalOptions {
    /// Create a new options builder.
    pub fn builder() -> TraversalOptionsBuilder {
        TraversalOptionsBuilder::default()
    }

    /// Options for an unbounded recursive traversal.
    pub fn recursive() -> Self {
        Self {
            recurse: true,
            ..Self::default()
        }
    }

    /// Deepest level that will be visited, `None` when unbounded.
    ///
    /// A positive `max_depth` caps the walk even when `recurse` is set.
    pub fn depth_limit(&self) -> Option<usize> {
        match (self.max_depth, self.recurse) {
            (0, true) => None,
            (0, false) => Some(1),
            (depth, _) => Some(depth),
        }
    }

    /// Check the options without compiling patterns.
    pub fn validate(&self) -> Result<(), WalkError> {
        if self.buffer_size == 0 {
            return Err(WalkError::InvalidConfig {
                message: "buffer_size must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            match_patterns: Vec::new(),
            ignore_patterns: Vec::new(),
            recurse: false,
            max_depth: 0,
            time_filters: Vec::new(),
            err_skip: false,
            include_root: false,
            keep_children: false,
            concurrency: 0,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// How a time filter compares its base time against a modification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum TimeOperator {
    /// The base time is earlier than the modification time.
    Before,
    /// The base time is later than the modification time.
    After,
    /// The base time equals the modification time.
    Equal,
}

impl FromStr for TimeOperator {
    type Err = WalkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            "equal" => Ok(Self::Equal),
            _ => Err(WalkError::UnsupportedTimeOperator {
                operator: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for TimeOperator {
    type Error = WalkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for TimeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => write!(f, "before"),
            Self::After => write!(f, "after"),
            Self::Equal => write!(f, "equal"),
        }
    }
}

/// A modification-time predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFilter {
    /// Reference time.
    pub base: DateTime<Utc>,
    /// Comparison of `base` against the entry's modification time.
    pub operator: TimeOperator,
}

impl TimeFilter {
    /// Create a new time filter.
    pub fn new(base: impl Into<DateTime<Utc>>, operator: TimeOperator) -> Self {
        Self {
            base: base.into(),
            operator,
        }
    }

    /// Check a modification time against this filter.
    pub fn accepts(&self, modified: SystemTime) -> bool {
        let modified = DateTime::<Utc>::from(modified);
        match self.operator {
            TimeOperator::Before => self.base < modified,
            TimeOperator::After => self.base > modified,
            TimeOperator::Equal => self.base == modified,
        }
    }
}

/// Parses `"<operator>:<RFC 3339 timestamp>"`, e.g. `after:2024-01-01T00:00:00Z`.
impl FromStr for TimeFilter {
    type Err = WalkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (operator, base) = s.split_once(':').ok_or_else(|| WalkError::InvalidTimeFilter {
            value: s.to_string(),
            message: "expected <operator>:<timestamp>".to_string(),
        })?;
        let operator = operator.parse()?;
        let base = DateTime::parse_from_rfc3339(base.trim()).map_err(|e| {
            WalkError::InvalidTimeFilter {
                value: s.to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(Self::new(base.with_timezone(&Utc), operator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_options_builder() {
        let options = TraversalOptions::builder()
            .match_patterns(vec!["\\.rs$".to_string()])
            .recurse(true)
            .concurrency(2usize)
            .build()
            .unwrap();

        assert_eq!(options.match_patterns.len(), 1);
        assert!(options.recurse);
        assert_eq!(options.concurrency, 2);
        assert_eq!(options.buffer_size, DEFAULT_BUFFER_SIZE);
        assert!(!options.err_skip);
    }

    #[test]
    fn test_builder_rejects_zero_buffer() {
        let result = TraversalOptions::builder().buffer_size(0usize).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_depth_limit() {
        let mut options = TraversalOptions::default();
        assert_eq!(options.depth_limit(), Some(1));

        options.recurse = true;
        assert_eq!(options.depth_limit(), None);

        options.max_depth = 3;
        assert_eq!(options.depth_limit(), Some(3));

        options.recurse = false;
        assert_eq!(options.depth_limit(), Some(3));
    }

    #[test]
    fn test_time_operator_parse() {
        assert_eq!("before".parse::<TimeOperator>().unwrap(), TimeOperator::Before);
        assert_eq!("AFTER".parse::<TimeOperator>().unwrap(), TimeOperator::After);
        assert!(matches!(
            "around".parse::<TimeOperator>(),
            Err(WalkError::UnsupportedTimeOperator { .. })
        ));
    }

    #[test]
    fn test_time_filter_accepts() {
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        let later = base + Duration::from_secs(60);

        assert!(TimeFilter::new(base, TimeOperator::Before).accepts(later));
        assert!(!TimeFilter::new(base, TimeOperator::After).accepts(later));
        assert!(TimeFilter::new(later, TimeOperator::After).accepts(base));
        assert!(TimeFilter::new(base, TimeOperator::Equal).accepts(base));
    }

    #[test]
    fn test_time_filter_from_str() {
        let filter: TimeFilter = "after:2024-01-01T00:00:00Z".parse().unwrap();
        assert_eq!(filter.operator, TimeOperator::After);
        assert_eq!(filter.base.to_rfc3339(), "2024-01-01T00:00:00+00:00");

        assert!(matches!(
            "since:2024-01-01T00:00:00Z".parse::<TimeFilter>(),
            Err(WalkError::UnsupportedTimeOperator { .. })
        ));
        assert!(matches!(
            "after:yesterday".parse::<TimeFilter>(),
            Err(WalkError::InvalidTimeFilter { .. })
        ));
    }
}
