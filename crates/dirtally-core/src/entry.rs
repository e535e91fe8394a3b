//! Visited entries and directory aggregates.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use compact_str::CompactString;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::WalkError;

/// Metadata captured for a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Whether the path is a directory.
    pub is_dir: bool,
    /// Size in bytes (as reported by the filesystem, not aggregated).
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

impl EntryMetadata {
    /// Metadata for a regular file.
    pub fn file(size: u64, modified: SystemTime) -> Self {
        Self {
            is_dir: false,
            size,
            modified,
        }
    }

    /// Metadata for a directory.
    pub fn directory(modified: SystemTime) -> Self {
        Self {
            is_dir: true,
            size: 0,
            modified,
        }
    }
}

impl From<&Metadata> for EntryMetadata {
    fn from(metadata: &Metadata) -> Self {
        Self {
            is_dir: metadata.is_dir(),
            size: if metadata.is_dir() { 0 } else { metadata.len() },
            modified: metadata.modified().unwrap_or(UNIX_EPOCH),
        }
    }
}

/// One visited path.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    /// Full path of the entry.
    pub path: PathBuf,
    /// Final path component.
    pub name: CompactString,
    /// Metadata, absent when the path could not be read.
    pub metadata: Option<EntryMetadata>,
    /// Depth below the traversal root (root = 0).
    pub depth: usize,
    /// Failure encountered at this path.
    #[serde(serialize_with = "serialize_error", skip_serializing_if = "Option::is_none")]
    pub error: Option<WalkError>,
}

impl Entry {
    /// Create an entry for a successfully read path.
    pub fn new(path: impl Into<PathBuf>, metadata: EntryMetadata, depth: usize) -> Self {
        let path = path.into();
        Self {
            name: entry_name(&path),
            path,
            metadata: Some(metadata),
            depth,
            error: None,
        }
    }

    /// Create an entry for a path whose metadata could not be read.
    pub fn failed(path: impl Into<PathBuf>, depth: usize, error: WalkError) -> Self {
        let path = path.into();
        Self {
            name: entry_name(&path),
            path,
            metadata: None,
            depth,
            error: Some(error),
        }
    }

    /// Attach an error to this entry.
    pub fn with_error(mut self, error: WalkError) -> Self {
        self.error = Some(error);
        self
    }

    /// Check if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.metadata.is_some_and(|m| m.is_dir)
    }

    /// Check if this entry is a non-directory.
    pub fn is_file(&self) -> bool {
        self.metadata.is_some_and(|m| !m.is_dir)
    }

    /// Size in bytes, 0 when unknown.
    pub fn size(&self) -> u64 {
        self.metadata.map_or(0, |m| m.size)
    }

    /// Check if an error was recorded for this entry.
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Recursively merged statistics for a directory subtree.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryAggregate {
    /// Directory path.
    pub path: PathBuf,
    /// Final path component.
    pub name: CompactString,
    /// Metadata of the directory itself.
    pub metadata: Option<EntryMetadata>,
    /// Depth below the aggregation root (root = 0).
    pub depth: usize,
    /// Total bytes of all counted files.
    pub size: u64,
    /// Total number of counted files.
    pub file_count: u64,
    /// Total number of subdirectories, excluding this one.
    pub dir_count: u64,
    /// First subtree failure observed (only when errors are not skipped).
    #[serde(serialize_with = "serialize_error", skip_serializing_if = "Option::is_none")]
    pub error: Option<WalkError>,
    /// Child aggregates, when hierarchical detail was requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DirectoryAggregate>,
    /// Failures of subtrees excluded from the totals, gathered from all descendants.
    #[serde(serialize_with = "serialize_errors", skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<WalkError>,
}

impl DirectoryAggregate {
    /// Create an empty aggregate for a directory.
    pub fn new(path: impl Into<PathBuf>, depth: usize) -> Self {
        let path = path.into();
        Self {
            name: entry_name(&path),
            path,
            metadata: None,
            depth,
            size: 0,
            file_count: 0,
            dir_count: 0,
            error: None,
            children: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Count an immediate file.
    pub fn record_file(&mut self, size: u64) {
        self.file_count += 1;
        self.size += size;
    }

    /// Count an immediate subdirectory.
    pub fn record_dir(&mut self) {
        self.dir_count += 1;
    }

    /// Fold a finished child's totals into this aggregate.
    ///
    /// The child directory itself is counted by `record_dir` when listed.
    pub fn merge(&mut self, child: &DirectoryAggregate) {
        self.size += child.size;
        self.file_count += child.file_count;
        self.dir_count += child.dir_count;
    }

    /// Check if an error was recorded for this aggregate.
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Total files and directories counted below this one.
    pub fn total_items(&self) -> u64 {
        self.file_count + self.dir_count
    }

    /// Convert into a plain entry carrying this directory's metadata.
    pub fn to_entry(&self) -> Entry {
        Entry {
            path: self.path.clone(),
            name: self.name.clone(),
            metadata: self.metadata,
            depth: self.depth,
            error: self.error.clone(),
        }
    }
}

fn entry_name(path: &Path) -> CompactString {
    path.file_name()
        .map(|n| CompactString::new(n.to_string_lossy()))
        .unwrap_or_else(|| CompactString::new(path.to_string_lossy()))
}

fn serialize_error<S: Serializer>(error: &Option<WalkError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

#[allow(clippy::ptr_arg)]
fn serialize_errors<S: Serializer>(errors: &Vec<WalkError>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}
