//! Filesystem access used by the engines.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;

use dirtally_core::EntryMetadata;

/// One child returned by a directory listing.
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// File name within the listed directory.
    pub name: OsString,
    /// Metadata of the child, not following symbolic links.
    pub metadata: EntryMetadata,
}

impl DirEntry {
    /// Create a new listing entry.
    pub fn new(name: impl Into<OsString>, metadata: EntryMetadata) -> Self {
        Self {
            name: name.into(),
            metadata,
        }
    }
}

/// Blocking stat/list provider.
///
/// Calls are made from `spawn_blocking` workers, so implementations may block.
pub trait FileSystem: Send + Sync + 'static {
    /// Read metadata for a single path.
    fn stat(&self, path: &Path) -> io::Result<EntryMetadata>;

    /// List the immediate children of a directory, in listing order.
    fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>>;
}

/// The local filesystem via `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn stat(&self, path: &Path) -> io::Result<EntryMetadata> {
        fs::metadata(path).map(|m| EntryMetadata::from(&m))
    }

    fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut children = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            if let Some(child) = listed_child(entry.file_name(), entry.metadata())? {
                children.push(child);
            }
        }
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }
}

/// Convert one listed child, dropping it if it vanished after `read_dir`.
fn listed_child(
    name: OsString,
    metadata: io::Result<fs::Metadata>,
) -> io::Result<Option<DirEntry>> {
    match metadata {
        Ok(metadata) => Ok(Some(DirEntry::new(name, EntryMetadata::from(&metadata)))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_list_sorted() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.txt"), "bb").unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        fs::create_dir(temp.path().join("c")).unwrap();

        let children = LocalFs.list(temp.path()).unwrap();
        let names: Vec<_> = children.iter().map(|c| c.name.to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c"]);
        assert_eq!(children[1].metadata.size, 2);
        assert!(children[2].metadata.is_dir);
    }

    #[test]
    fn test_listed_child_vanished() {
        let gone = io::Error::from(io::ErrorKind::NotFound);
        assert!(listed_child("gone".into(), Err(gone)).unwrap().is_none());

        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        let err = listed_child("locked".into(), Err(denied)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);

        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("here"), "abc").unwrap();
        let metadata = fs::symlink_metadata(temp.path().join("here"));
        let child = listed_child("here".into(), metadata).unwrap().unwrap();
        assert_eq!(child.name, "here");
        assert_eq!(child.metadata.size, 3);
    }

    #[test]
    fn test_local_stat_missing() {
        let temp = TempDir::new().unwrap();
        let err = LocalFs.stat(&temp.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
