//! Streaming directory walk with bounded concurrent descent.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{debug, trace};

use dirtally_core::{Entry, EntryMetadata, TraversalOptions, WalkError};

use crate::stream::{ResultSink, ResultStream, result_channel};
use crate::traversal::{Traversal, TreeWalker};

/// Which kinds of entries a listing yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Non-directories only.
    Files,
    /// Directories only.
    Dirs,
    /// Both files and directories.
    All,
}

impl ListKind {
    /// Whether entries with this metadata belong to the listing.
    pub fn includes(&self, metadata: &EntryMetadata) -> bool {
        match self {
            Self::Files => !metadata.is_dir,
            Self::Dirs => metadata.is_dir,
            Self::All => true,
        }
    }
}

type Visit = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// State shared by every branch of one walk.
struct WalkTask {
    traversal: Arc<Traversal>,
    kind: ListKind,
    sink: ResultSink<Entry>,
    tracker: TaskTracker,
}

impl WalkTask {
    /// Visit `path`, emitting it and (for directories) its children.
    fn visit(self: Arc<Self>, path: PathBuf, depth: usize) -> Visit {
        Box::pin(async move {
            let metadata = match self.traversal.stat(&path).await {
                Ok(metadata) => metadata,
                Err(err) => {
                    self.offer(Entry::failed(path, depth, err)).await;
                    return;
                }
            };

            if !self.offer(Entry::new(path.clone(), metadata, depth)).await || !metadata.is_dir {
                return;
            }

            let children = match self.traversal.list(&path).await {
                Ok(children) => children,
                Err(err) => {
                    self.offer(Entry::new(path, metadata, depth).with_error(err))
                        .await;
                    return;
                }
            };

            let child_depth = depth + 1;
            for child in children {
                if self.sink.is_closed() {
                    return;
                }

                let child_path = path.join(&child.name);
                if child.metadata.is_dir && self.traversal.options.descends_into(child_depth) {
                    match self.traversal.permits.try_acquire() {
                        Some(permit) => {
                            trace!(path = %child_path.display(), "Descending concurrently");
                            let task = Arc::clone(&self);
                            self.tracker.spawn(async move {
                                task.visit(child_path, child_depth).await;
                                drop(permit);
                            });
                        }
                        None => {
                            trace!(path = %child_path.display(), "Descending inline");
                            Arc::clone(&self).visit(child_path, child_depth).await;
                        }
                    }
                } else if !self
                    .offer(Entry::new(child_path, child.metadata, child_depth))
                    .await
                {
                    return;
                }
            }
        })
    }

    /// Emit an entry if it passes the filters. Returns `false` once the
    /// consumer is gone.
    async fn offer(&self, entry: Entry) -> bool {
        if matches!(entry.error, Some(WalkError::Cancelled)) {
            return false;
        }
        if entry.has_error() {
            return self.sink.push(entry).await;
        }

        let Some(metadata) = entry.metadata else {
            return true;
        };

        // The root directory is not counted, matching aggregate `dir_count`.
        if metadata.is_dir {
            if entry.depth > 0 {
                self.traversal.progress.record_dir(&entry.path);
            }
        } else {
            self.traversal.progress.record_file(&entry.path, metadata.size);
        }

        if !self.wants(&entry, &metadata) {
            return true;
        }
        self.sink.push(entry).await
    }

    fn wants(&self, entry: &Entry, metadata: &EntryMetadata) -> bool {
        let options = &self.traversal.options;
        if entry.depth == 0 && metadata.is_dir && !options.options().include_root {
            return false;
        }

        self.kind.includes(metadata) && options.accepts(&self.traversal.key(&entry.path), metadata)
    }
}

impl TreeWalker {
    /// Stream the files under `root`.
    pub async fn list_files(
        &self,
        root: impl AsRef<Path>,
        options: &TraversalOptions,
    ) -> Result<ResultStream<Entry>, WalkError> {
        self.walk(root.as_ref(), options, ListKind::Files).await
    }

    /// Stream the directories under `root`.
    pub async fn list_dirs(
        &self,
        root: impl AsRef<Path>,
        options: &TraversalOptions,
    ) -> Result<ResultStream<Entry>, WalkError> {
        self.walk(root.as_ref(), options, ListKind::Dirs).await
    }

    /// Stream every file and directory under `root`.
    pub async fn list_all(
        &self,
        root: impl AsRef<Path>,
        options: &TraversalOptions,
    ) -> Result<ResultStream<Entry>, WalkError> {
        self.walk(root.as_ref(), options, ListKind::All).await
    }

    /// Look up `root` itself as a file.
    pub async fn get_file(
        &self,
        root: impl AsRef<Path>,
        options: &TraversalOptions,
    ) -> Result<Entry, WalkError> {
        self.find(root.as_ref(), options, ListKind::Files).await
    }

    /// Look up `root` itself as a directory.
    pub async fn get_dir(
        &self,
        root: impl AsRef<Path>,
        options: &TraversalOptions,
    ) -> Result<Entry, WalkError> {
        self.find(root.as_ref(), options, ListKind::Dirs).await
    }

    /// Look up `root` itself, whatever its kind.
    pub async fn get_entry(
        &self,
        root: impl AsRef<Path>,
        options: &TraversalOptions,
    ) -> Result<Entry, WalkError> {
        self.find(root.as_ref(), options, ListKind::All).await
    }

    /// Start a walk and return its result stream.
    ///
    /// Fails before anything is produced if the options do not compile or
    /// the root does not exist.
    pub async fn walk(
        &self,
        root: &Path,
        options: &TraversalOptions,
        kind: ListKind,
    ) -> Result<ResultStream<Entry>, WalkError> {
        let traversal = self.prepare(root, options)?;
        traversal.ensure_exists().await?;

        let (sink, stream) = result_channel(
            traversal.options.options().buffer_size,
            traversal.cancel.clone(),
        );
        let tracker = TaskTracker::new();
        let task = Arc::new(WalkTask {
            traversal: Arc::clone(&traversal),
            kind,
            sink,
            tracker: tracker.clone(),
        });

        debug!(
            root = %root.display(),
            ?kind,
            permits = traversal.permits.capacity(),
            "Starting walk"
        );

        tokio::spawn(async move {
            Arc::clone(&task).visit(traversal.root.clone(), 0).await;
            tracker.close();
            tracker.wait().await;
            // Last sink handle: the stream closes here.
            drop(task);
            traversal.progress.finish(&traversal.root);
            debug!(root = %traversal.root.display(), "Walk finished");
        });

        Ok(stream)
    }

    /// Drain a walk until the entry for `root` itself shows up.
    async fn find(
        &self,
        root: &Path,
        options: &TraversalOptions,
        kind: ListKind,
    ) -> Result<Entry, WalkError> {
        let options = TraversalOptions {
            include_root: true,
            ..options.clone()
        };

        let mut stream = self.walk(root, &options, kind).await?;
        while let Some(entry) = stream.next().await {
            if entry.path == root {
                return Ok(entry);
            }
        }

        Err(WalkError::NotFound {
            path: root.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_kind_includes() {
        let file = EntryMetadata::file(1, std::time::UNIX_EPOCH);
        let dir = EntryMetadata::directory(std::time::UNIX_EPOCH);

        assert!(ListKind::Files.includes(&file));
        assert!(!ListKind::Files.includes(&dir));
        assert!(ListKind::Dirs.includes(&dir));
        assert!(!ListKind::Dirs.includes(&file));
        assert!(ListKind::All.includes(&file) && ListKind::All.includes(&dir));
    }
}
