//! Per-call traversal context and the `TreeWalker` front type.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task;
use tokio_util::sync::CancellationToken;

use dirtally_core::{CompiledOptions, EntryMetadata, TraversalOptions, WalkError, filter_key};

use crate::fs::{DirEntry, FileSystem, LocalFs};
use crate::permits::PermitPool;
use crate::progress::{ProgressTracker, WalkProgress};

/// Entry point for listing and aggregating directory trees.
///
/// A walker owns the filesystem collaborator, a cancellation token that is
/// the parent of every traversal it starts, and a progress channel.
pub struct TreeWalker {
    fs: Arc<dyn FileSystem>,
    cancel: CancellationToken,
    progress_tx: broadcast::Sender<WalkProgress>,
}

impl TreeWalker {
    /// Create a walker over the local filesystem.
    pub fn new() -> Self {
        Self::with_fs(LocalFs)
    }

    /// Create a walker over a custom filesystem.
    pub fn with_fs(fs: impl FileSystem) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            fs: Arc::new(fs),
            cancel: CancellationToken::new(),
            progress_tx,
        }
    }

    /// Use `cancel` as the parent token of every traversal.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels every traversal started by this walker.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Subscribe to traversal progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<WalkProgress> {
        self.progress_tx.subscribe()
    }

    /// Compile options and set up the shared context for one call.
    pub(crate) fn prepare(
        &self,
        root: &Path,
        options: &TraversalOptions,
    ) -> Result<Arc<Traversal>, WalkError> {
        let options = CompiledOptions::compile(options)?;
        let permits = PermitPool::new(options.options().concurrency);

        Ok(Arc::new(Traversal {
            root: root.to_path_buf(),
            fs: Arc::clone(&self.fs),
            options,
            permits,
            cancel: self.cancel.child_token(),
            progress: ProgressTracker::new(self.progress_tx.clone()),
        }))
    }
}

impl Default for TreeWalker {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only state shared by every task of one traversal.
pub(crate) struct Traversal {
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub options: CompiledOptions,
    pub permits: PermitPool,
    pub cancel: CancellationToken,
    pub progress: ProgressTracker,
}

impl Traversal {
    /// Stat a path on a blocking worker.
    pub async fn stat(&self, path: &Path) -> Result<EntryMetadata, WalkError> {
        self.blocking(path, |fs, p| fs.stat(p), |p, e| WalkError::stat(p, e)).await
    }

    /// List a directory on a blocking worker.
    pub async fn list(&self, path: &Path) -> Result<Vec<DirEntry>, WalkError> {
        self.blocking(path, |fs, p| fs.list(p), |p, e| WalkError::list(p, e)).await
    }

    async fn blocking<T, F, W>(&self, path: &Path, op: F, wrap: W) -> Result<T, WalkError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn FileSystem, &Path) -> io::Result<T> + Send + 'static,
        W: FnOnce(PathBuf, io::Error) -> WalkError,
    {
        if self.cancel.is_cancelled() {
            return Err(WalkError::Cancelled);
        }

        let fs = Arc::clone(&self.fs);
        let owned = path.to_path_buf();
        let result = task::spawn_blocking(move || op(fs.as_ref(), &owned))
            .await
            .map_err(|e| WalkError::Task {
                message: e.to_string(),
            })?;

        result.map_err(|e| {
            self.progress.record_error();
            wrap(path.to_path_buf(), e)
        })
    }

    /// Fail with `NotFound` when the root is missing.
    ///
    /// Other root failures are left for the traversal to report as entries.
    pub async fn ensure_exists(&self) -> Result<(), WalkError> {
        match self.stat(&self.root).await {
            Err(err) if err.is_not_found() => Err(WalkError::NotFound {
                path: self.root.clone(),
            }),
            Err(WalkError::Cancelled) => Err(WalkError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Fail unless the root is an existing directory.
    pub async fn ensure_directory(&self) -> Result<(), WalkError> {
        match self.stat(&self.root).await {
            Ok(metadata) if metadata.is_dir => Ok(()),
            Ok(_) => Err(WalkError::NotADirectory {
                path: self.root.clone(),
            }),
            Err(err) if err.is_not_found() => Err(WalkError::NotFound {
                path: self.root.clone(),
            }),
            Err(err) => Err(err),
        }
    }

    /// String the match/ignore patterns are applied to.
    pub fn key(&self, path: &Path) -> String {
        filter_key(&self.root, path)
    }

    /// Whether emission should stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
