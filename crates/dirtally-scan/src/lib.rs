//! Concurrent directory listing and size aggregation for dirtally.
//!
//! # Overview
//!
//! `dirtally-scan` walks directory trees on a tokio runtime. Key features:
//!
//! - **Streaming listings** of files, directories or both, delivered through
//!   a bounded channel so a slow consumer throttles the walk
//! - **Bounded parallelism** with an inline fallback when every permit is taken
//! - **Aggregation** of size, file count and directory count per directory
//! - **Cancellation** through a token, or by dropping the result stream
//! - **Progress updates** via broadcast channels
//!
//! # Example
//!
//! ```rust,no_run
//! use dirtally_scan::{TraversalOptions, TreeWalker};
//!
//! # async fn run() -> Result<(), dirtally_scan::WalkError> {
//! let walker = TreeWalker::new();
//! let options = TraversalOptions::recursive();
//!
//! let mut files = walker.list_files("/path/to/scan", &options).await?;
//! while let Some(entry) = files.next().await {
//!     println!("{} ({} bytes)", entry.path.display(), entry.size());
//! }
//!
//! let total = walker.aggregate("/path/to/scan", &options).await?;
//! println!("{} bytes in {} files", total.size, total.file_count);
//! # Ok(())
//! # }
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use dirtally_scan::TreeWalker;
//!
//! let walker = TreeWalker::new();
//! let mut progress_rx = walker.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(progress) = progress_rx.recv().await {
//!         println!("Scanned {} files", progress.files_scanned);
//!     }
//! });
//! ```

mod aggregate;
mod fs;
mod permits;
mod progress;
mod stream;
mod traversal;
mod walk;

use std::path::Path;

pub use fs::{DirEntry, FileSystem, LocalFs};
pub use permits::PermitPool;
pub use progress::{PROGRESS_INTERVAL, WalkProgress};
pub use stream::{ResultSink, ResultStream, result_channel};
pub use traversal::TreeWalker;
pub use walk::ListKind;

// Re-export core types for convenience
pub use dirtally_core::{
    DirectoryAggregate, Entry, EntryMetadata, TimeFilter, TimeOperator, TraversalOptions,
    TraversalOptionsBuilder, WalkError,
};

/// Stream the files under `root` on the local filesystem.
pub async fn list_files(
    root: impl AsRef<Path>,
    options: &TraversalOptions,
) -> Result<ResultStream<Entry>, WalkError> {
    TreeWalker::new().list_files(root, options).await
}

/// Stream the directories under `root` on the local filesystem.
pub async fn list_dirs(
    root: impl AsRef<Path>,
    options: &TraversalOptions,
) -> Result<ResultStream<Entry>, WalkError> {
    TreeWalker::new().list_dirs(root, options).await
}

/// Stream files and directories under `root` on the local filesystem.
pub async fn list_all(
    root: impl AsRef<Path>,
    options: &TraversalOptions,
) -> Result<ResultStream<Entry>, WalkError> {
    TreeWalker::new().list_all(root, options).await
}

/// Look up the file at `root`.
pub async fn get_file(
    root: impl AsRef<Path>,
    options: &TraversalOptions,
) -> Result<Entry, WalkError> {
    TreeWalker::new().get_file(root, options).await
}

/// Look up the directory at `root`.
pub async fn get_dir(root: impl AsRef<Path>, options: &TraversalOptions) -> Result<Entry, WalkError> {
    TreeWalker::new().get_dir(root, options).await
}

/// Look up the entry at `root`, whatever its kind.
pub async fn get_entry(
    root: impl AsRef<Path>,
    options: &TraversalOptions,
) -> Result<Entry, WalkError> {
    TreeWalker::new().get_entry(root, options).await
}

/// Aggregate the tree at `root` on the local filesystem.
pub async fn aggregate(
    root: impl AsRef<Path>,
    options: &TraversalOptions,
) -> Result<DirectoryAggregate, WalkError> {
    TreeWalker::new().aggregate(root, options).await
}

/// Stream the aggregate of every directory under `root`.
pub async fn list_aggregates(
    root: impl AsRef<Path>,
    options: &TraversalOptions,
) -> Result<ResultStream<DirectoryAggregate>, WalkError> {
    TreeWalker::new().list_aggregates(root, options).await
}
