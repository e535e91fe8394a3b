//! Traversal progress reporting.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

/// Number of recorded items between progress broadcasts.
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Progress information during a traversal.
#[derive(Debug, Clone)]
pub struct WalkProgress {
    /// Number of files seen so far.
    pub files_scanned: u64,
    /// Number of directories seen so far.
    pub dirs_scanned: u64,
    /// Total bytes of files seen so far.
    pub bytes_scanned: u64,
    /// Most recently recorded path.
    pub current_path: PathBuf,
    /// Number of stat/list failures.
    pub errors_count: u64,
    /// Time elapsed since the traversal started.
    pub elapsed: Duration,
    /// Whether this is the final report for the traversal.
    pub finished: bool,
}

impl WalkProgress {
    /// Calculate scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Get total items scanned (files + dirs).
    pub fn total_items(&self) -> u64 {
        self.files_scanned + self.dirs_scanned
    }
}

/// Shared counters for one traversal.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    files: AtomicU64,
    dirs: AtomicU64,
    bytes: AtomicU64,
    errors: AtomicU64,
    tx: broadcast::Sender<WalkProgress>,
}

impl ProgressTracker {
    pub fn new(tx: broadcast::Sender<WalkProgress>) -> Self {
        Self {
            start_time: Instant::now(),
            files: AtomicU64::new(0),
            dirs: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            tx,
        }
    }

    pub fn record_file(&self, path: &Path, size: u64) {
        self.bytes.fetch_add(size, Ordering::Relaxed);
        let files = self.files.fetch_add(1, Ordering::Relaxed) + 1;
        self.maybe_publish(files + self.dirs.load(Ordering::Relaxed), path);
    }

    pub fn record_dir(&self, path: &Path) {
        let dirs = self.dirs.fetch_add(1, Ordering::Relaxed) + 1;
        self.maybe_publish(dirs + self.files.load(Ordering::Relaxed), path);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn finish(&self, root: &Path) {
        let _ = self.tx.send(self.snapshot(root, true));
    }

    fn maybe_publish(&self, total: u64, path: &Path) {
        if total % PROGRESS_INTERVAL == 0 && self.tx.receiver_count() > 0 {
            let _ = self.tx.send(self.snapshot(path, false));
        }
    }

    fn snapshot(&self, path: &Path, finished: bool) -> WalkProgress {
        WalkProgress {
            files_scanned: self.files.load(Ordering::Relaxed),
            dirs_scanned: self.dirs.load(Ordering::Relaxed),
            bytes_scanned: self.bytes.load(Ordering::Relaxed),
            current_path: path.to_path_buf(),
            errors_count: self.errors.load(Ordering::Relaxed),
            elapsed: self.start_time.elapsed(),
            finished,
        }
    }
}
