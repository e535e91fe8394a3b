//! Bounded permit pool for concurrent directory descent.

use std::sync::Arc;
use std::thread;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Fixed-capacity counting permit pool.
///
/// Permits are only ever taken with `try_acquire`; callers that get `None`
/// do the work inline instead of waiting.
#[derive(Debug, Clone)]
pub struct PermitPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl PermitPool {
    /// Create a pool with `capacity` permits (0 = available parallelism).
    pub fn new(capacity: usize) -> Self {
        let capacity = match capacity {
            0 => default_capacity(),
            n => n,
        };
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Take a permit if one is free. The permit is released on drop.
    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore).try_acquire_owned().ok()
    }

    /// Total number of permits.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

fn default_capacity() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}
