//! Recursive size/file/directory aggregation with bounded concurrent descent.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

use dirtally_core::{DirectoryAggregate, TraversalOptions, WalkError};

use crate::stream::{ResultSink, ResultStream, result_channel};
use crate::traversal::{Traversal, TreeWalker};

type Measure = Pin<Box<dyn Future<Output = DirectoryAggregate> + Send + 'static>>;

/// State shared by every branch of one aggregation.
struct AggregateTask {
    traversal: Arc<Traversal>,
    sink: Option<ResultSink<DirectoryAggregate>>,
}

impl AggregateTask {
    /// Aggregate the subtree at `path`.
    ///
    /// The result is final: every child, inline or concurrent, has been
    /// folded in before it is returned or reported.
    fn measure(self: Arc<Self>, path: PathBuf, depth: usize) -> Measure {
        Box::pin(async move {
            let mut aggregate = DirectoryAggregate::new(path.clone(), depth);

            match self.traversal.stat(&path).await {
                Ok(metadata) => aggregate.metadata = Some(metadata),
                Err(err) => {
                    aggregate.error = Some(err);
                    self.report(&aggregate).await;
                    return aggregate;
                }
            }

            let children = match self.traversal.list(&path).await {
                Ok(children) => children,
                Err(err) => {
                    aggregate.error = Some(err);
                    self.report(&aggregate).await;
                    return aggregate;
                }
            };

            let child_depth = depth + 1;
            let mut pending = JoinSet::new();

            for child in children {
                let child_path = path.join(&child.name);
                if !child.metadata.is_dir {
                    self.traversal.progress.record_file(&child_path, child.metadata.size);
                    aggregate.record_file(child.metadata.size);
                    continue;
                }

                self.traversal.progress.record_dir(&child_path);
                aggregate.record_dir();

                // Once a failure is attached, no further subtrees are started.
                if aggregate.has_error() || !self.traversal.options.descends_into(child_depth) {
                    continue;
                }

                match self.traversal.permits.try_acquire() {
                    Some(permit) => {
                        trace!(path = %child_path.display(), "Aggregating concurrently");
                        let task = Arc::clone(&self);
                        pending.spawn(async move {
                            let result = task.measure(child_path, child_depth).await;
                            drop(permit);
                            result
                        });
                    }
                    None => {
                        trace!(path = %child_path.display(), "Aggregating inline");
                        let result = Arc::clone(&self).measure(child_path, child_depth).await;
                        self.fold(&mut aggregate, result);
                    }
                }
            }

            while let Some(joined) = pending.join_next().await {
                match joined {
                    Ok(result) => self.fold(&mut aggregate, result),
                    Err(err) if err.is_cancelled() => {}
                    Err(err) => self.fold_failure(
                        &mut aggregate,
                        WalkError::Task {
                            message: err.to_string(),
                        },
                    ),
                }

                if aggregate.has_error() {
                    // Outstanding siblings no longer affect the result.
                    pending.abort_all();
                }
            }

            self.report(&aggregate).await;
            aggregate
        })
    }

    /// Fold a finished child into its parent.
    fn fold(&self, parent: &mut DirectoryAggregate, mut child: DirectoryAggregate) {
        parent.skipped.append(&mut child.skipped);

        match &child.error {
            Some(err) => self.fold_failure(parent, err.clone()),
            None => parent.merge(&child),
        }

        if self.traversal.options.options().keep_children {
            parent.children.push(child);
        }
    }

    fn fold_failure(&self, parent: &mut DirectoryAggregate, err: WalkError) {
        if matches!(err, WalkError::Cancelled) {
            parent.error.get_or_insert(err);
        } else if self.traversal.options.options().err_skip {
            warn!(parent = %parent.path.display(), error = %err, "Skipping subtree");
            parent.skipped.push(err);
        } else if parent.error.is_none() {
            parent.error = Some(err);
        }
    }

    /// Push a finished aggregate to the stream, if one was requested.
    async fn report(&self, aggregate: &DirectoryAggregate) {
        let Some(sink) = &self.sink else {
            return;
        };

        let wanted = aggregate.has_error()
            || aggregate.depth == 0
            || aggregate.metadata.is_some_and(|metadata| {
                metadata.is_dir
                    && self
                        .traversal
                        .options
                        .accepts(&self.traversal.key(&aggregate.path), &metadata)
            });

        if wanted {
            sink.push(aggregate.clone()).await;
        }
    }
}

impl TreeWalker {
    /// Compute size, file count and directory count for the tree at `root`.
    ///
    /// Runs concurrently internally but resolves only once the whole tree has
    /// been merged. Fails with `NotADirectory` if `root` is not a directory.
    pub async fn aggregate(
        &self,
        root: impl AsRef<Path>,
        options: &TraversalOptions,
    ) -> Result<DirectoryAggregate, WalkError> {
        let traversal = self.prepare(root.as_ref(), options)?;
        traversal.ensure_directory().await?;

        debug!(
            root = %traversal.root.display(),
            permits = traversal.permits.capacity(),
            "Starting aggregation"
        );

        let task = Arc::new(AggregateTask {
            traversal: Arc::clone(&traversal),
            sink: None,
        });
        let aggregate = task.measure(traversal.root.clone(), 0).await;
        traversal.progress.finish(&traversal.root);

        if traversal.is_cancelled() {
            return Err(WalkError::Cancelled);
        }

        debug!(
            root = %traversal.root.display(),
            size = aggregate.size,
            files = aggregate.file_count,
            dirs = aggregate.dir_count,
            "Aggregation finished"
        );
        Ok(aggregate)
    }

    /// Stream the aggregate of every directory under `root` as it completes.
    ///
    /// Children are reported before their parents; the root is always
    /// reported last.
    pub async fn list_aggregates(
        &self,
        root: impl AsRef<Path>,
        options: &TraversalOptions,
    ) -> Result<ResultStream<DirectoryAggregate>, WalkError> {
        let traversal = self.prepare(root.as_ref(), options)?;
        traversal.ensure_directory().await?;

        let (sink, stream) = result_channel(
            traversal.options.options().buffer_size,
            traversal.cancel.clone(),
        );
        let task = Arc::new(AggregateTask {
            traversal: Arc::clone(&traversal),
            sink: Some(sink),
        });

        tokio::spawn(async move {
            task.measure(traversal.root.clone(), 0).await;
            traversal.progress.finish(&traversal.root);
            debug!(root = %traversal.root.display(), "Aggregate stream finished");
        });

        Ok(stream)
    }
}
