//! Bounded result channel between traversal tasks and the consumer.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Create a bounded result channel.
///
/// Dropping the returned stream cancels `cancel`, which stops every producer
/// at its next stat/list call.
pub fn result_channel<T>(
    capacity: usize,
    cancel: CancellationToken,
) -> (ResultSink<T>, ResultStream<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let stream = ResultStream {
        rx,
        _guard: cancel.clone().drop_guard(),
        cancel,
    };
    (ResultSink { tx }, stream)
}

/// Producer half. Cloned into every task that emits results; the stream
/// closes once the last clone is dropped.
pub struct ResultSink<T> {
    tx: mpsc::Sender<T>,
}

impl<T> ResultSink<T> {
    /// Push an item, waiting while the buffer is full.
    ///
    /// Returns `false` once the consumer has gone away.
    pub async fn push(&self, item: T) -> bool {
        self.tx.send(item).await.is_ok()
    }

    /// Whether the consumer has dropped its stream.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> Clone for ResultSink<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> fmt::Debug for ResultSink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSink")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Consumer half: yields results until every producer has finished.
///
/// The stream must be drained (or dropped) for the traversal to finish;
/// producers block while the buffer is full.
pub struct ResultStream<T> {
    rx: mpsc::Receiver<T>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl<T> ResultStream<T> {
    /// Receive the next result, `None` once the traversal has completed.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Collect every remaining result.
    pub async fn drain(mut self) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(item) = self.rx.recv().await {
            items.push(item);
        }
        items
    }

    /// Stop the traversal feeding this stream.
    ///
    /// Items already buffered can still be received.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the traversal has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl<T> Stream for ResultStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

impl<T> fmt::Debug for ResultStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultStream")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
