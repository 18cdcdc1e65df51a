//! Per-task change notifications.
//!
//! Each task owns one [`TaskNotifier`], a bounded `tokio::sync::broadcast`
//! channel of task snapshots. Publishing never blocks: a subscriber that
//! falls more than `capacity` snapshots behind loses the oldest ones and
//! resumes from the oldest retained snapshot. Every subscriber reads through
//! its own receiver, so multiple observers of one task are independent.
//!
//! Deletion is signalled through a flag owned by the task's store slot, not
//! by the channel, so it reaches subscriptions that outlive the notifier.

use futures::stream::{BoxStream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use super::task::Task;

/// Sending half of a task's notification channel.
#[derive(Debug)]
pub struct TaskNotifier {
    tx: broadcast::Sender<Task>,
}

impl TaskNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Best-effort fan-out of a snapshot to every live subscriber.
    pub fn publish(&self, snapshot: Task) {
        // Err only means nobody is listening right now.
        let _ = self.tx.send(snapshot);
    }

    /// Open a subscription whose first item is `current`.
    ///
    /// Callers must hold the task's lock while taking `current` so that no
    /// snapshot published afterwards is older than it. Once `removed` is set
    /// the subscription ends without emitting anything it has buffered.
    pub fn subscribe(&self, current: Task, removed: Arc<AtomicBool>) -> TaskSubscription {
        TaskSubscription {
            initial: current,
            rx: Some(self.tx.subscribe()),
            removed,
        }
    }
}

/// Receiving side handed to one observer of a task.
#[derive(Debug)]
pub struct TaskSubscription {
    initial: Task,
    rx: Option<broadcast::Receiver<Task>>,
    removed: Arc<AtomicBool>,
}

impl TaskSubscription {
    /// Subscription over a task that will not change anymore.
    pub fn finished(snapshot: Task, removed: Arc<AtomicBool>) -> Self {
        Self {
            initial: snapshot,
            rx: None,
            removed,
        }
    }

    /// Lazy sequence of snapshots: the initial one, then every published
    /// change, ending after a terminal snapshot, on deletion, or when the
    /// channel closes.
    pub fn into_stream(self) -> BoxStream<'static, Task> {
        let TaskSubscription {
            initial,
            rx,
            removed,
        } = self;

        let stream = async_stream::stream! {
            if removed.load(Ordering::Acquire) {
                return;
            }
            let finished = initial.is_terminal();
            let task_id = initial.id.clone();
            yield initial;
            if finished {
                return;
            }
            let Some(mut rx) = rx else {
                return;
            };

            loop {
                match rx.recv().await {
                    Ok(snapshot) => {
                        if removed.load(Ordering::Acquire) {
                            break;
                        }
                        let finished = snapshot.is_terminal();
                        yield snapshot;
                        if finished {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(task_id = %task_id, skipped, "Task subscriber lagged, dropped oldest snapshots");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        };

        stream.boxed()
    }
}
