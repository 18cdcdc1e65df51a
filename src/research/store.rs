//! In-memory task store.
//!
//! The store is the single owner of every [`Task`] and the only place task
//! state is mutated. Each task lives in its own slot guarded by its own
//! mutex, so writers to one task are serialized while writers to different
//! tasks never contend beyond a short read lock on the index. Readers get
//! cloned snapshots and never observe a half-applied mutation.
//!
//! State is process-lifetime only; nothing is persisted.

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::notify::{TaskNotifier, TaskSubscription};
use super::progress;
use super::task::{Task, TaskId};
use crate::types::{AppError, Result};

/// Default per-subscriber notification buffer.
pub const DEFAULT_NOTIFICATION_BUFFER: usize = 64;

struct SlotState {
    task: Task,
    /// Dropped once the task is terminal or deleted, which closes the channel
    notifier: Option<TaskNotifier>,
}

struct TaskSlot {
    /// Insertion order for listing
    seq: u64,
    /// Shared with every subscription; set on delete, under the state lock
    removed: Arc<AtomicBool>,
    state: Mutex<SlotState>,
}

impl TaskSlot {
    fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }
}

/// Concurrency-safe map from task id to task state.
pub struct TaskStore {
    tasks: RwLock<HashMap<TaskId, Arc<TaskSlot>>>,
    next_seq: AtomicU64,
    notification_buffer: usize,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_BUFFER)
    }
}

impl TaskStore {
    pub fn new(notification_buffer: usize) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            notification_buffer: notification_buffer.max(1),
        }
    }

    /// Allocate a new task in the planning stage and return its id.
    pub fn create(&self, query: impl Into<String>) -> TaskId {
        let id = TaskId::new();
        let mut task = Task::new(id.clone(), query);
        task.progress_percentage = progress::percentage(&task);

        let slot = Arc::new(TaskSlot {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            removed: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(SlotState {
                task,
                notifier: Some(TaskNotifier::new(self.notification_buffer)),
            }),
        });
        self.tasks.write().insert(id.clone(), slot);

        tracing::debug!(task_id = %id, "Task created");
        id
    }

    fn slot(&self, id: &TaskId) -> Result<Arc<TaskSlot>> {
        self.tasks
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::task_not_found(id))
    }

    /// Snapshot of a task.
    pub fn get(&self, id: &TaskId) -> Result<Task> {
        let slot = self.slot(id)?;
        let state = slot.state.lock();
        if slot.is_removed() {
            return Err(AppError::task_not_found(id));
        }
        Ok(state.task.clone())
    }

    /// Apply `f` to a task under exclusive access and commit the result.
    ///
    /// `f` works on a copy that replaces the stored task only once it
    /// returns. The store then refreshes `updated_at` and the progress
    /// percentage, and publishes the new snapshot to the task's
    /// subscribers. Mutating a deleted or unknown id is a `NotFound` no-op.
    pub fn mutate<F>(&self, id: &TaskId, f: F) -> Result<Task>
    where
        F: FnOnce(&mut Task),
    {
        let slot = self.slot(id)?;
        let mut state = slot.state.lock();
        if slot.is_removed() {
            return Err(AppError::task_not_found(id));
        }

        let mut next = state.task.clone();
        f(&mut next);
        next.updated_at = Utc::now();
        next.progress_percentage =
            progress::percentage(&next).max(state.task.progress_percentage);
        state.task = next.clone();

        if let Some(notifier) = state.notifier.as_ref() {
            notifier.publish(next.clone());
        }
        if next.is_terminal() {
            // No transition leaves a terminal stage, so nothing more will be published.
            state.notifier = None;
        }

        Ok(next)
    }

    /// Remove a task and release its notification channel.
    pub fn delete(&self, id: &TaskId) -> bool {
        let Some(slot) = self.tasks.write().remove(id) else {
            return false;
        };

        let mut state = slot.state.lock();
        slot.removed.store(true, Ordering::Release);
        state.notifier = None;
        tracing::debug!(task_id = %id, "Task deleted");
        true
    }

    /// Snapshots of every task, in creation order.
    pub fn list(&self) -> Vec<Task> {
        let mut slots: Vec<Arc<TaskSlot>> = self.tasks.read().values().cloned().collect();
        slots.sort_by_key(|slot| slot.seq);
        slots
            .iter()
            .filter_map(|slot| {
                let state = slot.state.lock();
                (!slot.is_removed()).then(|| state.task.clone())
            })
            .collect()
    }

    /// Subscribe to a task's change stream, starting from its current snapshot.
    pub fn subscribe(&self, id: &TaskId) -> Result<TaskSubscription> {
        let slot = self.slot(id)?;
        let state = slot.state.lock();
        if slot.is_removed() {
            return Err(AppError::task_not_found(id));
        }
        let current = state.task.clone();
        let removed = Arc::clone(&slot.removed);
        Ok(match state.notifier.as_ref() {
            Some(notifier) => notifier.subscribe(current, removed),
            None => TaskSubscription::finished(current, removed),
        })
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}
