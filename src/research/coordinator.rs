use crate::{
    research::{
        notify::TaskSubscription,
        progress::{self, TaskProgress},
        stages::{collect_citations, ResearchStages, StageError},
        store::TaskStore,
        task::{Task, TaskId},
    },
    types::{AppError, Result},
    utils::toml_config::ResearchConfig,
};
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Why a workflow stopped before reaching `done`.
enum Halt {
    /// Fatal stage error; the task is marked failed with its message.
    Failed(StageError),
    /// The task was deleted while running; there is nothing left to update.
    Removed,
}

impl From<StageError> for Halt {
    fn from(error: StageError) -> Self {
        match error {
            StageError::Cancelled => Halt::Removed,
            other => Halt::Failed(other),
        }
    }
}

/// Drives research tasks through planning, parallel execution and publishing.
///
/// The coordinator never holds a task itself: it reads snapshots from the
/// [`TaskStore`] and submits every change as a scoped mutation. Reads
/// (status, snapshots, subscriptions, listing) go straight to the store.
#[derive(Clone)]
pub struct ResearchCoordinator {
    store: Arc<TaskStore>,
    stages: Arc<dyn ResearchStages>,
    max_concurrent_research: usize,
    in_flight: Arc<Mutex<HashMap<TaskId, CancellationToken>>>,
}

impl ResearchCoordinator {
    pub fn new(store: Arc<TaskStore>, stages: Arc<dyn ResearchStages>, config: &ResearchConfig) -> Self {
        Self {
            store,
            stages,
            max_concurrent_research: config.max_concurrent_research.max(1),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    /// Allocate a task and start its workflow in the background.
    ///
    /// Returns as soon as the task exists; must be called from within a
    /// Tokio runtime.
    pub fn create(&self, query: &str) -> Result<TaskId> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput("Query must not be empty".to_string()));
        }

        let id = self.store.create(query);
        let cancel = CancellationToken::new();
        self.in_flight.lock().insert(id.clone(), cancel.clone());

        let coordinator = self.clone();
        let task_id = id.clone();
        let query = query.to_string();
        tokio::spawn(async move {
            coordinator.drive(task_id, query, cancel).await;
        });

        Ok(id)
    }

    /// Status projection of a task.
    pub fn status(&self, id: &TaskId) -> Result<TaskProgress> {
        self.store.get(id).map(|task| progress::project(&task))
    }

    /// Full task snapshot.
    pub fn task(&self, id: &TaskId) -> Result<Task> {
        self.store.get(id)
    }

    pub fn subscribe(&self, id: &TaskId) -> Result<TaskSubscription> {
        self.store.subscribe(id)
    }

    pub fn list(&self) -> Vec<Task> {
        self.store.list()
    }

    /// Delete a task, cancelling any stage operation still running for it.
    pub fn delete(&self, id: &TaskId) -> bool {
        if let Some(cancel) = self.in_flight.lock().remove(id) {
            cancel.cancel();
        }
        let deleted = self.store.delete(id);
        if deleted {
            tracing::info!(task_id = %id, "Research task deleted");
        }
        deleted
    }

    /// Number of workflows that have not reached a terminal stage yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Cancel every running workflow. Used on shutdown.
    pub fn cancel_all(&self) {
        for (_, cancel) in self.in_flight.lock().drain() {
            cancel.cancel();
        }
    }

    async fn drive(self, id: TaskId, query: String, cancel: CancellationToken) {
        let started = Instant::now();
        tracing::info!(task_id = %id, query = %query, "Starting research workflow");

        match self.execute(&id, &query, &cancel).await {
            Ok(task) => {
                tracing::info!(
                    task_id = %id,
                    sub_questions = task.sub_questions.len(),
                    completed = task.completed_count(),
                    citations = task.report.as_ref().map_or(0, |r| r.citations.len()),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Research workflow complete"
                );
            }
            Err(Halt::Failed(error)) => {
                tracing::warn!(task_id = %id, error = %error, "Research workflow failed");
                let message = error.to_string();
                if self
                    .store
                    .mutate(&id, |task| {
                        task.fail(message);
                    })
                    .is_err()
                {
                    tracing::debug!(task_id = %id, "Task removed before failure could be recorded");
                }
            }
            Err(Halt::Removed) => {
                tracing::debug!(task_id = %id, "Task removed, workflow stopped");
            }
        }

        self.in_flight.lock().remove(&id);
    }

    async fn execute(&self, id: &TaskId, query: &str, cancel: &CancellationToken) -> std::result::Result<Task, Halt> {
        // Planning
        let questions: Vec<String> = self
            .stages
            .plan(query, cancel)
            .await?
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();
        if questions.is_empty() {
            return Err(Halt::Failed(StageError::Planning(
                "planner returned no sub-questions".to_string(),
            )));
        }
        tracing::info!(task_id = %id, count = questions.len(), "Planning complete");

        let planned = questions.clone();
        self.apply(id, move |task| {
            task.begin_execution(planned);
        })?;

        // Executing
        self.research_all(id, &questions, cancel).await?;

        let results = self.store.get(id).map_err(|_| Halt::Removed)?.completed_results();
        if results.is_empty() {
            return Err(Halt::Failed(StageError::AllResearchFailed));
        }
        tracing::info!(
            task_id = %id,
            completed = results.len(),
            total = questions.len(),
            "Research complete, publishing"
        );
        self.apply(id, |task| {
            task.begin_publishing();
        })?;

        // Publishing
        let mut report = self.stages.publish(query, &results, cancel).await?;
        report.citations = collect_citations(&results);
        self.apply(id, move |task| {
            task.complete(report);
        })
    }

    /// One worker per sub-question, at most `max_concurrent_research` at a time.
    /// Returns once every worker has finished, whatever its outcome.
    async fn research_all(
        &self,
        id: &TaskId,
        questions: &[String],
        cancel: &CancellationToken,
    ) -> std::result::Result<(), Halt> {
        let permits = Arc::new(Semaphore::new(self.max_concurrent_research));
        let mut workers = JoinSet::new();

        for (index, question) in questions.iter().cloned().enumerate() {
            let store = Arc::clone(&self.store);
            let stages = Arc::clone(&self.stages);
            let permits = Arc::clone(&permits);
            let cancel = cancel.clone();
            let id = id.clone();

            workers.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                research_one(&store, stages.as_ref(), &id, index, &question, &cancel).await;
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(task_id = %id, error = %e, "Research worker aborted");
            }
        }

        if cancel.is_cancelled() {
            return Err(Halt::Removed);
        }
        Ok(())
    }

    fn apply<F>(&self, id: &TaskId, f: F) -> std::result::Result<Task, Halt>
    where
        F: FnOnce(&mut Task),
    {
        self.store.mutate(id, f).map_err(|_| Halt::Removed)
    }
}

/// Research a single sub-question and record the outcome on it.
/// A failure stays local to the sub-question.
async fn research_one(
    store: &TaskStore,
    stages: &dyn ResearchStages,
    id: &TaskId,
    index: usize,
    question: &str,
    cancel: &CancellationToken,
) {
    if cancel.is_cancelled() {
        return;
    }
    if store
        .mutate(id, |task| {
            task.start_sub_question(index);
        })
        .is_err()
    {
        return;
    }

    let outcome = AssertUnwindSafe(stages.research(question, index, cancel))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(StageError::Research("research worker panicked".to_string())));

    let committed = match outcome {
        Ok(findings) => {
            tracing::info!(
                task_id = %id,
                index,
                sources = findings.sources.len(),
                "Sub-question researched"
            );
            store.mutate(id, move |task| {
                task.complete_sub_question(index, findings);
            })
        }
        Err(StageError::Cancelled) => return,
        Err(error) => {
            tracing::warn!(task_id = %id, index, error = %error, "Sub-question failed");
            let reason = error.to_string();
            store.mutate(id, move |task| {
                task.fail_sub_question(index, reason);
            })
        }
    };

    if committed.is_err() {
        tracing::debug!(task_id = %id, index, "Task removed while researching");
    }
}
