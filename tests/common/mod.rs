#![allow(dead_code)]

pub mod mocks;

use futures::StreamExt;
use scholarsynth::research::{ResearchCoordinator, ResearchStages, Task, TaskId, TaskStore};
use scholarsynth::utils::toml_config::ResearchConfig;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on how long any test waits for a workflow.
pub const WAIT: Duration = Duration::from_secs(10);

pub fn coordinator(stages: Arc<dyn ResearchStages>) -> ResearchCoordinator {
    coordinator_with(stages, ResearchConfig::default())
}

pub fn coordinator_with(stages: Arc<dyn ResearchStages>, config: ResearchConfig) -> ResearchCoordinator {
    let store = Arc::new(TaskStore::new(config.notification_buffer));
    ResearchCoordinator::new(store, stages, &config)
}

/// Every snapshot a fresh subscriber observes, up to the terminal one.
pub async fn collect_snapshots(coordinator: &ResearchCoordinator, id: &TaskId) -> Vec<Task> {
    let stream = coordinator
        .subscribe(id)
        .expect("task should exist")
        .into_stream();
    tokio::time::timeout(WAIT, stream.collect::<Vec<_>>())
        .await
        .expect("workflow did not finish in time")
}

/// Wait for the task to become terminal and return its final snapshot.
pub async fn wait_terminal(coordinator: &ResearchCoordinator, id: &TaskId) -> Task {
    collect_snapshots(coordinator, id)
        .await
        .pop()
        .expect("subscription yields at least one snapshot")
}
