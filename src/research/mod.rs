//! Multi-Stage Research Orchestration
//!
//! This module turns a natural-language research query into a long-form
//! cited report by decomposing it into sub-questions, researching each one
//! independently and synthesizing the results.
//!
//! # Architecture
//!
//! - [`store::TaskStore`] - Owns every task; the only mutation gate
//! - [`coordinator::ResearchCoordinator`] - Drives one task per spawned workflow
//! - [`progress`] - Derives the status view shared by polling and streaming
//! - [`notify`] - Per-task broadcast of snapshots to streaming subscribers
//! - [`stages::ResearchStages`] - Plan / research / publish collaborators
//! - [`llm_stages::LlmStages`] - Stage implementation backed by an LLM client
//!
//! # Usage
//!
//! ```ignore
//! use scholarsynth::research::{ResearchCoordinator, TaskStore};
//!
//! let store = Arc::new(TaskStore::new(config.research.notification_buffer));
//! let coordinator = ResearchCoordinator::new(store, stages, &config.research);
//!
//! let id = coordinator.create("What are the latest developments in quantum computing?")?;
//! let mut updates = coordinator.subscribe(&id)?.into_stream();
//! while let Some(task) = updates.next().await {
//!     println!("{}% {}", task.progress_percentage, task.current_step);
//! }
//! ```
//!
//! # Research Workflow
//!
//! 1. **Planning** - Break the query into sub-questions
//! 2. **Executing** - Research every sub-question concurrently; individual failures are tolerated
//! 3. **Publishing** - Synthesize completed findings into a report with deduplicated citations

/// Task coordination: planning, parallel research and publishing.
pub mod coordinator;
/// Stage operations implemented on top of an LLM client.
pub mod llm_stages;
/// Per-task snapshot broadcasting.
pub mod notify;
/// Status projection and percentage policy.
pub mod progress;
/// Prompt templates for the LLM-backed stages.
pub mod prompts;
/// Stage operation contract and stage errors.
pub mod stages;
/// In-memory task store.
pub mod store;
/// Task data model and state transitions.
pub mod task;

pub use coordinator::ResearchCoordinator;
pub use llm_stages::LlmStages;
pub use progress::TaskProgress;
pub use stages::{ResearchStages, StageError};
pub use store::TaskStore;
pub use task::{Citation, Report, ResearchFindings, ResearchResult, Stage, SubQuestionState, SubQuestionStatus, Task, TaskId};
