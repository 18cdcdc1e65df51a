//! Stage operations the coordinator drives.
//!
//! Planning, researching one sub-question and publishing are opaque async
//! collaborators behind [`ResearchStages`]. Every call receives the task's
//! cancellation token; an implementation should stop early and return
//! [`StageError::Cancelled`] once it fires.

use async_trait::async_trait;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

use super::task::{Citation, Report, ResearchFindings, ResearchResult};

/// Failures of the pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    #[error("Planning failed: {0}")]
    Planning(String),

    /// Per sub-question; recorded on the sub-question and never fatal on its own
    #[error("Research failed: {0}")]
    Research(String),

    #[error("all research tasks failed")]
    AllResearchFailed,

    #[error("Publishing failed: {0}")]
    Publishing(String),

    #[error("cancelled")]
    Cancelled,
}

/// The three external operations of the research pipeline.
#[async_trait]
pub trait ResearchStages: Send + Sync {
    /// Decompose a query into ordered sub-questions.
    async fn plan(&self, query: &str, cancel: &CancellationToken) -> Result<Vec<String>, StageError>;

    /// Research one sub-question. `index` is its position in the plan.
    async fn research(
        &self,
        question: &str,
        index: usize,
        cancel: &CancellationToken,
    ) -> Result<ResearchFindings, StageError>;

    /// Synthesize the completed results, in planned order, into a report.
    async fn publish(
        &self,
        query: &str,
        results: &[ResearchResult],
        cancel: &CancellationToken,
    ) -> Result<Report, StageError>;
}

/// Union of all result sources, by first appearance in planned order,
/// deduplicated by URL. Sources without a URL are deduplicated by id.
pub fn collect_citations(results: &[ResearchResult]) -> Vec<Citation> {
    let mut seen = HashSet::new();
    results
        .iter()
        .flat_map(|result| result.sources.iter())
        .filter(|citation| {
            let key = if citation.url.trim().is_empty() {
                format!("id:{}", citation.id)
            } else {
                format!("url:{}", citation.url.trim())
            };
            seen.insert(key)
        })
        .cloned()
        .collect()
}
