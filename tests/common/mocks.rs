//! Mock implementations for testing.
//!
//! This module provides scriptable stage operations and LLM clients that can
//! be used across different test files without duplication.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use scholarsynth::llm::LLMClient;
use scholarsynth::research::{Citation, Report, ResearchFindings, ResearchResult, ResearchStages, StageError};
use scholarsynth::types::{AppError, Result};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// URL every successful sub-question cites, to exercise deduplication.
pub const SHARED_SOURCE_URL: &str = "https://example.org/shared";

/// Source URL unique to the sub-question at `index`.
pub fn source_url(index: usize) -> String {
    format!("https://example.org/source-{}", index)
}

/// Scriptable [`ResearchStages`] implementation.
///
/// # Examples
///
/// ```ignore
/// // Three sub-questions, the second one fails
/// let stages = MockStages::new(&["a", "b", "c"]).failing_research(&[1]);
///
/// // Planner itself fails
/// let stages = MockStages::new(&[]).failing_plan("model unreachable");
/// ```
#[derive(Default)]
pub struct MockStages {
    questions: Vec<String>,
    plan_error: Option<String>,
    failing: HashSet<usize>,
    panicking: HashSet<usize>,
    research_delay: Duration,
    block_research: bool,
    publish_error: Option<String>,

    pub plan_calls: AtomicUsize,
    pub research_calls: AtomicUsize,
    pub publish_calls: AtomicUsize,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub published_with: Mutex<Option<Vec<ResearchResult>>>,
}

impl MockStages {
    /// Planner that returns the given sub-questions; every step succeeds.
    pub fn new(questions: &[&str]) -> Self {
        Self {
            questions: questions.iter().map(|q| q.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing_plan(mut self, reason: &str) -> Self {
        self.plan_error = Some(reason.to_string());
        self
    }

    pub fn failing_research(mut self, indices: &[usize]) -> Self {
        self.failing.extend(indices.iter().copied());
        self
    }

    pub fn panicking_research(mut self, indices: &[usize]) -> Self {
        self.panicking.extend(indices.iter().copied());
        self
    }

    pub fn with_research_delay(mut self, delay: Duration) -> Self {
        self.research_delay = delay;
        self
    }

    /// Research never finishes on its own; it only returns once cancelled.
    pub fn blocking_research(mut self) -> Self {
        self.block_research = true;
        self
    }

    pub fn failing_publish(mut self, reason: &str) -> Self {
        self.publish_error = Some(reason.to_string());
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn publish_count(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }

    fn findings(index: usize, question: &str) -> ResearchFindings {
        ResearchFindings {
            summary: format!("Findings for {}", question),
            sources: vec![
                Citation {
                    id: format!("S{}", index * 2 + 1),
                    title: format!("Source for {}", question),
                    url: source_url(index),
                    authors: Some("A. Researcher".to_string()),
                    date: None,
                    snippet: "relevant excerpt".to_string(),
                },
                Citation {
                    id: format!("S{}", index * 2 + 2),
                    title: "Shared survey".to_string(),
                    url: SHARED_SOURCE_URL.to_string(),
                    authors: None,
                    date: None,
                    snippet: String::new(),
                },
            ],
        }
    }
}

#[async_trait]
impl ResearchStages for MockStages {
    async fn plan(&self, _query: &str, _cancel: &CancellationToken) -> std::result::Result<Vec<String>, StageError> {
        self.plan_calls.fetch_add(1, Ordering::SeqCst);
        match &self.plan_error {
            Some(reason) => Err(StageError::Planning(reason.clone())),
            None => Ok(self.questions.clone()),
        }
    }

    async fn research(
        &self,
        question: &str,
        index: usize,
        cancel: &CancellationToken,
    ) -> std::result::Result<ResearchFindings, StageError> {
        self.research_calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        let outcome = async {
            if self.block_research {
                cancel.cancelled().await;
                return Err(StageError::Cancelled);
            }
            if !self.research_delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(StageError::Cancelled),
                    _ = tokio::time::sleep(self.research_delay) => {}
                }
            }
            if self.panicking.contains(&index) {
                panic!("mock research panic for sub-question {}", index);
            }
            if self.failing.contains(&index) {
                return Err(StageError::Research(format!("no sources for '{}'", question)));
            }
            Ok(Self::findings(index, question))
        }
        .await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    async fn publish(
        &self,
        query: &str,
        results: &[ResearchResult],
        _cancel: &CancellationToken,
    ) -> std::result::Result<Report, StageError> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        *self.published_with.lock() = Some(results.to_vec());

        if let Some(reason) = &self.publish_error {
            return Err(StageError::Publishing(reason.clone()));
        }

        let content = results
            .iter()
            .map(|r| r.summary.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(Report {
            title: query.to_string(),
            word_count: content.split_whitespace().count(),
            content,
            citations: Vec::new(),
            generated_at: Utc::now(),
        })
    }
}

/// Mock LLM client that routes on the system prompt.
///
/// Planner, researcher and publisher prompts each get their own canned reply.
#[derive(Clone)]
pub struct MockLLMClient {
    plan_reply: String,
    research_reply: String,
    publish_reply: String,
    should_fail: bool,
}

impl MockLLMClient {
    pub fn new(plan_reply: &str, research_reply: &str, publish_reply: &str) -> Self {
        Self {
            plan_reply: plan_reply.to_string(),
            research_reply: research_reply.to_string(),
            publish_reply: publish_reply.to_string(),
            should_fail: false,
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            plan_reply: String::new(),
            research_reply: String::new(),
            publish_reply: String::new(),
            should_fail: true,
        }
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_system("", prompt).await
    }

    async fn generate_with_system(&self, system: &str, _prompt: &str) -> Result<String> {
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }
        let reply = if system.contains("planning") {
            &self.plan_reply
        } else if system.contains("research agent") {
            &self.research_reply
        } else {
            &self.publish_reply
        };
        Ok(reply.clone())
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
