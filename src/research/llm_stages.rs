//! [`ResearchStages`] backed by an [`LLMClient`].
//!
//! The planner and researcher answer with JSON (optionally fenced in a
//! markdown code block); the publisher answers with a markdown report.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::prompts;
use super::stages::{collect_citations, ResearchStages, StageError};
use super::task::{Citation, Report, ResearchFindings, ResearchResult};
use crate::llm::LLMClient;
use crate::types::Result as AppResult;
use crate::utils::toml_config::ResearchConfig;

const UNKNOWN_TITLE: &str = "Unknown Title";

#[derive(Debug, Deserialize)]
struct PlanResponse {
    sub_questions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ResearchResponse {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    facts: Vec<String>,
    #[serde(default)]
    sources: Vec<SourceEntry>,
}

#[derive(Debug, Deserialize)]
struct SourceEntry {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    authors: Option<Authors>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

/// Models return authors either as one string or as a list of names.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Authors {
    One(String),
    Many(Vec<String>),
}

impl Authors {
    fn joined(self) -> Option<String> {
        let joined = match self {
            Authors::One(name) => name,
            Authors::Many(names) => names.join(", "),
        };
        non_blank(joined)
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Stage operations that prompt an LLM for each step
pub struct LlmStages {
    client: Arc<dyn LLMClient>,
    max_sub_questions: usize,
    sources_per_question: usize,
}

impl LlmStages {
    pub fn new(client: Arc<dyn LLMClient>, config: &ResearchConfig) -> Self {
        Self {
            client,
            max_sub_questions: config.max_sub_questions.max(1),
            sources_per_question: config.sources_per_question.max(1),
        }
    }

    /// Await an LLM call, abandoning it as soon as the task is cancelled
    async fn call<F>(
        cancel: &CancellationToken,
        fut: F,
        on_error: fn(String) -> StageError,
    ) -> Result<String, StageError>
    where
        F: Future<Output = AppResult<String>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StageError::Cancelled),
            result = fut => result.map_err(|e| on_error(e.to_string())),
        }
    }

    fn citation_id(&self, index: usize, position: usize) -> String {
        format!("S{}", index * self.sources_per_question + position + 1)
    }

    fn parse_plan(&self, raw: &str) -> Result<Vec<String>, StageError> {
        let json = extract_json(raw);
        let parsed: PlanResponse = serde_json::from_str(json)
            .map_err(|e| StageError::Planning(format!("invalid planner response: {}", e)))?;

        let questions: Vec<String> = parsed
            .sub_questions
            .into_iter()
            .filter_map(non_blank)
            .take(self.max_sub_questions)
            .collect();

        if questions.is_empty() {
            return Err(StageError::Planning(
                "planner returned no sub-questions".to_string(),
            ));
        }
        Ok(questions)
    }

    fn parse_findings(&self, raw: &str, index: usize) -> Result<ResearchFindings, StageError> {
        let json = extract_json(raw);
        let parsed: ResearchResponse = serde_json::from_str(json)
            .map_err(|e| StageError::Research(format!("invalid researcher response: {}", e)))?;

        let summary = non_blank(parsed.summary)
            .or_else(|| non_blank(parsed.facts.join(" ")))
            .ok_or_else(|| StageError::Research("researcher returned an empty summary".to_string()))?;

        let sources = parsed
            .sources
            .into_iter()
            .take(self.sources_per_question)
            .enumerate()
            .map(|(position, source)| Citation {
                id: self.citation_id(index, position),
                title: source
                    .title
                    .and_then(non_blank)
                    .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
                url: source.url.unwrap_or_default().trim().to_string(),
                authors: source.authors.and_then(Authors::joined),
                date: source.date.and_then(non_blank),
                snippet: source.snippet.unwrap_or_default().trim().to_string(),
            })
            .collect();

        Ok(ResearchFindings { summary, sources })
    }
}

#[async_trait]
impl ResearchStages for LlmStages {
    async fn plan(&self, query: &str, cancel: &CancellationToken) -> Result<Vec<String>, StageError> {
        let prompt = prompts::planner_prompt(query, self.max_sub_questions);
        let raw = Self::call(
            cancel,
            self.client.generate_with_system(prompts::PLANNER_SYSTEM, &prompt),
            StageError::Planning,
        )
        .await?;

        let questions = self.parse_plan(&raw)?;
        tracing::debug!(count = questions.len(), "Planner produced sub-questions");
        Ok(questions)
    }

    async fn research(
        &self,
        question: &str,
        index: usize,
        cancel: &CancellationToken,
    ) -> Result<ResearchFindings, StageError> {
        let prompt = prompts::researcher_prompt(question, self.sources_per_question);
        let raw = Self::call(
            cancel,
            self.client.generate_with_system(prompts::RESEARCHER_SYSTEM, &prompt),
            StageError::Research,
        )
        .await?;

        self.parse_findings(&raw, index)
    }

    async fn publish(
        &self,
        query: &str,
        results: &[ResearchResult],
        cancel: &CancellationToken,
    ) -> Result<Report, StageError> {
        let prompt = prompts::publisher_prompt(query, results);
        let raw = Self::call(
            cancel,
            self.client.generate_with_system(prompts::PUBLISHER_SYSTEM, &prompt),
            StageError::Publishing,
        )
        .await?;

        let content = raw.trim();
        if content.is_empty() {
            return Err(StageError::Publishing("publisher returned an empty report".to_string()));
        }

        Ok(Report {
            title: report_title(content).unwrap_or_else(|| query.to_string()),
            content: content.to_string(),
            word_count: content.split_whitespace().count(),
            citations: collect_citations(results),
            generated_at: Utc::now(),
        })
    }
}

/// Strip an optional ```json fence; otherwise take the outermost `{...}` span.
pub fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

fn report_title(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string)
}
