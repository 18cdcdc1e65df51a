//! Research task data model.
//!
//! A [`Task`] is the lifecycle record of one research request. All of its
//! state changes go through the guarded transition methods below, which the
//! coordinator applies inside a [`TaskStore`](super::store::TaskStore)
//! mutation. A transition that is not legal from the current state is
//! rejected (returns `false`) and leaves the task untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Longest question prefix shown in `current_step`.
const STEP_QUESTION_CHARS: usize = 60;

/// Opaque task identifier, assigned once at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Allocate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Pipeline phase of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Planning,
    Executing,
    Publishing,
    Done,
    Failed,
}

impl Stage {
    /// `done` and `failed` are never left once entered.
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Planning => "planning",
            Stage::Executing => "executing",
            Stage::Publishing => "publishing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Research lifecycle of one planned sub-question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubQuestionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl SubQuestionStatus {
    /// Completed and failed questions both count as resolved for the progress ramp.
    pub fn is_resolved(self) -> bool {
        matches!(self, SubQuestionStatus::Completed | SubQuestionStatus::Failed)
    }
}

/// A structured reference to a source backing part of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Citation {
    /// Local reference token used inline in the report, e.g. `S1`
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub snippet: String,
}

/// What researching a single sub-question produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResearchFindings {
    pub summary: String,
    pub sources: Vec<Citation>,
}

/// A completed sub-question as handed to the publishing stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResearchResult {
    pub question: String,
    pub summary: String,
    pub sources: Vec<Citation>,
}

/// The synthesized long-form report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Report {
    pub title: String,
    /// Markdown body, may embed citation tokens such as `[S1]`
    pub content: String,
    pub word_count: usize,
    pub citations: Vec<Citation>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubQuestionState {
    pub question: String,
    pub status: SubQuestionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub sources: Vec<Citation>,
    /// Research failure reason, set only when `status` is failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubQuestionState {
    fn pending(question: String) -> Self {
        Self {
            question,
            status: SubQuestionStatus::Pending,
            summary: None,
            sources: Vec::new(),
            error: None,
        }
    }
}

/// One research request's lifecycle record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Task {
    #[serde(rename = "task_id")]
    pub id: TaskId,
    pub query: String,
    #[serde(rename = "status")]
    pub stage: Stage,
    pub sub_questions: Vec<SubQuestionState>,
    pub report: Option<Report>,
    pub error: Option<String>,
    pub current_step: String,
    /// Maintained by the task store from the progress projection
    pub progress_percentage: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: TaskId, query: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            query: query.into(),
            stage: Stage::Planning,
            sub_questions: Vec::new(),
            report: None,
            error: None,
            current_step: "Planning research questions...".to_string(),
            progress_percentage: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    pub fn completed_count(&self) -> usize {
        self.sub_questions
            .iter()
            .filter(|q| q.status == SubQuestionStatus::Completed)
            .count()
    }

    pub fn resolved_count(&self) -> usize {
        self.sub_questions
            .iter()
            .filter(|q| q.status.is_resolved())
            .count()
    }

    /// Completed sub-questions in planned order.
    pub fn completed_results(&self) -> Vec<ResearchResult> {
        self.sub_questions
            .iter()
            .filter(|q| q.status == SubQuestionStatus::Completed)
            .map(|q| ResearchResult {
                question: q.question.clone(),
                summary: q.summary.clone().unwrap_or_default(),
                sources: q.sources.clone(),
            })
            .collect()
    }

    /// planning -> executing, fixing the sub-question list for the rest of the task's life.
    pub fn begin_execution(&mut self, questions: Vec<String>) -> bool {
        if self.stage != Stage::Planning || !self.sub_questions.is_empty() || questions.is_empty() {
            return false;
        }
        self.sub_questions = questions.into_iter().map(SubQuestionState::pending).collect();
        self.stage = Stage::Executing;
        self.current_step = format!("Executing {} research tasks", self.sub_questions.len());
        true
    }

    pub fn start_sub_question(&mut self, index: usize) -> bool {
        if self.stage != Stage::Executing {
            return false;
        }
        let Some(sub) = self.sub_questions.get_mut(index) else {
            return false;
        };
        if sub.status != SubQuestionStatus::Pending {
            return false;
        }
        sub.status = SubQuestionStatus::Processing;
        let preview: String = sub.question.chars().take(STEP_QUESTION_CHARS).collect();
        self.current_step = format!(
            "Researching {}/{}: {}",
            index + 1,
            self.sub_questions.len(),
            preview
        );
        true
    }

    pub fn complete_sub_question(&mut self, index: usize, findings: ResearchFindings) -> bool {
        if !self.resolve_sub_question(index) {
            return false;
        }
        let sub = &mut self.sub_questions[index];
        sub.status = SubQuestionStatus::Completed;
        sub.summary = Some(findings.summary);
        sub.sources = findings.sources;
        self.refresh_execution_step();
        true
    }

    pub fn fail_sub_question(&mut self, index: usize, reason: impl Into<String>) -> bool {
        if !self.resolve_sub_question(index) {
            return false;
        }
        let sub = &mut self.sub_questions[index];
        sub.status = SubQuestionStatus::Failed;
        sub.error = Some(reason.into());
        self.refresh_execution_step();
        true
    }

    fn resolve_sub_question(&self, index: usize) -> bool {
        self.stage == Stage::Executing
            && self
                .sub_questions
                .get(index)
                .is_some_and(|q| q.status == SubQuestionStatus::Processing)
    }

    fn refresh_execution_step(&mut self) {
        self.current_step = format!(
            "{}/{} research tasks resolved",
            self.resolved_count(),
            self.sub_questions.len()
        );
    }

    /// executing -> publishing, once every worker has finished.
    pub fn begin_publishing(&mut self) -> bool {
        if self.stage != Stage::Executing {
            return false;
        }
        self.stage = Stage::Publishing;
        self.current_step = format!(
            "Synthesizing report from {} of {} research results",
            self.completed_count(),
            self.sub_questions.len()
        );
        true
    }

    /// publishing -> done.
    pub fn complete(&mut self, report: Report) -> bool {
        if self.stage != Stage::Publishing {
            return false;
        }
        self.report = Some(report);
        self.stage = Stage::Done;
        self.current_step = "Report complete".to_string();
        true
    }

    /// Any non-terminal stage -> failed. Sub-question results stay readable.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.current_step = match self.stage {
            Stage::Planning => "Planning failed",
            Stage::Executing => "Research failed",
            _ => "Publishing failed",
        }
        .to_string();
        self.stage = Stage::Failed;
        self.error = Some(error.into());
        true
    }
}
