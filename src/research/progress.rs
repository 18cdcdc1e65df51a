//! Progress projection.
//!
//! Both the polling endpoint and the streaming feed derive their view of a
//! task from [`project`], applied to a task-store snapshot. The store also
//! uses [`percentage`] to maintain `Task::progress_percentage` after every
//! mutation, which is what freezes the value when a task fails.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::task::{Stage, Task};

pub const PLANNING_PERCENT: u8 = 10;
pub const EXECUTING_START_PERCENT: u8 = 20;
pub const EXECUTING_SPAN_PERCENT: u8 = 60;
pub const PUBLISHING_PERCENT: u8 = 90;
pub const DONE_PERCENT: u8 = 100;

/// Compact status view of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TaskProgress {
    pub stage: Stage,
    pub current_step: String,
    pub progress_percentage: u8,
    pub sub_question_count: usize,
    /// Sub-questions that completed successfully; failed ones are not counted here
    pub completed_count: usize,
}

/// Project a task snapshot into its status view.
pub fn project(task: &Task) -> TaskProgress {
    TaskProgress {
        stage: task.stage,
        current_step: task.current_step.clone(),
        progress_percentage: percentage(task),
        sub_question_count: task.sub_questions.len(),
        completed_count: task.completed_count(),
    }
}

/// Percentage for a snapshot.
///
/// The executing ramp counts failed sub-questions as resolved, so a task
/// whose questions all fail still reaches 80 before it is marked failed.
/// A failed task reports whatever percentage it had when it failed.
pub fn percentage(task: &Task) -> u8 {
    match task.stage {
        Stage::Planning => PLANNING_PERCENT,
        Stage::Executing => {
            let total = task.sub_questions.len();
            if total == 0 {
                return EXECUTING_START_PERCENT;
            }
            let resolved = task.resolved_count().min(total);
            let ramp = (EXECUTING_SPAN_PERCENT as usize * resolved) / total;
            EXECUTING_START_PERCENT + ramp as u8
        }
        Stage::Publishing => PUBLISHING_PERCENT,
        Stage::Done => DONE_PERCENT,
        Stage::Failed => task.progress_percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::task::{ResearchFindings, TaskId};
    use rstest::rstest;

    fn executing(total: usize, completed: usize, failed: usize) -> Task {
        let mut task = Task::new(TaskId::new(), "q");
        task.begin_execution((0..total).map(|i| format!("q{}", i)).collect());
        for i in 0..(completed + failed) {
            task.start_sub_question(i);
        }
        for i in 0..completed {
            task.complete_sub_question(
                i,
                ResearchFindings {
                    summary: "s".to_string(),
                    sources: vec![],
                },
            );
        }
        for i in completed..(completed + failed) {
            task.fail_sub_question(i, "err");
        }
        task
    }

    #[test]
    fn test_planning_is_ten_percent() {
        let task = Task::new(TaskId::new(), "q");
        assert_eq!(percentage(&task), 10);
    }

    #[rstest]
    #[case(3, 0, 0, 20)]
    #[case(3, 1, 0, 40)]
    #[case(3, 2, 0, 60)]
    #[case(3, 3, 0, 80)]
    #[case(7, 1, 0, 28)]
    #[case(7, 3, 1, 54)]
    #[case(2, 0, 2, 80)]
    #[case(6, 5, 0, 70)]
    fn test_executing_ramp(
        #[case] total: usize,
        #[case] completed: usize,
        #[case] failed: usize,
        #[case] expected: u8,
    ) {
        let task = executing(total, completed, failed);
        assert_eq!(percentage(&task), expected);
    }

    #[test]
    fn test_failed_questions_advance_ramp_but_not_completed_count() {
        let task = executing(4, 1, 2);
        let progress = project(&task);
        assert_eq!(progress.progress_percentage, 65);
        assert_eq!(progress.completed_count, 1);
        assert_eq!(progress.sub_question_count, 4);
    }

    #[test]
    fn test_publishing_is_ninety_percent() {
        let mut task = executing(1, 1, 0);
        task.begin_publishing();
        assert_eq!(percentage(&task), 90);
    }

    #[test]
    fn test_failed_keeps_stored_percentage() {
        let mut task = executing(2, 1, 0);
        task.progress_percentage = percentage(&task);
        task.fail("Publishing failed: boom");
        assert_eq!(percentage(&task), 50);
    }
}
