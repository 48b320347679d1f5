//! Task ranking.
//!
//! Orders tasks by `(score, created_at)`. The canonical order is ascending
//! score; "most urgent first" displays flip the score but keep older tasks
//! ahead of newer ones on ties. Task id is the last tie-break so the result
//! never depends on input order.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::domain::Task;
use crate::priority::engine::task_priority;

/// Direction of a ranked listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankOrder {
    /// Lowest score first
    #[default]
    Ascending,
    /// Highest score first
    UrgentFirst,
}

/// A task together with the score it was ranked by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedTask {
    pub task: Task,
    pub score: i64,
}

fn compare_scored(a: (&Task, i64), b: (&Task, i64), order: RankOrder) -> Ordering {
    let by_score = match order {
        RankOrder::Ascending => a.1.cmp(&b.1),
        RankOrder::UrgentFirst => b.1.cmp(&a.1),
    };
    by_score
        .then_with(|| a.0.created_at.cmp(&b.0.created_at))
        .then_with(|| a.0.id.cmp(&b.0.id))
}

/// Compare two tasks in the canonical (ascending) order.
pub fn compare_tasks(a: &Task, b: &Task, now: DateTime<Utc>) -> Ordering {
    compare_scored((a, task_priority(a, now)), (b, task_priority(b, now)), RankOrder::Ascending)
}

/// Score and order tasks.
pub fn rank_scored(tasks: &[Task], now: DateTime<Utc>, order: RankOrder) -> Vec<RankedTask> {
    let mut ranked: Vec<RankedTask> = tasks
        .iter()
        .map(|task| RankedTask {
            score: task_priority(task, now),
            task: task.clone(),
        })
        .collect();

    ranked.sort_by(|a, b| compare_scored((&a.task, a.score), (&b.task, b.score), order));
    ranked
}

/// Canonical ranking: ascending score, then older first.
pub fn rank_tasks(tasks: &[Task], now: DateTime<Utc>) -> Vec<Task> {
    rank_scored(tasks, now, RankOrder::Ascending)
        .into_iter()
        .map(|r| r.task)
        .collect()
}

/// Most urgent first, then older first.
pub fn rank_tasks_urgent_first(tasks: &[Task], now: DateTime<Utc>) -> Vec<Task> {
    rank_scored(tasks, now, RankOrder::UrgentFirst)
        .into_iter()
        .map(|r| r.task)
        .collect()
}
