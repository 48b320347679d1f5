//! Priority engine and task ranking.
//!
//! This module provides:
//! - **Score computation**: base priority plus a stepped boost from the
//!   deadline or scheduled time, whichever is more urgent.
//! - **Ranking**: a deterministic total order over tasks by score, then age.
//! - **Bang parsing**: base priority from trailing `!`s in a title.
//!
//! Everything here is pure; callers pass `now` explicitly.
//!
//! # Example
//!
//! ```ignore
//! use taskpulse::priority::{compute_priority, rank_tasks_urgent_first};
//!
//! let score = compute_priority(2, None, Some(deadline), now);
//! let ordered = rank_tasks_urgent_first(&tasks, now);
//! ```

pub mod bang;
mod engine;
mod rank;

pub use bang::{MAX_PRIORITY, clamp_priority, parse_priority, render_title_with_priority};
pub use engine::{
    BoostTable, DEADLINE_BOOSTS, PriorityConfig, SCHEDULED_BOOSTS, compute_priority, compute_priority_raw,
    deadline_boost, scheduled_boost, task_priority,
};
pub use rank::{RankOrder, RankedTask, compare_tasks, rank_scored, rank_tasks, rank_tasks_urgent_first};
