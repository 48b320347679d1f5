//! Ranking integration tests
//!
//! Tasks go in through the SQLite task store and come out ranked.

use chrono::{DateTime, Duration, TimeZone, Utc};
use taskpulse::error::Result;
use taskpulse::priority::{RankOrder, rank_scored, rank_tasks, rank_tasks_urgent_first};
use taskpulse::store::{SqliteTaskStore, TaskSource};
use tempfile::TempDir;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

/// Integration test: stored tasks rank by score, then age
#[tokio::test]
async fn test_stored_tasks_rank() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = SqliteTaskStore::open(&temp_dir.path().join("tasks.db"))?;

    store.add_task("me", "Read a book", None, None, now() - Duration::days(3))?;
    store.add_task("me", "Taxes!", Some(now() + Duration::minutes(30)), None, now() - Duration::days(2))?;
    store.add_task("me", "Dentist", None, Some(now() + Duration::hours(3)), now() - Duration::days(1))?;
    store.add_task("me", "Overdue report", Some(now() - Duration::hours(1)), None, now())?;
    store.add_task("me", "Call home!!", None, None, now() - Duration::days(4))?;

    let tasks = store.fetch_tasks("me").await?;
    let ranked = rank_scored(&tasks, now(), RankOrder::UrgentFirst);
    let view: Vec<(&str, i64)> = ranked.iter().map(|r| (r.task.title.as_str(), r.score)).collect();

    assert_eq!(
        view,
        vec![
            ("Overdue report", 1000),
            ("Taxes", 801),
            ("Dentist", 300),
            ("Call home", 2),
            ("Read a book", 0),
        ]
    );

    let ascending: Vec<String> = rank_tasks(&tasks, now()).into_iter().map(|t| t.title).collect();
    assert_eq!(ascending, vec!["Read a book", "Call home", "Dentist", "Taxes", "Overdue report"]);
    Ok(())
}

/// Integration test: equal scores fall back to creation time in both directions
#[tokio::test]
async fn test_ties_prefer_older_tasks() -> Result<()> {
    let store = SqliteTaskStore::open_in_memory()?;
    store.add_task("me", "newer", None, None, now())?;
    store.add_task("me", "older", None, None, now() - Duration::hours(1))?;

    let tasks = store.fetch_tasks("me").await?;
    let asc: Vec<String> = rank_tasks(&tasks, now()).into_iter().map(|t| t.title).collect();
    let urgent: Vec<String> = rank_tasks_urgent_first(&tasks, now()).into_iter().map(|t| t.title).collect();

    assert_eq!(asc, vec!["older", "newer"]);
    assert_eq!(urgent, vec!["older", "newer"]);
    Ok(())
}

/// Integration test: ranking is repeatable for the same inputs
#[tokio::test]
async fn test_ranking_is_repeatable() -> Result<()> {
    let store = SqliteTaskStore::open_in_memory()?;
    for i in 0..6 {
        store.add_task("me", &format!("t{}", i), Some(now() + Duration::hours(i * 10)), None, now())?;
    }

    let tasks = store.fetch_tasks("me").await?;
    let mut reversed = tasks.clone();
    reversed.reverse();

    assert_eq!(rank_tasks(&tasks, now()), rank_tasks(&reversed, now()));
    assert_eq!(rank_tasks(&tasks, now()), rank_tasks(&rank_tasks(&tasks, now()), now()));
    Ok(())
}
