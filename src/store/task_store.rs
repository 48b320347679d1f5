//! SQLite-backed task storage.
//!
//! Tasks are written through [`SqliteTaskStore::add_task`] and read back for
//! ranking through [`TaskSource`]. Deadline and scheduled times are kept as
//! free-form TEXT; whatever does not parse on the way out counts as unset.

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use crate::domain::Task;
use crate::error::{Result, TaskpulseError};
use crate::priority::parse_priority;
use crate::store::{TaskSource, from_db_time, to_db_time};

/// SQLite task table, one row per task.
pub struct SqliteTaskStore {
    db: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteTaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTaskStore").finish_non_exhaustive()
    }
}

impl SqliteTaskStore {
    /// Open or create the database file at `path`.
    ///
    /// Safe to point at the same file as [`SqliteJobStore`](crate::store::SqliteJobStore).
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let db = Connection::open(path)?;
        Self::init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        Self::init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                title TEXT NOT NULL,
                priority INTEGER NOT NULL DEFAULT 0,
                deadline_at TEXT,
                scheduled_at TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(owner_id);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|e| TaskpulseError::Storage(e.to_string()))
    }

    /// Add a task from user text. Trailing `!`s become the base priority.
    pub fn add_task(
        &self,
        owner_id: &str,
        text: &str,
        deadline_at: Option<DateTime<Utc>>,
        scheduled_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Task> {
        let (title, priority) = parse_priority(text);
        if title.is_empty() {
            return Err(TaskpulseError::InvalidState("task title is empty".to_string()));
        }

        let db = self.lock()?;
        db.execute(
            r#"
            INSERT INTO tasks (owner_id, title, priority, deadline_at, scheduled_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                owner_id,
                title,
                i64::from(priority),
                deadline_at.map(to_db_time),
                scheduled_at.map(to_db_time),
                to_db_time(now),
            ],
        )?;
        let id = db.last_insert_rowid();
        log::debug!("Added task {} for {} (priority {})", id, owner_id, priority);

        let mut task = Task::new(id.to_string(), title, i64::from(priority), now);
        task.deadline_at = deadline_at;
        task.scheduled_at = scheduled_at;
        Ok(task)
    }

    /// Delete a task. Returns whether a row was removed.
    pub fn remove_task(&self, owner_id: &str, id: &str) -> Result<bool> {
        let db = self.lock()?;
        let removed = db.execute("DELETE FROM tasks WHERE owner_id = ?1 AND id = ?2", params![owner_id, id])?;
        Ok(removed > 0)
    }
}

#[async_trait]
impl TaskSource for SqliteTaskStore {
    async fn fetch_tasks(&self, owner_id: &str) -> Result<Vec<Task>> {
        let db = self.lock()?;
        let mut stmt = db.prepare(
            r#"
            SELECT id, title, priority, deadline_at, scheduled_at, created_at
            FROM tasks WHERE owner_id = ?1
            "#,
        )?;

        let rows = stmt.query_map([owner_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut tasks = Vec::new();
        for row in rows {
            let (id, title, priority, deadline_at, scheduled_at, created_at) = row?;
            let task = Task::new(id.to_string(), title, priority, from_db_time(&created_at)?)
                .with_raw_times(deadline_at.as_deref(), scheduled_at.as_deref());
            tasks.push(task);
        }
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 20, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_add_and_fetch() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteTaskStore::open(&temp_dir.path().join("tasks.db")).unwrap();

        let deadline = now() + Duration::hours(2);
        let added = store.add_task("alice", "Pay rent!!", Some(deadline), None, now()).unwrap();
        assert_eq!(added.title, "Pay rent");
        assert_eq!(added.base_priority, 2);

        let tasks = store.fetch_tasks("alice").await.unwrap();
        assert_eq!(tasks, vec![added]);
        assert!(store.fetch_tasks("bob").await.unwrap().is_empty());
    }

    #[test]
    fn test_add_rejects_empty_title() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        assert!(matches!(
            store.add_task("alice", "  !!! ", None, None, now()),
            Err(TaskpulseError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_stored_times_are_absent() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        {
            let db = store.lock().unwrap();
            db.execute(
                "INSERT INTO tasks (owner_id, title, priority, deadline_at, scheduled_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params!["alice", "odd", 9, "someday", "2026-05-20 13:00:00", to_db_time(now())],
            )
            .unwrap();
        }

        let tasks = store.fetch_tasks("alice").await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].base_priority, 5);
        assert_eq!(tasks[0].deadline_at, None);
        assert_eq!(tasks[0].scheduled_at, Some(now() + Duration::hours(1)));
    }

    #[tokio::test]
    async fn test_remove_task() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        let task = store.add_task("alice", "Walk", None, None, now()).unwrap();

        assert!(!store.remove_task("bob", &task.id).unwrap());
        assert!(store.remove_task("alice", &task.id).unwrap());
        assert!(store.fetch_tasks("alice").await.unwrap().is_empty());
    }
}
