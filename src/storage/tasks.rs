use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, warn};
use uuid::Uuid;

use super::json_dir::JsonDirectory;
use crate::crawler::task::CaptureTask;
use crate::error::Result;

/// Trait for durable task storage
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Store (or replace) a task record
    async fn save_task(&self, task: &CaptureTask) -> Result<()>;

    /// Load a task record
    async fn load_task(&self, id: Uuid) -> Result<Option<CaptureTask>>;

    /// List all stored tasks
    async fn list_tasks(&self) -> Result<Vec<CaptureTask>>;

    /// Delete a task record; returns whether it existed
    async fn delete_task(&self, id: Uuid) -> Result<bool>;
}

/// Filesystem implementation of TaskStore: one JSON document per task
pub struct FileTaskStore {
    dir: JsonDirectory,
}

impl FileTaskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: JsonDirectory::new(dir),
        }
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    async fn save_task(&self, task: &CaptureTask) -> Result<()> {
        self.dir.write(&task.id.to_string(), task).await?;
        debug!("Stored task: {}", task.id);
        Ok(())
    }

    async fn load_task(&self, id: Uuid) -> Result<Option<CaptureTask>> {
        self.dir.read(&id.to_string()).await
    }

    async fn list_tasks(&self) -> Result<Vec<CaptureTask>> {
        let mut tasks = Vec::new();

        for key in self.dir.keys().await? {
            match self.dir.read::<CaptureTask>(&key).await {
                Ok(Some(task)) => tasks.push(task),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable task record {}: {}", key, e),
            }
        }

        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tasks)
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool> {
        let removed = self.dir.remove(&id.to_string()).await?;
        debug!("Deleted task record: {}", id);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::task::{CaptureOptions, TaskStatus};

    #[tokio::test]
    async fn test_task_records_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTaskStore::new(dir.path().join("tasks"));

        let mut first = CaptureTask::new("https://example.com/a", "ka", CaptureOptions::default());
        first.begin(10);
        let mut second = CaptureTask::new(
            "https://example.com/b",
            "kb",
            CaptureOptions { force_refresh: true },
        );
        second.created_at = first.created_at + chrono::Duration::seconds(1);

        store.save_task(&first).await.unwrap();
        store.save_task(&second).await.unwrap();

        let loaded = store.load_task(first.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, TaskStatus::InProgress);
        assert_eq!(loaded.progress, 10);

        let all = store.list_tasks().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first.id);
        assert!(all[1].options.force_refresh);

        assert!(store.delete_task(first.id).await.unwrap());
        assert!(store.load_task(first.id).await.unwrap().is_none());
    }
}
