use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::assets::AssetManifest;
use crate::extract::PageStructure;

/// Lifecycle state of a capture task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Complete,
    Error,
}

impl TaskStatus {
    /// COMPLETE and ERROR are final for a task id
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Complete => "COMPLETE",
            Self::Error => "ERROR",
        };
        f.pad(name)
    }
}

/// Per-run options for a capture
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOptions {
    /// Skip the cache lookup and fetch the page again
    #[serde(default)]
    pub force_refresh: bool,
}

/// Durable artifact of one successful capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    /// URL that was captured
    pub url: String,

    /// Structure extracted from the page
    pub page: PageStructure,

    /// Assets that were downloaded successfully
    pub assets: AssetManifest,

    /// Timestamp when the page was captured
    pub captured_at: DateTime<Utc>,
}

/// One capture attempt, tracked by id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureTask {
    /// Unique identifier for the task
    pub id: Uuid,

    /// URL to capture
    pub url: String,

    /// Cache key derived from the normalized URL
    pub cache_key: String,

    pub status: TaskStatus,

    /// Progress in percent; never decreases while the task runs
    pub progress: u8,

    /// Failure message when the task ended in ERROR
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub options: CaptureOptions,

    /// Present once the task is COMPLETE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Arc<CaptureResult>>,
}

impl CaptureTask {
    /// Create a PENDING task
    pub fn new(url: impl Into<String>, cache_key: impl Into<String>, options: CaptureOptions) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            cache_key: cache_key.into(),
            status: TaskStatus::Pending,
            progress: 0,
            error: None,
            created_at: now,
            updated_at: now,
            options,
            result: None,
        }
    }

    /// Mark the task as running
    pub fn begin(&mut self, progress: u8) {
        self.status = TaskStatus::InProgress;
        self.advance(progress);
    }

    /// Record a progress checkpoint; lower values are ignored
    pub fn advance(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(100));
        self.updated_at = Utc::now();
    }

    /// Attach the result and finish successfully
    pub fn complete(&mut self, result: Arc<CaptureResult>) {
        self.status = TaskStatus::Complete;
        self.progress = 100;
        self.error = None;
        self.result = Some(result);
        self.updated_at = Utc::now();
    }

    /// Finish with an error; progress resets to 0
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = TaskStatus::Error;
        self.progress = 0;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }

    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            task_id: self.id,
            url: self.url.clone(),
            status: self.status,
            progress: self.progress,
            error: self.error.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Status view of a task, without its result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub task_id: Uuid,
    pub url: String,
    pub status: TaskStatus,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_monotonic() {
        let mut task = CaptureTask::new("https://example.com/", "k", CaptureOptions::default());
        task.begin(10);
        task.advance(50);
        task.advance(30);

        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.progress, 50);
    }

    #[test]
    fn test_fail_resets_progress() {
        let mut task = CaptureTask::new("https://example.com/", "k", CaptureOptions::default());
        task.begin(10);
        task.advance(70);
        task.fail("boom");

        assert_eq!(task.status, TaskStatus::Error);
        assert_eq!(task.progress, 0);
        assert_eq!(task.summary().error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_status_serializes_screaming_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        assert_eq!(TaskStatus::InProgress.to_string(), "IN_PROGRESS");
        assert!(TaskStatus::Error.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
    }
}
