use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

use super::json_dir::JsonDirectory;
use crate::codegen::GenerationRecord;
use crate::error::Result;

/// Durable store of the latest generation result per task
pub struct GeneratedStore {
    dir: JsonDirectory,
}

impl GeneratedStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: JsonDirectory::new(dir),
        }
    }

    pub async fn save(&self, record: &GenerationRecord) -> Result<()> {
        self.dir.write(&record.task_id.to_string(), record).await?;
        debug!("Stored generated code for task: {}", record.task_id);
        Ok(())
    }

    pub async fn load(&self, task_id: Uuid) -> Result<Option<GenerationRecord>> {
        self.dir.read(&task_id.to_string()).await
    }

    pub async fn delete(&self, task_id: Uuid) -> Result<bool> {
        self.dir.remove(&task_id.to_string()).await
    }
}
