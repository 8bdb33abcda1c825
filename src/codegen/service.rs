use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use super::analyzer::{analyze, PageAnalysis};
use super::builder::ComponentTreeBuilder;
use super::component::ComponentNode;
use super::generator::{CodeGenerator, GeneratedCode};
use super::options::{GenerationOptions, OutputFormat};
use crate::crawler::CaptureController;
use crate::error::{CaptureError, Result};
use crate::extract::PageStructure;
use crate::storage::GeneratedStore;

/// Analysis artifacts and code for one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub analysis: PageAnalysis,
    pub tree: ComponentNode,
    pub code: GeneratedCode,
}

/// Stored result of generating code for a captured task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    pub task_id: Uuid,
    pub options: GenerationOptions,
    #[serde(flatten)]
    pub output: GenerationOutput,
    pub generated_at: DateTime<Utc>,
}

/// A written preview document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewHandle {
    pub id: Uuid,
    pub url: String,
    pub path: PathBuf,
}

/// Files written by an export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDescriptor {
    pub task_id: Uuid,
    pub format: OutputFormat,
    pub directory: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Analyze, build and render a page. Pure and deterministic.
pub fn generate_page(page: &PageStructure, options: &GenerationOptions) -> GenerationOutput {
    let analysis = analyze(page);
    let tree = ComponentTreeBuilder::new(page, &analysis, options).build();
    let code = CodeGenerator::new(options).generate(&tree);

    GenerationOutput { analysis, tree, code }
}

/// Code generation over completed captures
pub struct GenerationService {
    captures: Arc<CaptureController>,
    store: GeneratedStore,
    previews_dir: PathBuf,
    exports_dir: PathBuf,
    preview_base_url: Option<String>,
}

impl GenerationService {
    pub fn new(captures: Arc<CaptureController>) -> Self {
        let config = captures.config();
        let store = GeneratedStore::new(config.storage.generated_dir());
        let previews_dir = config.storage.previews_dir();
        let exports_dir = config.storage.exports_dir();
        let preview_base_url = config.preview.base_url.clone();

        Self {
            captures,
            store,
            previews_dir,
            exports_dir,
            preview_base_url,
        }
    }

    /// Generate code for a completed task and store it as the task's latest generation
    pub async fn generate(&self, task_id: Uuid, options: GenerationOptions) -> Result<GenerationRecord> {
        let result = self.captures.result(task_id).await?;
        let output = generate_page(&result.page, &options);

        let record = GenerationRecord {
            task_id,
            options,
            output,
            generated_at: Utc::now(),
        };
        self.store.save(&record).await?;

        info!(
            task_id = %task_id,
            format = %record.options.format,
            layout = ?record.output.analysis.layout,
            components = record.output.code.components.len(),
            "Generated code"
        );
        Ok(record)
    }

    /// The most recent generation for a task
    pub async fn component_code(&self, task_id: Uuid) -> Result<GenerationRecord> {
        self.store
            .load(task_id)
            .await?
            .ok_or(CaptureError::GenerationNotFound(task_id))
    }

    /// Render arbitrary page data to a standalone HTML document
    pub async fn preview(&self, page: &PageStructure) -> Result<PreviewHandle> {
        let output = generate_page(page, &GenerationOptions::with_format(OutputFormat::Html));
        let document = output
            .code
            .components
            .first()
            .map(|component| component.code.clone())
            .unwrap_or_default();

        let id = Uuid::new_v4();
        tokio::fs::create_dir_all(&self.previews_dir).await?;
        let path = absolute(&self.previews_dir.join(format!("{}.html", id)))?;
        tokio::fs::write(&path, document).await?;

        let url = match &self.preview_base_url {
            Some(base) => format!("{}/previews/{}.html", base.trim_end_matches('/'), id),
            None => Url::from_file_path(&path)
                .map(|url| url.to_string())
                .unwrap_or_else(|_| format!("file://{}", path.display())),
        };

        debug!(preview_id = %id, url = %url, "Wrote preview");
        Ok(PreviewHandle { id, url, path })
    }

    /// Write a task's generated files to disk, generating first if no stored
    /// generation matches `format`
    pub async fn export(
        &self,
        task_id: Uuid,
        format: OutputFormat,
        output_dir: Option<PathBuf>,
    ) -> Result<ExportDescriptor> {
        let record = match self.store.load(task_id).await? {
            Some(record) if record.output.code.format == format => record,
            Some(record) => {
                let options = GenerationOptions {
                    format,
                    ..record.options
                };
                self.generate(task_id, options).await?
            }
            None => self.generate(task_id, GenerationOptions::with_format(format)).await?,
        };

        let directory =
            output_dir.unwrap_or_else(|| self.exports_dir.join(format!("{}-{}", task_id, format)));
        tokio::fs::create_dir_all(&directory).await?;

        let code = &record.output.code;
        let mut files = Vec::new();
        for component in &code.components {
            let path = directory.join(format!("{}.{}", component.name, format.extension()));
            tokio::fs::write(&path, &component.code).await?;
            files.push(path);

            if !component.styles.is_empty() {
                let path = directory.join(format!("{}.css", component.name));
                tokio::fs::write(&path, &component.styles).await?;
                files.push(path);
            }
        }
        if let Some(index) = &code.index {
            let path = directory.join("index.js");
            tokio::fs::write(&path, index).await?;
            files.push(path);
        }

        info!(task_id = %task_id, directory = %directory.display(), files = files.len(), "Exported generated code");
        Ok(ExportDescriptor {
            task_id,
            format,
            directory,
            files,
        })
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
