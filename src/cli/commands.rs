use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cli::config::AppConfig;
use crate::codegen::{GenerationOptions, GenerationService, OutputFormat};
use crate::crawler::{CaptureController, CaptureOptions, TaskStatus};
use crate::extract::PageStructure;
use crate::utils::metrics::RequestKind;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

fn controller(profile: Option<String>) -> Result<Arc<CaptureController>> {
    let config = AppConfig::load(profile.as_deref())?;
    let controller = CaptureController::new(config).context("Failed to initialize capture controller")?;
    Ok(Arc::new(controller))
}

/// Capture a page and wait for the task to finish
pub async fn capture(profile: Option<String>, url: String, force: bool, quiet: bool) -> Result<()> {
    let controller = controller(profile)?;

    let options = CaptureOptions { force_refresh: force };
    let started = controller
        .start(&url, options)
        .await
        .context(format!("Failed to start capture of {}", url))?;
    let task_id = started.task_id;
    println!("Task ID: {}", task_id);

    // The run lives on this process's runtime, so wait for it here
    let mut last_progress = None;
    let summary = loop {
        let summary = controller.status(task_id).await?;
        if !quiet && last_progress != Some(summary.progress) {
            println!("[{:>3}%] {}", summary.progress, summary.status);
            last_progress = Some(summary.progress);
        }
        if summary.status.is_terminal() {
            break summary;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    };

    let metrics = controller.metrics().get_metrics().await;
    info!(
        requests = metrics.total_requests(),
        failed = metrics.failed_requests(),
        bytes = metrics.bytes_downloaded(),
        avg_page_ms = ?metrics.stats(RequestKind::Page).average_duration_ms(),
        avg_asset_ms = ?metrics.stats(RequestKind::Asset).average_duration_ms(),
        "Capture finished"
    );

    match summary.status {
        TaskStatus::Complete => {
            let result = controller.result(task_id).await?;
            println!("Status: {}", summary.status);
            println!("Title: {}", result.page.title);
            println!("Key elements: {}", result.page.key_elements.total());
            println!(
                "Assets: {} images, {} stylesheets, {} scripts, {} fonts",
                result.assets.images.len(),
                result.assets.stylesheets.len(),
                result.assets.scripts.len(),
                result.assets.fonts.len()
            );
            Ok(())
        }
        _ => anyhow::bail!(
            "Capture failed: {}",
            summary.error.unwrap_or_else(|| "unknown error".to_string())
        ),
    }
}

/// Show the status of a capture task
pub async fn status(profile: Option<String>, task_id: Uuid) -> Result<()> {
    let controller = controller(profile)?;
    let status = controller.status(task_id).await?;

    println!("Task ID: {}", status.task_id);
    println!("URL: {}", status.url);
    println!("Status: {}", status.status);
    println!("Progress: {}%", status.progress);
    println!("Created: {}", status.created_at);
    println!("Last Updated: {}", status.updated_at);
    if let Some(error) = &status.error {
        println!("Error: {}", error);
    }

    Ok(())
}

/// Print or save the capture result of a completed task
pub async fn result(profile: Option<String>, task_id: Uuid, output: Option<PathBuf>) -> Result<()> {
    let controller = controller(profile)?;
    let result = controller.result(task_id).await?;
    let json = serde_json::to_string_pretty(result.as_ref()).context("Failed to serialize capture result")?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .context(format!("Failed to write {}", path.display()))?;
            info!("Capture result written to: {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// List known capture tasks
pub async fn list(profile: Option<String>) -> Result<()> {
    let controller = controller(profile)?;
    let tasks = controller.list().await?;

    if tasks.is_empty() {
        println!("No capture tasks");
        return Ok(());
    }

    for task in tasks {
        println!(
            "{}  {:<11} {:>3}%  {}",
            task.task_id, task.status, task.progress, task.url
        );
    }

    Ok(())
}

/// Delete a capture task record
pub async fn delete(profile: Option<String>, task_id: Uuid) -> Result<()> {
    let controller = controller(profile)?;
    controller.delete(task_id).await?;
    println!("Deleted task {}", task_id);
    Ok(())
}

/// Generate component code for a completed capture
pub async fn generate(profile: Option<String>, task_id: Uuid, options: GenerationOptions) -> Result<()> {
    let service = GenerationService::new(controller(profile)?);
    let record = service.generate(task_id, options).await?;
    let output = &record.output;

    println!("Layout: {:?}", output.analysis.layout);
    println!("Candidates:");
    for candidate in &output.analysis.candidates {
        println!(
            "  - {:?} ({:?}, {} elements)",
            candidate.kind,
            candidate.priority,
            candidate.source_elements.len()
        );
    }
    println!("Components ({}):", output.code.format);
    for component in &output.code.components {
        println!("  - {}", component.name);
    }
    println!("Use `recast component-code {}` to print the code", task_id);

    Ok(())
}

/// Print the most recently generated code for a task
pub async fn component_code(profile: Option<String>, task_id: Uuid) -> Result<()> {
    let service = GenerationService::new(controller(profile)?);
    let record = service.component_code(task_id).await?;

    for component in &record.output.code.components {
        println!("// ---- {} ----", component.name);
        println!("{}", component.code);
        if !component.styles.is_empty() {
            println!("/* ---- {}.css ---- */", component.name);
            println!("{}", component.styles);
        }
    }
    if let Some(index) = &record.output.code.index {
        println!("// ---- index ----");
        println!("{}", index);
    }

    Ok(())
}

/// Write an HTML preview of a captured task or of a page structure JSON file
pub async fn preview(profile: Option<String>, source: String) -> Result<()> {
    let controller = controller(profile)?;

    let page: PageStructure = match source.parse::<Uuid>() {
        Ok(task_id) => controller.result(task_id).await?.page.clone(),
        Err(_) => {
            let contents = tokio::fs::read_to_string(&source)
                .await
                .context(format!("Failed to read page structure: {}", source))?;
            serde_json::from_str(&contents).context(format!("Failed to parse page structure: {}", source))?
        }
    };

    let service = GenerationService::new(controller);
    let handle = service.preview(&page).await?;
    println!("Preview: {}", handle.url);

    Ok(())
}

/// Write generated code for a task to disk
pub async fn export(
    profile: Option<String>,
    task_id: Uuid,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let controller = controller(profile)?;
    let status = controller.status(task_id).await?;
    if status.status != TaskStatus::Complete {
        warn!("Task {} is {}, nothing to export yet", task_id, status.status);
    }

    let service = GenerationService::new(controller);
    let export = service.export(task_id, format, output).await?;

    println!("Exported {} files to {}", export.files.len(), export.directory.display());
    for file in &export.files {
        println!("  - {}", file.display());
    }

    Ok(())
}

/// Remove expired cache entries
pub async fn purge_cache(profile: Option<String>) -> Result<()> {
    let controller = controller(profile)?;
    let cache = controller.cache();
    let removed = cache.purge_expired().await?;
    println!(
        "Removed {} cache entries older than {} hours",
        removed,
        cache.ttl().num_hours()
    );
    Ok(())
}

/// List all available configuration profiles
pub fn list_profiles() -> Result<()> {
    let profiles = AppConfig::list_profiles()?;

    println!("Available configuration profiles:");
    for profile in profiles {
        println!("  - {}", profile);
    }

    Ok(())
}

/// Show a configuration profile, creating it with defaults if missing
pub fn manage_profile(profile_name: String) -> Result<()> {
    match AppConfig::load_profile(&profile_name) {
        Ok(config) => {
            println!("Profile: {}", profile_name);
            println!("{}", serde_yaml::to_string(&config)?);
        }
        Err(_) => {
            warn!("Profile '{}' does not exist. Creating a default profile.", profile_name);
            let config = AppConfig::default();
            config.save_as_profile(&profile_name)?;
            println!("Created default profile: {}", profile_name);
        }
    }

    Ok(())
}

/// Show the configuration in effect
pub fn show_config(profile: Option<String>) -> Result<()> {
    let config = AppConfig::load(profile.as_deref())?;
    println!("Current configuration:");
    println!("{}", serde_yaml::to_string(&config)?);

    Ok(())
}
