//! Typed errors for the capture and generation pipeline.
//!
//! Per-asset download failures and cache read failures are absorbed where
//! they happen and never show up here.

use thiserror::Error;
use uuid::Uuid;

use crate::crawler::task::TaskStatus;

/// Errors surfaced by the capture pipeline and its collaborators.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The target could not be parsed as a URL
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Only http and https targets are accepted
    #[error("unsupported URL scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    /// The target host is not on the allow-list
    #[error("host not allowed: {host}")]
    HostNotAllowed { host: String },

    /// The page responded with a non-success status
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    /// The page responded with something other than HTML
    #[error("non-HTML response: {content_type}")]
    NotHtml { content_type: String },

    /// Transport-level failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No task with this id exists
    #[error("task not found: {0}")]
    TaskNotFound(Uuid),

    /// The task exists but has no result yet
    #[error("task {id} has no result (status: {status})")]
    ResultNotReady { id: Uuid, status: TaskStatus },

    /// No generated code has been stored for this task
    #[error("no generated code for task: {0}")]
    GenerationNotFound(Uuid),

    /// Filesystem failure in durable storage
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CaptureError {
    /// Whether this error means the requested entity does not exist (yet).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TaskNotFound(_) | Self::ResultNotReady { .. } | Self::GenerationNotFound(_)
        )
    }

    /// Whether this error was raised before any task was created.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. } | Self::UnsupportedScheme { .. } | Self::HostNotAllowed { .. }
        )
    }
}

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, CaptureError>;
