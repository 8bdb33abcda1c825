pub mod controller;
pub mod fetcher;
pub mod policy;
pub mod task;

// Re-export common types
pub use controller::CaptureController;
pub use fetcher::{FetchedPage, PageFetcher};
pub use policy::{cache_key, normalize_url, TargetPolicy};
pub use task::{CaptureOptions, CaptureResult, CaptureTask, TaskStatus, TaskSummary};
