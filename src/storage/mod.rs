pub mod cache;
pub mod generated;
pub mod json_dir;
pub mod tasks;

// Re-export common types
pub use cache::{CacheEntry, CacheManager};
pub use generated::GeneratedStore;
pub use json_dir::JsonDirectory;
pub use tasks::{FileTaskStore, TaskStore};
