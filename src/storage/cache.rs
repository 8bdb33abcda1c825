//! Two-tier capture cache.
//!
//! The memory tier is a mutex-guarded map shared by every task; the disk
//! tier keeps one JSON document per cache key. Both tiers check the TTL on
//! their own, and a fresh memory entry always wins.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::json_dir::JsonDirectory;
use crate::crawler::task::CaptureResult;
use crate::error::Result;

/// Default time an entry stays fresh.
pub const DEFAULT_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: String,
    pub result: Arc<CaptureResult>,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.cached_at < ttl
    }
}

pub struct CacheManager {
    memory: Mutex<HashMap<String, CacheEntry>>,
    disk: JsonDirectory,
    ttl: Duration,
}

impl CacheManager {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            memory: Mutex::new(HashMap::new()),
            disk: JsonDirectory::new(dir),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a fresh result for `key`.
    pub async fn get(&self, key: &str) -> Option<Arc<CaptureResult>> {
        self.get_at(key, Utc::now()).await
    }

    /// Look up `key` as of `now`.
    ///
    /// Missing, stale or unreadable entries are all reported as a miss. A
    /// disk hit is not copied back into memory.
    pub async fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<Arc<CaptureResult>> {
        {
            let mut memory = self.memory.lock().await;
            match memory.get(key) {
                Some(entry) if entry.is_fresh(now, self.ttl) => {
                    debug!(key = %key, "Cache hit (memory)");
                    return Some(entry.result.clone());
                }
                Some(_) => {
                    debug!(key = %key, "Evicting stale memory entry");
                    memory.remove(key);
                }
                None => {}
            }
        }

        match self.disk.read::<CacheEntry>(key).await {
            Ok(Some(entry)) if entry.key == key && entry.is_fresh(now, self.ttl) => {
                debug!(key = %key, "Cache hit (disk)");
                Some(entry.result)
            }
            Ok(Some(_)) => {
                debug!(key = %key, "Disk entry stale");
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Unreadable cache entry, treating as miss");
                None
            }
        }
    }

    /// Store `result` under `key` in both tiers.
    pub async fn put(&self, key: &str, result: Arc<CaptureResult>) -> Result<()> {
        self.put_at(key, result, Utc::now()).await
    }

    pub async fn put_at(&self, key: &str, result: Arc<CaptureResult>, cached_at: DateTime<Utc>) -> Result<()> {
        let entry = CacheEntry {
            key: key.to_string(),
            result,
            cached_at,
        };

        self.memory.lock().await.insert(key.to_string(), entry.clone());
        self.disk.write(key, &entry).await?;

        debug!(key = %key, "Cached capture result");
        Ok(())
    }

    /// Drop stale entries from both tiers; returns how many disk entries went.
    pub async fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now();
        self.memory
            .lock()
            .await
            .retain(|_, entry| entry.is_fresh(now, self.ttl));

        let mut removed = 0;
        for key in self.disk.keys().await? {
            let stale = match self.disk.read::<CacheEntry>(&key).await {
                Ok(Some(entry)) => !entry.is_fresh(now, self.ttl),
                Ok(None) => false,
                Err(_) => true,
            };
            if stale && self.disk.remove(&key).await? {
                removed += 1;
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetManifest;
    use crate::extract::PageExtractor;

    fn sample_result() -> Arc<CaptureResult> {
        Arc::new(CaptureResult {
            url: "https://example.com/".to_string(),
            page: PageExtractor::default().extract(
                r#"<html><head><title>Cached</title></head><body><img class="logo" src="/l.png"></body></html>"#,
            ),
            assets: AssetManifest::default(),
            captured_at: Utc::now(),
        })
    }

    fn cache(dir: &tempfile::TempDir) -> CacheManager {
        CacheManager::new(dir.path().join("cache"), Duration::hours(DEFAULT_TTL_HOURS))
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        let result = sample_result();

        cache.put("k1", result.clone()).await.unwrap();

        let cached = cache.get("k1").await.unwrap();
        assert_eq!(*cached, *result);
        assert!(dir.path().join("cache").join("k1.json").exists());
    }

    #[tokio::test]
    async fn test_disk_tier_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let result = sample_result();
        cache(&dir).put("k1", result.clone()).await.unwrap();

        let reopened = cache(&dir);
        let cached = reopened.get("k1").await.unwrap();
        assert_eq!(*cached, *result);
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        cache.put("k1", sample_result()).await.unwrap();

        let later = Utc::now() + Duration::hours(25);
        assert!(cache.get_at("k1", later).await.is_none());

        // Memory entry is evicted, disk entry is still stale
        assert!(cache.get_at("k1", later).await.is_none());
        assert!(dir.path().join("cache").join("k1.json").exists());
    }

    #[tokio::test]
    async fn test_old_entry_on_disk_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let old = Utc::now() - Duration::hours(30);
        cache(&dir).put_at("k1", sample_result(), old).await.unwrap();

        assert!(cache(&dir).get("k1").await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("cache");
        std::fs::create_dir_all(&cache_dir).unwrap();
        std::fs::write(cache_dir.join("bad.json"), b"{ not json").unwrap();

        assert!(cache(&dir).get("bad").await.is_none());
        assert!(cache(&dir).get("never-written").await.is_none());
    }

    #[tokio::test]
    async fn test_purge_removes_stale_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir);
        cache.put_at("old", sample_result(), Utc::now() - Duration::hours(48)).await.unwrap();
        cache.put("new", sample_result()).await.unwrap();

        assert_eq!(cache.purge_expired().await.unwrap(), 1);
        assert!(cache.get("new").await.is_some());
        assert!(!dir.path().join("cache").join("old.json").exists());
    }
}
