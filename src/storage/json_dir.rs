use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

use crate::error::Result;

/// A directory holding one JSON document per entity, named `<key>.json`
#[derive(Debug, Clone)]
pub struct JsonDirectory {
    root: PathBuf,
}

impl JsonDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }

    /// Serialize `value` under `key`, creating the directory if needed
    pub async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let contents = serde_json::to_vec_pretty(value)?;

        // Write to a sibling file first so readers never see a partial document
        let path = self.path_for(key);
        let staging = self.root.join(format!(".{}.json.tmp", key));
        tokio::fs::write(&staging, contents).await?;
        tokio::fs::rename(&staging, &path).await?;

        debug!("Wrote {}", path.display());
        Ok(())
    }

    /// Read the document stored under `key`; `Ok(None)` when it does not exist
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let contents = match tokio::fs::read(self.path_for(key)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_slice(&contents)?))
    }

    /// Remove the document stored under `key`; returns whether it existed
    pub async fn remove(&self, key: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Keys of all stored documents, sorted
    pub async fn keys(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                    if !stem.starts_with('.') {
                        keys.push(stem.to_string());
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
    }

    #[tokio::test]
    async fn test_write_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirectory::new(dir.path().join("docs"));
        let doc = Doc { name: "a".to_string() };

        store.write("one", &doc).await.unwrap();
        assert_eq!(store.read::<Doc>("one").await.unwrap(), Some(doc));
        assert_eq!(store.keys().await.unwrap(), vec!["one".to_string()]);

        assert!(store.remove("one").await.unwrap());
        assert!(!store.remove("one").await.unwrap());
        assert_eq!(store.read::<Doc>("one").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirectory::new(dir.path().join("absent"));

        assert!(store.keys().await.unwrap().is_empty());
        assert_eq!(store.read::<Doc>("x").await.unwrap(), None);
    }
}
