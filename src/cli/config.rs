use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::fs;
use tracing::{info, debug, error};

use crate::extract::DEFAULT_MAX_DEPTH;

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub fetch: FetchSettings,
    pub extraction: ExtractionSettings,
    pub assets: AssetSettings,
    pub cache: CacheSettings,
    pub storage: StorageSettings,
    #[serde(default)]
    pub preview: PreviewSettings,
}

/// Page fetch settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FetchSettings {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Hosts that may be captured (if empty, any host is allowed)
    pub allowed_hosts: Vec<String>,
}

/// Page structure extraction settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExtractionSettings {
    /// Maximum depth of the normalized DOM tree
    pub max_depth: usize,
}

/// Asset download settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AssetSettings {
    pub enabled: bool,
    pub timeout_secs: u64,
    /// Number of downloads in flight per capture
    pub concurrency: usize,
    pub download_scripts: bool,
    pub download_fonts: bool,
}

/// Capture cache settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl_hours: i64,
}

/// Durable storage settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StorageSettings {
    /// Root directory for tasks, cache, generated code, assets, previews and exports
    pub data_dir: PathBuf,
}

/// Preview publishing settings
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PreviewSettings {
    /// Base URL the previews directory is served under; file URLs are used when unset
    pub base_url: Option<String>,
}

impl StorageSettings {
    pub fn tasks_dir(&self) -> PathBuf {
        self.data_dir.join("tasks")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    pub fn generated_dir(&self) -> PathBuf {
        self.data_dir.join("generated")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.data_dir.join("assets")
    }

    pub fn previews_dir(&self) -> PathBuf {
        self.data_dir.join("previews")
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fetch: FetchSettings {
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                timeout_secs: 30,
                allowed_hosts: vec![],
            },
            extraction: ExtractionSettings {
                max_depth: DEFAULT_MAX_DEPTH,
            },
            assets: AssetSettings {
                enabled: true,
                timeout_secs: 10,
                concurrency: 4,
                download_scripts: true,
                download_fonts: true,
            },
            cache: CacheSettings {
                enabled: true,
                ttl_hours: 24,
            },
            storage: StorageSettings {
                data_dir: Self::default_data_dir(),
            },
            preview: PreviewSettings::default(),
        }
    }
}

impl AppConfig {
    /// Configuration rooted at `data_dir`, otherwise default
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageSettings {
                data_dir: data_dir.into(),
            },
            ..Self::default()
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "page-recast", "page-recast")
    }

    fn default_data_dir() -> PathBuf {
        Self::project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("./data"))
    }

    /// Get the path to the config directory
    fn config_dir() -> PathBuf {
        let mut path = if let Some(proj_dirs) = Self::project_dirs() {
            proj_dirs.config_dir().to_path_buf()
        } else {
            PathBuf::from("./config")
        };

        // Create the sites directory if it doesn't exist
        path.push("sites");
        if !path.exists() {
            if let Err(e) = fs::create_dir_all(&path) {
                error!("Failed to create config directory: {}", e);
            }
        }

        // Move back up to the config directory
        path.pop();
        path
    }

    /// Load the default configuration
    pub fn load_default() -> Result<Self> {
        let config_dir = Self::config_dir();
        let config_path = config_dir.join("default.yaml");

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            // Create and save the default configuration
            info!("Default configuration not found. Creating...");
            let config = Self::default();
            config.save_as_default()?;
            Ok(config)
        }
    }

    /// Load a configuration profile
    pub fn load_profile(profile: &str) -> Result<Self> {
        let config_dir = Self::config_dir();
        let profile_path = config_dir.join("sites").join(format!("{}.yaml", profile));

        if profile_path.exists() {
            Self::load_from_file(&profile_path)
        } else {
            anyhow::bail!("Profile '{}' not found", profile)
        }
    }

    /// Load the named profile, or the default configuration when none is given
    pub fn load(profile: Option<&str>) -> Result<Self> {
        match profile {
            Some(profile) => Self::load_profile(profile)
                .context(format!("Failed to load profile: {}", profile)),
            None => Self::load_default(),
        }
    }

    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from: {}", path.display());
        let contents = fs::read_to_string(path)
            .context(format!("Failed to read configuration file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .context(format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Save the configuration as the default
    pub fn save_as_default(&self) -> Result<()> {
        let config_dir = Self::config_dir();
        let config_path = config_dir.join("default.yaml");

        self.save_to_file(&config_path)
    }

    /// Save the configuration as a profile
    pub fn save_as_profile(&self, profile: &str) -> Result<()> {
        let sites_dir = Self::config_dir().join("sites");
        let profile_path = sites_dir.join(format!("{}.yaml", profile));
        self.save_to_file(&profile_path)
    }

    /// Save the configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        debug!("Saving configuration to: {}", path.display());

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .context(format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let contents = serde_yaml::to_string(self)
            .context("Failed to serialize configuration")?;

        fs::write(path, contents)
            .context(format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    /// List all available profiles
    pub fn list_profiles() -> Result<Vec<String>> {
        let sites_dir = Self::config_dir().join("sites");

        if !sites_dir.exists() {
            return Ok(vec![]);
        }

        let mut profiles = Vec::new();

        for entry in fs::read_dir(sites_dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() && path.extension().map_or(false, |ext| ext == "yaml") {
                if let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) {
                    profiles.push(name.to_string());
                }
            }
        }

        profiles.sort();
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("site.yaml");

        let mut config = AppConfig::with_data_dir(dir.path().join("data"));
        config.fetch.allowed_hosts = vec!["example.test".to_string()];
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_preview_section_is_optional() {
        let yaml = r#"
fetch:
  user_agent: test
  timeout_secs: 5
  allowed_hosts: [example.test]
extraction:
  max_depth: 8
assets:
  enabled: false
  timeout_secs: 2
  concurrency: 1
  download_scripts: false
  download_fonts: false
cache:
  enabled: true
  ttl_hours: 1
storage:
  data_dir: /tmp/recast
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.extraction.max_depth, 8);
        assert_eq!(config.preview.base_url, None);
        assert_eq!(config.storage.tasks_dir(), PathBuf::from("/tmp/recast/tasks"));
    }
}
