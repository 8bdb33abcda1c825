pub mod resolver;

use serde::{Deserialize, Serialize};

pub use resolver::{asset_filename, AssetResolver};

/// Category an asset is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Stylesheet,
    Script,
    Font,
}

impl AssetKind {
    /// Sub-directory of the task's asset directory
    pub fn directory(self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Stylesheet => "stylesheets",
            Self::Script => "scripts",
            Self::Font => "fonts",
        }
    }

    /// Extension used when the URL does not carry one
    pub fn fallback_extension(self) -> &'static str {
        match self {
            Self::Image => "png",
            Self::Stylesheet => "css",
            Self::Script => "js",
            Self::Font => "woff2",
        }
    }
}

/// A successfully downloaded asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    #[serde(rename = "originalURL")]
    pub original_url: String,
    pub local_path: String,
    pub filename: String,
}

/// Downloaded assets by category; failed downloads are never listed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifest {
    pub images: Vec<AssetRecord>,
    pub stylesheets: Vec<AssetRecord>,
    pub scripts: Vec<AssetRecord>,
    pub fonts: Vec<AssetRecord>,
}

impl AssetManifest {
    pub fn push(&mut self, kind: AssetKind, record: AssetRecord) {
        self.records_mut(kind).push(record);
    }

    pub fn records(&self, kind: AssetKind) -> &[AssetRecord] {
        match kind {
            AssetKind::Image => &self.images,
            AssetKind::Stylesheet => &self.stylesheets,
            AssetKind::Script => &self.scripts,
            AssetKind::Font => &self.fonts,
        }
    }

    fn records_mut(&mut self, kind: AssetKind) -> &mut Vec<AssetRecord> {
        match kind {
            AssetKind::Image => &mut self.images,
            AssetKind::Stylesheet => &mut self.stylesheets,
            AssetKind::Script => &mut self.scripts,
            AssetKind::Font => &mut self.fonts,
        }
    }

    pub fn total(&self) -> usize {
        self.images.len() + self.stylesheets.len() + self.scripts.len() + self.fonts.len()
    }
}
