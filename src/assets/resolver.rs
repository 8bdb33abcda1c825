use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::{AssetKind, AssetManifest, AssetRecord};
use crate::cli::config::AssetSettings;
use crate::crawler::policy::short_hash;
use crate::error::{CaptureError, Result};
use crate::extract::PageStructure;
use crate::utils::metrics::{MetricsCollector, RequestKind};

/// Longest stem kept from a URL basename
const MAX_STEM_LEN: usize = 64;

/// An asset reference resolved against the page URL
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlannedAsset {
    kind: AssetKind,
    url: Url,
}

/// Downloads a page's referenced assets, best effort
pub struct AssetResolver {
    client: Client,
    settings: AssetSettings,
    metrics: MetricsCollector,
}

impl AssetResolver {
    /// Create a resolver whose downloads time out after the configured interval
    pub fn new(settings: AssetSettings, user_agent: &str, metrics: MetricsCollector) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            settings,
            metrics,
        })
    }

    /// Download every stylesheet, image, script and font the page references
    /// into `output_dir`.
    ///
    /// A failed download is logged and left out of the manifest; it never
    /// fails the capture.
    pub async fn resolve(&self, page: &PageStructure, base_url: &Url, output_dir: &Path) -> AssetManifest {
        let mut manifest = AssetManifest::default();
        if !self.settings.enabled {
            debug!("Asset downloads disabled");
            return manifest;
        }

        let planned = self.plan(page, base_url);
        let attempted = planned.len();
        let concurrency = self.settings.concurrency.max(1);

        let downloads: Vec<Option<(AssetKind, AssetRecord)>> = stream::iter(planned)
            .map(|asset| self.download(asset, output_dir))
            .buffered(concurrency)
            .collect()
            .await;

        for (kind, record) in downloads.into_iter().flatten() {
            manifest.push(kind, record);
        }

        info!(
            attempted = attempted,
            downloaded = manifest.total(),
            "Asset download finished"
        );

        manifest
    }

    /// Resolve and de-duplicate all references in document order
    fn plan(&self, page: &PageStructure, base_url: &Url) -> Vec<PlannedAsset> {
        let mut references: Vec<(AssetKind, &str)> = Vec::new();
        references.extend(
            page.styles
                .stylesheets
                .iter()
                .map(|sheet| (AssetKind::Stylesheet, sheet.href.as_str())),
        );
        references.extend(page.resources.images.iter().map(|src| (AssetKind::Image, src.as_str())));
        if self.settings.download_scripts {
            references.extend(page.resources.scripts.iter().map(|src| (AssetKind::Script, src.as_str())));
        }
        if self.settings.download_fonts {
            references.extend(page.resources.fonts.iter().map(|src| (AssetKind::Font, src.as_str())));
        }

        let mut seen = HashSet::new();
        references
            .into_iter()
            .filter_map(|(kind, reference)| match base_url.join(reference) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Some(PlannedAsset { kind, url }),
                Ok(url) => {
                    debug!("Skipping asset with scheme {}: {}", url.scheme(), reference);
                    None
                }
                Err(e) => {
                    debug!("Skipping unresolvable asset reference {}: {}", reference, e);
                    None
                }
            })
            .filter(|asset| seen.insert(asset.url.to_string()))
            .collect()
    }

    async fn download(&self, asset: PlannedAsset, output_dir: &Path) -> Option<(AssetKind, AssetRecord)> {
        match self.fetch(&asset, output_dir).await {
            Ok(record) => {
                debug!(url = %asset.url, path = %record.local_path, "Downloaded asset");
                Some((asset.kind, record))
            }
            Err(e) => {
                warn!(url = %asset.url, error = %e, "Skipping asset");
                None
            }
        }
    }

    async fn fetch(&self, asset: &PlannedAsset, output_dir: &Path) -> Result<AssetRecord> {
        let timer = self.metrics.start_timer();

        let response = match self.client.get(asset.url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                self.metrics.record_request(RequestKind::Asset, false, timer.end(), None, 0).await;
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            self.metrics
                .record_request(RequestKind::Asset, false, timer.end(), Some(status.as_u16()), 0)
                .await;
            return Err(CaptureError::HttpStatus {
                url: asset.url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        self.metrics
            .record_request(RequestKind::Asset, true, timer.end(), Some(status.as_u16()), body.len())
            .await;

        let filename = asset_filename(&asset.url, asset.kind);
        let directory = output_dir.join(asset.kind.directory());
        tokio::fs::create_dir_all(&directory).await?;
        let local_path = directory.join(&filename);
        tokio::fs::write(&local_path, &body).await?;

        Ok(AssetRecord {
            original_url: asset.url.to_string(),
            local_path: local_path.to_string_lossy().to_string(),
            filename,
        })
    }
}

/// Filename for a downloaded asset: the URL basename plus a short hash of
/// the absolute URL, with an extension fallback by kind.
pub fn asset_filename(url: &Url, kind: AssetKind) -> String {
    let basename = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    let sanitized: String = basename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect();

    let (stem, extension) = match sanitized.rsplit_once('.') {
        Some((stem, ext)) if is_extension(ext) => (stem.to_string(), ext.to_lowercase()),
        _ => (sanitized.clone(), kind.fallback_extension().to_string()),
    };

    let mut stem = stem.trim_matches('.').to_string();
    if stem.is_empty() {
        stem = "asset".to_string();
    }
    stem.truncate(MAX_STEM_LEN);

    format!("{}-{}.{}", stem, short_hash(url.as_str(), 8), extension)
}

fn is_extension(ext: &str) -> bool {
    (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric())
}
