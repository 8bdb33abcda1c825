use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::redirect;
use reqwest::Client;
use std::error::Error as _;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::cli::config::FetchSettings;
use crate::crawler::policy::TargetPolicy;
use crate::error::{CaptureError, Result};
use crate::utils::metrics::{MetricsCollector, RequestKind};

const MAX_REDIRECTS: usize = 5;

/// Raw page as returned by the server
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: Url,
    pub status: u16,
    pub content_type: String,
    pub html: String,
}

/// Fetches capture targets over HTTP
pub struct PageFetcher {
    client: Client,
    metrics: MetricsCollector,
}

impl PageFetcher {
    pub fn new(settings: &FetchSettings, metrics: MetricsCollector) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .user_agent(settings.user_agent.as_str())
            .redirect(redirect_policy(TargetPolicy::new(&settings.allowed_hosts)))
            .build()?;

        Ok(Self { client, metrics })
    }

    /// Fetch `url`, requiring a success status and an HTML content type
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        debug!(url = %url, "Fetching page");
        let timer = self.metrics.start_timer();

        let response = match self
            .client
            .get(url.clone())
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "Page request failed");
                self.metrics.record_request(RequestKind::Page, false, timer.end(), None, 0).await;
                return Err(blocked_redirect(&e).unwrap_or(CaptureError::Http(e)));
            }
        };

        let status = response.status();
        if !status.is_success() {
            self.metrics
                .record_request(RequestKind::Page, false, timer.end(), Some(status.as_u16()), 0)
                .await;
            return Err(CaptureError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html(&content_type) {
            self.metrics
                .record_request(RequestKind::Page, false, timer.end(), Some(status.as_u16()), 0)
                .await;
            return Err(CaptureError::NotHtml {
                content_type: if content_type.is_empty() {
                    "missing content type".to_string()
                } else {
                    content_type
                },
            });
        }

        let final_url = response.url().clone();
        let html = response.text().await?;
        self.metrics
            .record_request(RequestKind::Page, true, timer.end(), Some(status.as_u16()), html.len())
            .await;

        debug!(url = %final_url, bytes = html.len(), "Fetched page");

        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            content_type,
            html,
        })
    }
}

/// Follow redirects only to hosts the allow-list accepts
fn redirect_policy(policy: TargetPolicy) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }

        let host = attempt.url().host_str().unwrap_or("").to_lowercase();
        if policy.is_host_allowed(&host) {
            attempt.follow()
        } else {
            debug!(host = %host, "Refusing redirect to non-allowed host");
            attempt.error(CaptureError::HostNotAllowed { host })
        }
    })
}

/// The allow-list error raised inside the redirect policy, if that is what stopped `error`
fn blocked_redirect(error: &reqwest::Error) -> Option<CaptureError> {
    let mut source = error.source();
    while let Some(inner) = source {
        if let Some(CaptureError::HostNotAllowed { host }) = inner.downcast_ref::<CaptureError>() {
            return Some(CaptureError::HostNotAllowed { host: host.clone() });
        }
        source = inner.source();
    }
    None
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}
