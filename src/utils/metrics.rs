use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// What a recorded request was fetching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Page,
    Asset,
}

/// Counters for one kind of request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStats {
    pub requests: usize,
    pub failures: usize,
    pub bytes: usize,
    pub total_duration_ms: u64,
}

impl RequestStats {
    pub fn successes(&self) -> usize {
        self.requests - self.failures
    }

    /// Mean request duration in milliseconds
    pub fn average_duration_ms(&self) -> Option<u64> {
        (self.requests > 0).then(|| self.total_duration_ms / self.requests as u64)
    }
}

/// Snapshot of everything recorded since the collector was created or reset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    pub started_at: DateTime<Utc>,
    pub pages: RequestStats,
    pub assets: RequestStats,
    /// Responses seen per HTTP status code
    pub status_codes: BTreeMap<u16, usize>,
}

impl Metrics {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            pages: RequestStats::default(),
            assets: RequestStats::default(),
            status_codes: BTreeMap::new(),
        }
    }

    pub fn stats(&self, kind: RequestKind) -> &RequestStats {
        match kind {
            RequestKind::Page => &self.pages,
            RequestKind::Asset => &self.assets,
        }
    }

    fn stats_mut(&mut self, kind: RequestKind) -> &mut RequestStats {
        match kind {
            RequestKind::Page => &mut self.pages,
            RequestKind::Asset => &mut self.assets,
        }
    }

    pub fn total_requests(&self) -> usize {
        self.pages.requests + self.assets.requests
    }

    pub fn failed_requests(&self) -> usize {
        self.pages.failures + self.assets.failures
    }

    pub fn bytes_downloaded(&self) -> usize {
        self.pages.bytes + self.assets.bytes
    }
}

/// Request metrics shared by the page fetcher and the asset resolver
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    metrics: Arc<Mutex<Metrics>>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(Mutex::new(Metrics::new())),
        }
    }

    /// Record one finished request
    pub async fn record_request(
        &self,
        kind: RequestKind,
        success: bool,
        duration_ms: u64,
        status_code: Option<u16>,
        bytes: usize,
    ) {
        let mut metrics = self.metrics.lock().await;

        let stats = metrics.stats_mut(kind);
        stats.requests += 1;
        stats.bytes += bytes;
        stats.total_duration_ms += duration_ms;
        if !success {
            stats.failures += 1;
        }

        if let Some(code) = status_code {
            *metrics.status_codes.entry(code).or_default() += 1;
        }
    }

    pub fn start_timer(&self) -> RequestTimer {
        RequestTimer {
            start: Instant::now(),
        }
    }

    pub async fn get_metrics(&self) -> Metrics {
        self.metrics.lock().await.clone()
    }

    pub async fn reset(&self) {
        *self.metrics.lock().await = Metrics::new();
    }
}

/// Measures the duration of one request
pub struct RequestTimer {
    start: Instant,
}

impl RequestTimer {
    /// Milliseconds since the timer started
    pub fn end(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_requests_by_kind() {
        let collector = MetricsCollector::new();
        collector.record_request(RequestKind::Page, true, 120, Some(200), 2048).await;
        collector.record_request(RequestKind::Asset, false, 40, Some(404), 0).await;
        collector.record_request(RequestKind::Asset, true, 60, Some(200), 512).await;

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.total_requests(), 3);
        assert_eq!(metrics.failed_requests(), 1);
        assert_eq!(metrics.bytes_downloaded(), 2560);
        assert_eq!(metrics.stats(RequestKind::Asset).successes(), 1);
        assert_eq!(metrics.status_codes.get(&404), Some(&1));
        assert_eq!(metrics.stats(RequestKind::Asset).average_duration_ms(), Some(50));
        assert_eq!(metrics.stats(RequestKind::Page).average_duration_ms(), Some(120));

        collector.reset().await;
        assert_eq!(collector.get_metrics().await.total_requests(), 0);
    }

    #[test]
    fn test_average_of_nothing_is_none() {
        assert_eq!(RequestStats::default().average_duration_ms(), None);
    }
}
