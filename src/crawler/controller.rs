use chrono::{Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::assets::AssetResolver;
use crate::cli::config::AppConfig;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::policy::{cache_key, TargetPolicy};
use crate::crawler::task::{CaptureOptions, CaptureResult, CaptureTask, TaskStatus, TaskSummary};
use crate::error::{CaptureError, Result};
use crate::extract::PageExtractor;
use crate::storage::{CacheManager, FileTaskStore, GeneratedStore, TaskStore};
use crate::utils::metrics::MetricsCollector;

/// Outcome of one fetch-parse-download run, shared by every task waiting on it
type SharedCapture = std::result::Result<Arc<CaptureResult>, Arc<CaptureError>>;

/// Progress checkpoints
const PROGRESS_STARTED: u8 = 10;
const PROGRESS_FETCHED: u8 = 30;
const PROGRESS_PARSED: u8 = 50;
const PROGRESS_ASSETS: u8 = 70;
const PROGRESS_ASSEMBLED: u8 = 90;

/// Owns capture tasks and drives each one from PENDING to COMPLETE or ERROR.
///
/// Every task is advanced only by its own background run. Concurrent runs
/// for the same cache key share a single fetch.
pub struct CaptureController {
    config: AppConfig,
    policy: TargetPolicy,
    fetcher: PageFetcher,
    extractor: PageExtractor,
    resolver: AssetResolver,
    cache: Arc<CacheManager>,
    store: Arc<dyn TaskStore>,
    generated: GeneratedStore,
    tasks: RwLock<HashMap<Uuid, CaptureTask>>,
    in_flight: Mutex<HashMap<String, Arc<OnceCell<SharedCapture>>>>,
    metrics: MetricsCollector,
}

impl CaptureController {
    /// Create a controller with filesystem task storage under the data directory
    pub fn new(config: AppConfig) -> Result<Self> {
        let store: Arc<dyn TaskStore> = Arc::new(FileTaskStore::new(config.storage.tasks_dir()));
        Self::with_store(config, store)
    }

    /// Create a controller backed by the given task store
    pub fn with_store(config: AppConfig, store: Arc<dyn TaskStore>) -> Result<Self> {
        let metrics = MetricsCollector::new();
        let fetcher = PageFetcher::new(&config.fetch, metrics.clone())?;
        let resolver = AssetResolver::new(config.assets.clone(), &config.fetch.user_agent, metrics.clone())?;
        let cache = Arc::new(CacheManager::new(
            config.storage.cache_dir(),
            ChronoDuration::hours(config.cache.ttl_hours),
        ));

        Ok(Self {
            policy: TargetPolicy::new(&config.fetch.allowed_hosts),
            extractor: PageExtractor::new(config.extraction.max_depth),
            fetcher,
            resolver,
            cache,
            store,
            generated: GeneratedStore::new(config.storage.generated_dir()),
            tasks: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            metrics,
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> Arc<CacheManager> {
        self.cache.clone()
    }

    pub fn metrics(&self) -> MetricsCollector {
        self.metrics.clone()
    }

    /// Validate `url`, register a PENDING task and start it in the background.
    ///
    /// Returns without waiting for any network I/O. The capture itself only
    /// progresses while the runtime that called `start` is alive. Invalid or disallowed
    /// URLs are rejected here and never become tasks.
    pub async fn start(self: &Arc<Self>, url: &str, options: CaptureOptions) -> Result<TaskSummary> {
        let target = self.policy.validate(url)?;
        let task = CaptureTask::new(target.to_string(), cache_key(&target), options);
        let summary = task.summary();

        {
            let mut tasks = self.tasks.write().await;
            self.persist(&task).await;
            tasks.insert(task.id, task);
        }
        info!(task_id = %summary.task_id, url = %summary.url, "Capture task created");

        let controller = Arc::clone(self);
        let id = summary.task_id;
        tokio::spawn(async move { controller.supervise(id, target).await });

        Ok(summary)
    }

    /// Run a task and turn any failure, including a panic, into its ERROR state
    async fn supervise(self: Arc<Self>, id: Uuid, target: Url) {
        let runner = Arc::clone(&self);
        let outcome = tokio::spawn(async move { runner.run(id, target).await }).await;

        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("capture run aborted: {}", e),
        };

        error!(task_id = %id, error = %failure, "Capture task failed");
        self.update_task(id, |task| task.fail(failure)).await;
    }

    async fn run(self: Arc<Self>, id: Uuid, target: Url) -> std::result::Result<(), Arc<CaptureError>> {
        let Some(task) = self.update_task(id, |task| task.begin(PROGRESS_STARTED)).await else {
            debug!(task_id = %id, "Task deleted before it started");
            return Ok(());
        };

        if self.config.cache.enabled && !task.options.force_refresh {
            if let Some(cached) = self.cache.get(&task.cache_key).await {
                info!(task_id = %id, "Serving capture from cache");
                self.finish(id, cached).await;
                return Ok(());
            }
        }

        let result = self.capture_shared(id, &target, &task.cache_key).await?;
        self.finish(id, result).await;
        Ok(())
    }

    /// Join the in-flight capture for `key`, or lead a new one
    async fn capture_shared(&self, id: Uuid, target: &Url, key: &str) -> SharedCapture {
        let cell = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let mut led = false;
        let outcome = cell
            .get_or_init(|| {
                led = true;
                async { self.capture(id, target, key).await.map_err(Arc::new) }
            })
            .await
            .clone();

        if led {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight.get(key).map_or(false, |current| Arc::ptr_eq(current, &cell)) {
                in_flight.remove(key);
            }
        } else {
            debug!(task_id = %id, "Joined in-flight capture");
        }

        outcome
    }

    /// Fetch, parse and download assets, checkpointing progress on task `id`
    async fn capture(&self, id: Uuid, target: &Url, key: &str) -> Result<Arc<CaptureResult>> {
        let fetched = self.fetcher.fetch(target).await?;
        self.checkpoint(id, PROGRESS_FETCHED).await;

        let page = self.extractor.extract(&fetched.html);
        self.checkpoint(id, PROGRESS_PARSED).await;

        let assets_dir = self.config.storage.assets_dir().join(id.to_string());
        let assets = self.resolver.resolve(&page, &fetched.url, &assets_dir).await;
        self.checkpoint(id, PROGRESS_ASSETS).await;

        let result = Arc::new(CaptureResult {
            url: target.to_string(),
            page,
            assets,
            captured_at: Utc::now(),
        });
        self.checkpoint(id, PROGRESS_ASSEMBLED).await;

        if self.config.cache.enabled {
            if let Err(e) = self.cache.put(key, result.clone()).await {
                warn!(task_id = %id, error = %e, "Failed to cache capture result");
            }
        }

        Ok(result)
    }

    async fn checkpoint(&self, id: Uuid, progress: u8) {
        if self.update_task(id, |task| task.advance(progress)).await.is_some() {
            debug!(task_id = %id, progress = progress, "Capture progress");
        }
    }

    async fn finish(&self, id: Uuid, result: Arc<CaptureResult>) {
        if let Some(task) = self.update_task(id, |task| task.complete(result)).await {
            info!(task_id = %id, url = %task.url, "Capture task complete");
        }
    }

    /// Apply `f` to the live task and persist it; `None` if it was deleted.
    ///
    /// The write lock is held until the record is saved, so a concurrent
    /// `delete` either runs first (and nothing is written) or removes the
    /// saved record afterwards.
    async fn update_task<F>(&self, id: Uuid, f: F) -> Option<CaptureTask>
    where
        F: FnOnce(&mut CaptureTask),
    {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&id)?;
        f(task);
        let task = task.clone();
        self.persist(&task).await;
        Some(task)
    }

    async fn persist(&self, task: &CaptureTask) {
        if let Err(e) = self.store.save_task(task).await {
            warn!(task_id = %task.id, error = %e, "Failed to persist task");
        }
    }

    async fn read_live(&self, id: Uuid) -> Option<CaptureTask> {
        self.tasks.read().await.get(&id).cloned()
    }

    /// Live task if present, otherwise the durable record
    async fn lookup(&self, id: Uuid) -> Result<CaptureTask> {
        if let Some(task) = self.read_live(id).await {
            return Ok(task);
        }
        self.store
            .load_task(id)
            .await?
            .ok_or(CaptureError::TaskNotFound(id))
    }

    /// Last known state of a task
    pub async fn status(&self, id: Uuid) -> Result<TaskSummary> {
        Ok(self.lookup(id).await?.summary())
    }

    /// The capture result, available only once the task is COMPLETE
    pub async fn result(&self, id: Uuid) -> Result<Arc<CaptureResult>> {
        let task = self.lookup(id).await?;
        match (task.status, task.result) {
            (TaskStatus::Complete, Some(result)) => Ok(result),
            (status, _) => Err(CaptureError::ResultNotReady { id, status }),
        }
    }

    /// Summaries of all known tasks, oldest first
    pub async fn list(&self) -> Result<Vec<TaskSummary>> {
        let mut merged: HashMap<Uuid, TaskSummary> = self
            .store
            .list_tasks()
            .await?
            .into_iter()
            .map(|task| (task.id, task.summary()))
            .collect();

        for task in self.tasks.read().await.values() {
            merged.insert(task.id, task.summary());
        }

        let mut summaries: Vec<TaskSummary> = merged.into_values().collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(summaries)
    }

    /// Remove a task record, and any code generated from it, from memory and
    /// durable storage.
    ///
    /// This is not cancellation: a run already in progress keeps going, but
    /// its updates are discarded.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let (live, stored) = {
            let mut tasks = self.tasks.write().await;
            let live = tasks.remove(&id).is_some();
            (live, self.store.delete_task(id).await?)
        };
        self.generated.delete(id).await?;

        if !live && !stored {
            return Err(CaptureError::TaskNotFound(id));
        }

        info!(task_id = %id, "Deleted capture task");
        Ok(())
    }

    /// Poll until the task reaches a terminal state
    pub async fn wait(&self, id: Uuid, poll_interval: Duration) -> Result<TaskSummary> {
        loop {
            let summary = self.status(id).await?;
            if summary.status.is_terminal() {
                return Ok(summary);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const POLL: Duration = Duration::from_millis(10);

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Example</title>
    <link rel="stylesheet" href="/static/site.css">
</head>
<body>
    <img class="logo" src="/img/logo.png" alt="Example">
    <input placeholder="search" name="q">
    <img src="/img/banner.png">
    <img src="/img/missing.png">
</body>
</html>"#;

    fn test_config(data_dir: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::with_data_dir(data_dir);
        config.fetch.allowed_hosts = vec!["127.0.0.1".to_string()];
        config.assets.timeout_secs = 2;
        config
    }

    fn controller(data_dir: &std::path::Path) -> Arc<CaptureController> {
        Arc::new(CaptureController::new(test_config(data_dir)).unwrap())
    }

    /// File store whose writes take a while to land
    struct SlowStore {
        inner: FileTaskStore,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl TaskStore for SlowStore {
        async fn save_task(&self, task: &CaptureTask) -> Result<()> {
            tokio::time::sleep(self.delay).await;
            self.inner.save_task(task).await
        }

        async fn load_task(&self, id: Uuid) -> Result<Option<CaptureTask>> {
            self.inner.load_task(id).await
        }

        async fn list_tasks(&self) -> Result<Vec<CaptureTask>> {
            self.inner.list_tasks().await
        }

        async fn delete_task(&self, id: Uuid) -> Result<bool> {
            self.inner.delete_task(id).await
        }
    }

    async fn serve_page(server: &MockServer, body: &str, expected_fetches: u64) {
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html"))
            .expect(expected_fetches)
            .mount(server)
            .await;
    }

    async fn serve_assets(server: &MockServer) {
        for ok in ["/img/logo.png", "/img/banner.png", "/static/site.css"] {
            Mock::given(method("GET"))
                .and(path(ok))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 16]))
                .mount(server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/img/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_start_returns_pending_immediately() {
        let server = MockServer::start().await;
        serve_page(&server, PAGE, 1).await;
        serve_assets(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());

        let summary = controller.start(&server.uri(), CaptureOptions::default()).await.unwrap();
        assert_eq!(summary.status, TaskStatus::Pending);
        assert_eq!(controller.status(summary.task_id).await.unwrap().status, TaskStatus::Pending);

        let done = controller.wait(summary.task_id, POLL).await.unwrap();
        assert_eq!(done.status, TaskStatus::Complete);
        assert_eq!(done.progress, 100);
    }

    #[tokio::test]
    async fn test_missing_asset_does_not_fail_capture() {
        let server = MockServer::start().await;
        serve_page(&server, PAGE, 1).await;
        serve_assets(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());

        let id = controller.start(&server.uri(), CaptureOptions::default()).await.unwrap().task_id;
        controller.wait(id, POLL).await.unwrap();

        let result = controller.result(id).await.unwrap();
        assert_eq!(result.assets.images.len(), 2);
        assert_eq!(result.assets.stylesheets.len(), 1);
        assert_eq!(result.page.key_elements.logos.len(), 1);
        assert_eq!(result.page.key_elements.search_boxes.len(), 1);
    }

    #[tokio::test]
    async fn test_non_html_response_fails_task() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{\"ok\":true}", "application/json"))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());

        let id = controller.start(&server.uri(), CaptureOptions::default()).await.unwrap().task_id;
        let done = controller.wait(id, POLL).await.unwrap();

        assert_eq!(done.status, TaskStatus::Error);
        assert_eq!(done.progress, 0);
        assert!(done.error.unwrap().contains("non-HTML"));
        assert!(matches!(
            controller.result(id).await,
            Err(CaptureError::ResultNotReady { status: TaskStatus::Error, .. })
        ));
    }

    #[tokio::test]
    async fn test_second_capture_is_served_from_cache() {
        let server = MockServer::start().await;
        serve_page(&server, PAGE, 1).await;
        serve_assets(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());

        let first = controller.start(&server.uri(), CaptureOptions::default()).await.unwrap().task_id;
        controller.wait(first, POLL).await.unwrap();

        let second = controller.start(&server.uri(), CaptureOptions::default()).await.unwrap().task_id;
        let done = controller.wait(second, POLL).await.unwrap();

        assert_eq!(done.status, TaskStatus::Complete);
        assert_eq!(
            *controller.result(first).await.unwrap(),
            *controller.result(second).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_cache() {
        let server = MockServer::start().await;
        serve_page(&server, PAGE, 2).await;
        serve_assets(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());

        let first = controller.start(&server.uri(), CaptureOptions::default()).await.unwrap().task_id;
        controller.wait(first, POLL).await.unwrap();

        let options = CaptureOptions { force_refresh: true };
        let second = controller.start(&server.uri(), options).await.unwrap().task_id;
        assert_eq!(controller.wait(second, POLL).await.unwrap().status, TaskStatus::Complete);
    }

    #[tokio::test]
    async fn test_concurrent_captures_share_one_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(PAGE, "text/html")
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(1)
            .mount(&server)
            .await;
        serve_assets(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.cache.enabled = false;
        let controller = Arc::new(CaptureController::new(config).unwrap());

        let a = controller.start(&server.uri(), CaptureOptions::default()).await.unwrap().task_id;
        let b = controller.start(&server.uri(), CaptureOptions::default()).await.unwrap().task_id;

        assert_eq!(controller.wait(a, POLL).await.unwrap().status, TaskStatus::Complete);
        assert_eq!(controller.wait(b, POLL).await.unwrap().status, TaskStatus::Complete);
    }

    #[tokio::test]
    async fn test_disallowed_host_is_rejected_before_task_creation() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());

        let err = controller
            .start("https://elsewhere.test/", CaptureOptions::default())
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(controller.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tasks_survive_in_durable_storage() {
        let server = MockServer::start().await;
        serve_page(&server, PAGE, 1).await;
        serve_assets(&server).await;
        let dir = tempfile::tempdir().unwrap();

        let id = {
            let controller = controller(dir.path());
            let id = controller.start(&server.uri(), CaptureOptions::default()).await.unwrap().task_id;
            controller.wait(id, POLL).await.unwrap();
            id
        };

        let reopened = controller(dir.path());
        assert_eq!(reopened.status(id).await.unwrap().status, TaskStatus::Complete);
        assert!(reopened.result(id).await.is_ok());
        assert_eq!(reopened.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_task() {
        let server = MockServer::start().await;
        serve_page(&server, PAGE, 1).await;
        serve_assets(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());

        let id = controller.start(&server.uri(), CaptureOptions::default()).await.unwrap().task_id;
        controller.wait(id, POLL).await.unwrap();
        controller.delete(id).await.unwrap();

        assert!(matches!(controller.status(id).await, Err(CaptureError::TaskNotFound(_))));
        assert!(matches!(controller.delete(id).await, Err(CaptureError::TaskNotFound(_))));
    }

    #[tokio::test]
    async fn test_redirect_to_disallowed_host_fails_task() {
        let server = MockServer::start().await;
        let elsewhere = format!("http://localhost:{}/landing", server.address().port());
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", elsewhere.as_str()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/landing"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PAGE, "text/html"))
            .expect(0)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());

        let id = controller.start(&server.uri(), CaptureOptions::default()).await.unwrap().task_id;
        let done = controller.wait(id, POLL).await.unwrap();

        assert_eq!(done.status, TaskStatus::Error);
        assert!(done.error.unwrap().contains("host not allowed: localhost"));
    }

    #[tokio::test]
    async fn test_delete_while_running_stays_deleted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(PAGE, "text/html")
                    .set_delay(Duration::from_millis(100)),
            )
            .mount(&server)
            .await;
        serve_assets(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let store = Arc::new(SlowStore {
            inner: FileTaskStore::new(config.storage.tasks_dir()),
            delay: Duration::from_millis(50),
        });
        let controller = Arc::new(CaptureController::with_store(config, store).unwrap());

        let id = controller.start(&server.uri(), CaptureOptions::default()).await.unwrap().task_id;
        // Lands while the run is still writing its IN_PROGRESS record
        tokio::time::sleep(Duration::from_millis(5)).await;
        controller.delete(id).await.unwrap();

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(matches!(controller.status(id).await, Err(CaptureError::TaskNotFound(_))));
        assert!(controller.list().await.unwrap().is_empty());
    }
}
