// src/pipeline/ingest.rs

//! Image ingestion pipeline.
//!
//! ```text
//! manifest ─┬─ reference ── fetch+decode ─┬─ small  ── resize ── store ── index
//!           │                             ├─ medium ── resize ── store ── index
//!           │                             └─ large  ── resize ── store ── index
//!           └─ reference ── ...
//! ```
//!
//! References run on a bounded worker pool; the sizes of one reference
//! run concurrently over the same read-only raster. A failure only ever
//! takes down its own unit.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::index::ImageIndex;
use crate::models::{
    DecodedImage, ImageReference, PipelineConfig, SizeSpec, StoredImageRecord, stored_name,
};
use crate::pipeline::report::{
    Interruption, PipelineReport, Stage, UnitFailure, UnitOutcome,
};
use crate::pipeline::retry::RetryPolicy;
use crate::services::resize::render_variant;
use crate::services::{ImageFetcher, ManifestFetcher};
use crate::storage::ImageStorage;

/// Orchestrates manifest → fetch → resize → store → index.
pub struct Pipeline {
    manifest: ManifestFetcher,
    images: ImageFetcher,
    storage: Arc<dyn ImageStorage>,
    index: Arc<dyn ImageIndex>,
    retry: RetryPolicy,
    max_concurrent: usize,
    deadline: Option<Duration>,
    jpeg_quality: u8,
}

impl Pipeline {
    /// Create a pipeline over the given backends.
    pub fn new(
        config: &PipelineConfig,
        client: Client,
        storage: Arc<dyn ImageStorage>,
        index: Arc<dyn ImageIndex>,
    ) -> Self {
        Self {
            manifest: ManifestFetcher::new(client.clone()),
            images: ImageFetcher::new(client),
            storage,
            index,
            retry: RetryPolicy::from_config(config),
            max_concurrent: config.max_concurrent.max(1),
            deadline: config.deadline(),
            jpeg_quality: config.jpeg_quality,
        }
    }

    /// Replace the retry policy derived from the configuration.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run the pipeline once over the manifest at `endpoint`.
    ///
    /// Only a manifest failure fails the run. Per-unit failures are
    /// collected in the report. When `cancel` fires or the deadline passes,
    /// no new work starts, network waits are abandoned, and writes already
    /// underway finish so the index never points at a missing object.
    pub async fn run(
        &self,
        endpoint: &str,
        sizes: &[SizeSpec],
        cancel: &CancellationToken,
    ) -> Result<PipelineReport> {
        let started_at = Utc::now();
        let stop = cancel.child_token();

        let deadline = sleep_or_pending(self.deadline);
        tokio::pin!(deadline);

        log::info!("Fetching manifest from {}", endpoint);
        let references = tokio::select! {
            biased;
            _ = stop.cancelled() => {
                return Err(AppError::cancelled("manifest fetch"));
            }
            _ = &mut deadline => {
                return Err(AppError::transport(
                    endpoint,
                    "deadline elapsed before the manifest was fetched",
                ));
            }
            result = self.retry.run("Manifest fetch", &stop, || self.manifest.fetch(endpoint)) => result?,
        };
        log::info!(
            "Manifest lists {} images, processing {} at a time",
            references.len(),
            self.max_concurrent
        );
        warn_duplicate_names(&references);

        let mut report = PipelineReport::new(endpoint, sizes, references.len(), started_at);
        let mut deadline_hit = false;

        let units = stream::iter(references)
            .take_until(stop.cancelled())
            .map(|reference| self.process_reference(reference, sizes, &stop))
            .buffer_unordered(self.max_concurrent);
        tokio::pin!(units);

        loop {
            tokio::select! {
                next = units.next() => match next {
                    Some(outcomes) => report.record(outcomes),
                    None => break,
                },
                _ = &mut deadline, if !deadline_hit => {
                    log::warn!("Run deadline reached, finishing in-flight writes");
                    deadline_hit = true;
                    stop.cancel();
                }
            }
        }

        let interrupted = if cancel.is_cancelled() {
            Some(Interruption::Shutdown)
        } else if deadline_hit {
            Some(Interruption::Deadline)
        } else {
            None
        };
        report.finish(interrupted);
        report.log_summary();

        Ok(report)
    }

    /// Fetch and decode one reference, then fan out to every size.
    async fn process_reference(
        &self,
        reference: ImageReference,
        sizes: &[SizeSpec],
        stop: &CancellationToken,
    ) -> Vec<UnitOutcome> {
        if stop.is_cancelled() {
            return Vec::new();
        }

        let url = reference.source_url.clone();
        let fetched = tokio::select! {
            result = self.retry.run(&url, stop, || self.images.fetch_and_decode(&reference)) => result,
            _ = stop.cancelled() => {
                log::debug!("Abandoned download of {}", url);
                return Vec::new();
            }
        };

        let decoded = match fetched {
            Ok(decoded) => Arc::new(decoded),
            Err(AppError::Cancelled(_)) => return Vec::new(),
            Err(error) => {
                let failure = UnitFailure::reference(url, error);
                log::warn!("{}", failure);
                return vec![Err(failure)];
            }
        };
        log::debug!(
            "Decoded {} as '{}' ({}x{})",
            decoded.source_url,
            decoded.logical_name,
            decoded.raster.width(),
            decoded.raster.height()
        );

        let variants = sizes
            .iter()
            .map(|&size| self.process_size(Arc::clone(&decoded), size, stop));
        join_all(variants).await.into_iter().flatten().collect()
    }

    /// Resize, store, then index one size of a decoded image.
    ///
    /// The store must succeed before the index is touched.
    async fn process_size(
        &self,
        image: Arc<DecodedImage>,
        size: SizeSpec,
        stop: &CancellationToken,
    ) -> Option<UnitOutcome> {
        if stop.is_cancelled() {
            return None;
        }

        let name = stored_name(&image.logical_name, size);
        let fail = |stage: Stage, error: AppError| {
            let failure = UnitFailure::new(&image.source_url, Some(size), stage, error);
            log::warn!("{}", failure);
            Some(Err(failure))
        };

        let raster = Arc::clone(&image.raster);
        let quality = self.jpeg_quality;
        let bytes = match tokio::task::spawn_blocking(move || render_variant(&raster, size, quality))
            .await
        {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => return fail(Stage::Resize, AppError::encode(&name, e)),
            Err(e) => return fail(Stage::Resize, AppError::task(e)),
        };

        let address = match self
            .retry
            .run(&name, stop, || self.storage.store(&name, &bytes))
            .await
        {
            Ok(address) => address,
            Err(AppError::Cancelled(_)) => return None,
            Err(e) => return fail(Stage::Store, e),
        };

        let record = StoredImageRecord::new(name, address);
        match self
            .retry
            .run(&record.name, stop, || self.index.upsert(&record))
            .await
        {
            Ok(()) => {}
            // Stored but not indexed: the object stays invisible.
            Err(AppError::Cancelled(_)) => return None,
            Err(e) => return fail(Stage::Index, e),
        }

        log::debug!("Stored {} at {}", record.name, record.address);
        Some(Ok(record))
    }
}

async fn sleep_or_pending(deadline: Option<Duration>) {
    match deadline {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending::<()>().await,
    }
}

/// Warn about manifest entries that map onto the same stored names.
fn warn_duplicate_names(references: &[ImageReference]) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for name in references.iter().filter_map(|r| r.logical_name().ok()) {
        *seen.entry(name).or_default() += 1;
    }
    for (name, count) in seen.into_iter().filter(|(_, count)| *count > 1) {
        log::warn!(
            "{} manifest entries share the name '{}'; the last one stored wins",
            count,
            name
        );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::index::JsonIndex;
    use crate::services::resize::decode_jpeg;
    use crate::storage::LocalStorage;
    use crate::utils::testing::{ImageHost, jpeg_bytes};

    struct Fixture {
        _tmp: TempDir,
        storage: Arc<LocalStorage>,
        index: Arc<JsonIndex>,
        pipeline: Pipeline,
    }

    async fn fixture(config: PipelineConfig) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(
            tmp.path().join("skyhub"),
            "http://localhost:7366/skyhub",
        ));
        let index = Arc::new(JsonIndex::open(tmp.path().join("index.json")).await.unwrap());
        let pipeline = Pipeline::new(&config, Client::new(), storage.clone(), index.clone())
            .with_retry(RetryPolicy::none());
        Fixture {
            _tmp: tmp,
            storage,
            index,
            pipeline,
        }
    }

    fn sample_files(n: usize) -> Vec<(String, Vec<u8>)> {
        (0..n)
            .map(|i| (format!("plane_{i}.jpg"), jpeg_bytes(200 + i as u32 * 10, 150)))
            .collect()
    }

    async fn host(files: &[(String, Vec<u8>)], extra: Vec<String>) -> ImageHost {
        let files = files.iter().map(|(f, b)| (f.as_str(), b.clone())).collect();
        ImageHost::start(files, extra).await
    }

    #[tokio::test]
    async fn test_full_run_fans_out_three_records_per_image() {
        let fx = fixture(PipelineConfig::default()).await;
        let host = host(&sample_files(4), vec![]).await;

        let report = fx
            .pipeline
            .run(&host.manifest_url(), &SizeSpec::ALL, &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(report.succeeded(), 12);
        let all = fx.index.find_all().await.unwrap();
        assert_eq!(all.len(), 12);
        assert!(all.iter().any(|r| r.name == "plane_0_320x240.jpg"
            && r.address == "http://localhost:7366/skyhub/plane_0_320x240.jpg"));
    }

    #[tokio::test]
    async fn test_stored_variants_have_exact_dimensions() {
        let fx = fixture(PipelineConfig::default()).await;
        let host = host(&sample_files(1), vec![]).await;

        fx.pipeline
            .run(&host.manifest_url(), &SizeSpec::ALL, &CancellationToken::new())
            .await
            .unwrap();

        for size in SizeSpec::ALL {
            let bytes = fx
                .storage
                .read(&stored_name("plane_0", size))
                .await
                .unwrap()
                .unwrap();
            let stored = decode_jpeg(&bytes).unwrap();
            assert_eq!((stored.width(), stored.height()), size.dimensions());
        }
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let fx = fixture(PipelineConfig::default()).await;
        let host = host(&sample_files(3), vec![]).await;
        let cancel = CancellationToken::new();

        fx.pipeline
            .run(&host.manifest_url(), &SizeSpec::ALL, &cancel)
            .await
            .unwrap();
        let first = fx.index.find_all().await.unwrap();

        fx.pipeline
            .run(&host.manifest_url(), &SizeSpec::ALL, &cancel)
            .await
            .unwrap();
        let second = fx.index.find_all().await.unwrap();

        assert_eq!(first.len(), 9);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_one_bad_image_does_not_stop_the_batch() {
        let fx = fixture(PipelineConfig::default()).await;
        let mut files = sample_files(3);
        files.push(("corrupt.jpg".to_string(), b"garbage".to_vec()));
        let host = host(&files, vec![]).await;

        let report = fx
            .pipeline
            .run(&host.manifest_url(), &SizeSpec::ALL, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.references, 4);
        assert_eq!(report.succeeded(), 9);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failed(), 3);
        assert_eq!(report.cancelled, 0);

        let failure = &report.failures[0];
        assert_eq!(failure.source_url, host.url("images/corrupt.jpg"));
        assert_eq!(failure.stage, Stage::Decode);
        assert!(failure.size.is_none());
        assert_eq!(fx.index.find_all().await.unwrap().len(), 9);
    }

    #[tokio::test]
    async fn test_bad_names_and_missing_images_are_isolated() {
        let fx = fixture(PipelineConfig::default()).await;
        let files = sample_files(2);
        let other_host = host(&[], vec![]).await;
        let host = host(
            &files,
            vec![
                other_host.url("images/no_extension"),
                other_host.url("images/missing.jpg"),
            ],
        )
        .await;

        let report = fx
            .pipeline
            .run(&host.manifest_url(), &SizeSpec::ALL, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.succeeded(), 6);
        let stages: HashSet<Stage> = report.failures.iter().map(|f| f.stage).collect();
        assert_eq!(stages, HashSet::from([Stage::Name, Stage::Fetch]));
    }

    #[tokio::test]
    async fn test_manifest_failure_aborts_run() {
        let fx = fixture(PipelineConfig::default()).await;
        let host = host(&[], vec![]).await;

        let err = fx
            .pipeline
            .run(&host.url("broken.json"), &SizeSpec::ALL, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse { .. }));

        let err = fx
            .pipeline
            .run("http://127.0.0.1:1/images.json", &SizeSpec::ALL, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Transport { .. }));
        assert!(fx.index.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_manifest() {
        let fx = fixture(PipelineConfig::default()).await;
        let host = host(&[], vec![]).await;

        let report = fx
            .pipeline
            .run(&host.manifest_url(), &SizeSpec::ALL, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.references, 0);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_cancelled_run_records_nothing_new() {
        let fx = fixture(PipelineConfig::default()).await;
        let host = host(&sample_files(2), vec![]).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fx
            .pipeline
            .run(&host.manifest_url(), &SizeSpec::ALL, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled(_)));
        assert!(fx.index.find_all().await.unwrap().is_empty());
    }

    /// Storage that fails every write for one size.
    struct FlakyStorage {
        inner: LocalStorage,
        failing_suffix: &'static str,
    }

    #[async_trait]
    impl ImageStorage for FlakyStorage {
        async fn store(&self, name: &str, bytes: &[u8]) -> Result<String> {
            if name.ends_with(self.failing_suffix) {
                return Err(AppError::storage_write(name, "disk full"));
            }
            self.inner.store(name, bytes).await
        }

        async fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
            self.inner.read(name).await
        }

        fn address(&self, name: &str) -> String {
            self.inner.address(name)
        }
    }

    /// Index that records, at upsert time, whether the object already exists.
    struct CheckingIndex {
        storage: Arc<dyn ImageStorage>,
        inner: JsonIndex,
        missing_at_upsert: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageIndex for CheckingIndex {
        async fn upsert(&self, record: &StoredImageRecord) -> Result<()> {
            if self.storage.read(&record.name).await?.is_none() {
                self.missing_at_upsert
                    .lock()
                    .unwrap()
                    .push(record.name.clone());
            }
            self.inner.upsert(record).await
        }

        async fn find_all(&self) -> Result<Vec<StoredImageRecord>> {
            self.inner.find_all().await
        }

        async fn get(&self, name: &str) -> Result<Option<StoredImageRecord>> {
            self.inner.get(name).await
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_per_size_and_never_indexed() {
        let tmp = TempDir::new().unwrap();
        let storage: Arc<dyn ImageStorage> = Arc::new(FlakyStorage {
            inner: LocalStorage::new(tmp.path().join("skyhub"), "http://h/skyhub"),
            failing_suffix: "_640x480.jpg",
        });
        let index = Arc::new(CheckingIndex {
            storage: storage.clone(),
            inner: JsonIndex::open(tmp.path().join("index.json")).await.unwrap(),
            missing_at_upsert: Mutex::new(Vec::new()),
        });
        let pipeline = Pipeline::new(
            &PipelineConfig::default(),
            Client::new(),
            storage,
            index.clone(),
        )
        .with_retry(RetryPolicy::none());
        let host = host(&sample_files(3), vec![]).await;

        let report = pipeline
            .run(&host.manifest_url(), &SizeSpec::ALL, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.succeeded(), 6);
        assert_eq!(report.failed(), 3);
        assert!(report.failures.iter().all(|f| f.stage == Stage::Store
            && f.size == Some(SizeSpec::Large)));

        let indexed = index.find_all().await.unwrap();
        assert_eq!(indexed.len(), 6);
        assert!(indexed.iter().all(|r| !r.name.ends_with("_640x480.jpg")));
        assert!(index.missing_at_upsert.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deadline_stops_run_and_keeps_completed_units() {
        let config = PipelineConfig {
            max_concurrent: 1,
            deadline_secs: Some(1),
            ..PipelineConfig::default()
        };
        let fx = fixture(config).await;

        // A host that accepts connections but never answers image requests.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let stall = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let files = sample_files(1);
        let host = host(&files, vec![format!("{stall}/images/stuck.jpg")]).await;

        let report = fx
            .pipeline
            .run(&host.manifest_url(), &SizeSpec::ALL, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.interrupted, Some(Interruption::Deadline));
        assert!(report.failures.is_empty());
        assert_eq!(report.succeeded() + report.cancelled, 6);
        assert_eq!(
            fx.index.find_all().await.unwrap().len(),
            report.succeeded()
        );
    }

    /// Index that refuses every upsert for one size.
    struct RefusingIndex {
        inner: JsonIndex,
        refused_suffix: &'static str,
    }

    #[async_trait]
    impl ImageIndex for RefusingIndex {
        async fn upsert(&self, record: &StoredImageRecord) -> Result<()> {
            if record.name.ends_with(self.refused_suffix) {
                return Err(AppError::index_write(&record.name, "read-only"));
            }
            self.inner.upsert(record).await
        }

        async fn find_all(&self) -> Result<Vec<StoredImageRecord>> {
            self.inner.find_all().await
        }

        async fn get(&self, name: &str) -> Result<Option<StoredImageRecord>> {
            self.inner.get(name).await
        }
    }

    #[tokio::test]
    async fn test_upsert_failure_is_per_size() {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(tmp.path().join("skyhub"), "http://h/skyhub"));
        let index = Arc::new(RefusingIndex {
            inner: JsonIndex::open(tmp.path().join("index.json")).await.unwrap(),
            refused_suffix: "_384x288.jpg",
        });
        let pipeline = Pipeline::new(
            &PipelineConfig::default(),
            Client::new(),
            storage,
            index.clone(),
        )
        .with_retry(RetryPolicy::none());
        let host = host(&sample_files(3), vec![]).await;

        let report = pipeline
            .run(&host.manifest_url(), &SizeSpec::ALL, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.succeeded(), 6);
        assert_eq!(report.failed(), 3);
        assert!(report.failures.iter().all(|f| f.stage == Stage::Index
            && f.size == Some(SizeSpec::Medium)));

        let indexed = index.find_all().await.unwrap();
        assert_eq!(indexed.len(), 6);
        assert!(indexed.iter().all(|r| !r.name.ends_with("_384x288.jpg")));
    }

    /// Index that fires the shutdown token once its first record is written.
    struct ShutdownAfterFirstUpsert {
        inner: JsonIndex,
        shutdown: CancellationToken,
    }

    #[async_trait]
    impl ImageIndex for ShutdownAfterFirstUpsert {
        async fn upsert(&self, record: &StoredImageRecord) -> Result<()> {
            self.inner.upsert(record).await?;
            self.shutdown.cancel();
            Ok(())
        }

        async fn find_all(&self) -> Result<Vec<StoredImageRecord>> {
            self.inner.find_all().await
        }

        async fn get(&self, name: &str) -> Result<Option<StoredImageRecord>> {
            self.inner.get(name).await
        }
    }

    #[tokio::test]
    async fn test_shutdown_mid_run_keeps_completed_units() {
        let tmp = TempDir::new().unwrap();
        let shutdown = CancellationToken::new();
        let storage = Arc::new(LocalStorage::new(tmp.path().join("skyhub"), "http://h/skyhub"));
        let index = Arc::new(ShutdownAfterFirstUpsert {
            inner: JsonIndex::open(tmp.path().join("index.json")).await.unwrap(),
            shutdown: shutdown.clone(),
        });
        let config = PipelineConfig {
            max_concurrent: 1,
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(&config, Client::new(), storage, index.clone())
            .with_retry(RetryPolicy::none());
        let host = host(&sample_files(4), vec![]).await;

        let report = pipeline
            .run(&host.manifest_url(), &SizeSpec::ALL, &shutdown)
            .await
            .unwrap();

        assert_eq!(report.interrupted, Some(Interruption::Shutdown));
        assert!(report.failures.is_empty());
        // Only the reference in flight when the token fired can finish.
        assert!((1..=3).contains(&report.succeeded()));
        assert_eq!(report.succeeded() + report.cancelled, 12);
        assert_eq!(index.find_all().await.unwrap().len(), report.succeeded());
    }

    /// Storage whose writes always fail and fire the shutdown token.
    struct ShutdownOnStore {
        inner: LocalStorage,
        shutdown: CancellationToken,
    }

    #[async_trait]
    impl ImageStorage for ShutdownOnStore {
        async fn store(&self, name: &str, _bytes: &[u8]) -> Result<String> {
            self.shutdown.cancel();
            Err(AppError::storage_write(name, "disk full"))
        }

        async fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
            self.inner.read(name).await
        }

        fn address(&self, name: &str) -> String {
            self.inner.address(name)
        }
    }

    #[tokio::test]
    async fn test_shutdown_during_retry_backoff_counts_as_cancelled() {
        let tmp = TempDir::new().unwrap();
        let shutdown = CancellationToken::new();
        let storage = Arc::new(ShutdownOnStore {
            inner: LocalStorage::new(tmp.path().join("skyhub"), "http://h/skyhub"),
            shutdown: shutdown.clone(),
        });
        let index = Arc::new(JsonIndex::open(tmp.path().join("index.json")).await.unwrap());
        let pipeline = Pipeline::new(
            &PipelineConfig::default(),
            Client::new(),
            storage,
            index.clone(),
        )
        .with_retry(RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_secs(60),
        });
        let host = host(&sample_files(1), vec![]).await;

        let report = pipeline
            .run(&host.manifest_url(), &SizeSpec::ALL, &shutdown)
            .await
            .unwrap();

        assert_eq!(report.interrupted, Some(Interruption::Shutdown));
        assert!(report.failures.is_empty());
        assert_eq!(report.succeeded(), 0);
        assert_eq!(report.cancelled, 3);
        assert!(index.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_every_indexed_address_is_served() {
        use axum::body::Body;
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        use crate::server::{AppState, router};

        let fx = fixture(PipelineConfig::default()).await;
        let files = vec![
            ("my pic.jpg".to_string(), jpeg_bytes(200, 150)),
            ("b737_3.jpg".to_string(), jpeg_bytes(120, 90)),
        ];
        let host = host(&files, vec![]).await;

        let report = fx
            .pipeline
            .run(&host.manifest_url(), &SizeSpec::ALL, &CancellationToken::new())
            .await
            .unwrap();
        assert!(report.is_clean());

        let app = router(
            "skyhub",
            AppState::new(fx.index.clone(), fx.storage.clone()),
        );
        let records = fx.index.find_all().await.unwrap();
        assert_eq!(records.len(), 6);
        for record in records {
            let path = url::Url::parse(&record.address).unwrap().path().to_string();
            let response = app
                .clone()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", record.address);
        }
    }
}
