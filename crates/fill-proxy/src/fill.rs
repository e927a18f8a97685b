//! Fill orchestration: index lookup, upstream fetch, transform, persist
//!
//! A request first consults the in-memory index. A hit is answered from the
//! blob store; a miss fetches the source, resizes it off the async runtime,
//! persists the result and only then records it in the index, so the index
//! never names a blob whose write failed.

use crate::error::FillError;
use crate::request::FillRequest;
use crate::transform::ImageTransform;
use crate::types::{FillStats, IndexStats};
use async_trait::async_trait;
use axum::http::HeaderMap;
use blob_store::{BlobStore, StoreError};
use bounded_fetch::{BoundedFetcher, FetchError};
use lru_index::CacheIndex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

/// Source of upstream image bytes
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn fetch(&self, url: &Url, headers: &HeaderMap) -> Result<Vec<u8>, FetchError>;
}

#[async_trait]
impl Upstream for BoundedFetcher {
    async fn fetch(&self, url: &Url, headers: &HeaderMap) -> Result<Vec<u8>, FetchError> {
        BoundedFetcher::fetch(self, url, headers).await
    }
}

/// Result of a successful fill
#[derive(Debug)]
pub struct FillOutcome {
    pub body: Vec<u8>,
    pub filename: String,
    pub served_from_cache: bool,
}

/// Answers fill requests from the cache or by fetching and resizing
pub struct FillOrchestrator {
    /// Canonical cache key -> on-disk filename
    index: CacheIndex<String, String>,
    store: BlobStore,
    upstream: Arc<dyn Upstream>,
    transform: Arc<dyn ImageTransform>,
    upstream_scheme: String,
    hits: AtomicU64,
    misses: AtomicU64,
    fills: AtomicU64,
    persist_failures: AtomicU64,
}

impl FillOrchestrator {
    pub fn new(
        capacity: usize,
        store: BlobStore,
        upstream: Arc<dyn Upstream>,
        transform: Arc<dyn ImageTransform>,
    ) -> Self {
        Self {
            index: CacheIndex::new(capacity),
            store,
            upstream,
            transform,
            upstream_scheme: "http".to_string(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            fills: AtomicU64::new(0),
            persist_failures: AtomicU64::new(0),
        }
    }

    /// Scheme used to reach upstream hosts (`http` by default)
    pub fn with_upstream_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.upstream_scheme = scheme.into();
        self
    }

    pub fn store(&self) -> &BlobStore {
        &self.store
    }

    /// Serve `fingerprint`, forwarding `headers` upstream on a cache miss
    pub async fn fill(
        &self,
        fingerprint: &str,
        headers: &HeaderMap,
    ) -> Result<FillOutcome, FillError> {
        let request = FillRequest::parse(fingerprint)?;
        let key = request.cache_key();

        if let Some(filename) = self.index.get(&key) {
            return self.serve_cached(&key, filename).await;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let url = request.upstream_url(&self.upstream_scheme)?;
        let source = self.upstream.fetch(&url, headers).await.map_err(|e| {
            warn!(url = %url, error = %e, "Upstream fetch failed");
            FillError::from(e)
        })?;

        let body = self.resize(source, request.width, request.height).await?;
        let filename = request.filename().to_string();

        match self.store.persist(&filename, &body).await {
            Ok(outcome) => {
                self.index.set(key, filename.clone());
                if outcome.wrote() {
                    debug!(filename = %filename, outcome = ?outcome, "Cached filled image");
                } else {
                    debug!(filename = %filename, "Filled image already on disk");
                }
            }
            Err(e) => {
                self.persist_failures.fetch_add(1, Ordering::Relaxed);
                warn!(filename = %filename, error = %e, "Failed to save file, serving uncached");
            }
        }

        self.fills.fetch_add(1, Ordering::Relaxed);
        info!(source = %request.source(), size = body.len(), "Image filled");

        Ok(FillOutcome {
            body,
            filename,
            served_from_cache: false,
        })
    }

    async fn serve_cached(&self, key: &str, filename: String) -> Result<FillOutcome, FillError> {
        match self.store.read(&filename).await {
            Ok(body) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                info!(filename = %filename, "Image served from cache");
                Ok(FillOutcome {
                    body,
                    filename,
                    served_from_cache: true,
                })
            }
            Err(e) => {
                // Drop the dangling entry so the next request refills it
                self.index.remove(&key.to_string());
                if e.is_not_found() {
                    warn!(filename = %filename, "Cached blob missing from disk");
                } else {
                    error!(filename = %filename, error = %e, "Cached blob unreadable");
                }
                Err(FillError::Disk(e))
            }
        }
    }

    async fn resize(
        &self,
        source: Vec<u8>,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, FillError> {
        let transform = Arc::clone(&self.transform);
        let resized = tokio::task::spawn_blocking(move || transform.fill(&source, width, height))
            .await
            .map_err(|e| FillError::Internal(format!("transform task failed: {}", e)))?;
        Ok(resized?)
    }

    /// Forget every cached mapping and remove the storage root
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.index.clear();
        self.store.wipe().await
    }

    pub fn index_stats(&self) -> IndexStats {
        IndexStats {
            entries: self.index.len(),
            capacity: self.index.capacity(),
        }
    }

    pub fn stats(&self) -> FillStats {
        FillStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fills: self.fills.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::transform::{sample_jpeg, LanczosFill};
    use image::GenericImageView;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Upstream double that serves fixed bytes and records every call
    pub(crate) struct FakeUpstream {
        response: Result<Vec<u8>, fn() -> FetchError>,
        pub(crate) calls: Mutex<Vec<(String, HeaderMap)>>,
    }

    impl FakeUpstream {
        pub(crate) fn serving(bytes: Vec<u8>) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(bytes),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn failing(make_error: fn() -> FetchError) -> Arc<Self> {
            Arc::new(Self {
                response: Err(make_error),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Upstream for FakeUpstream {
        async fn fetch(&self, url: &Url, headers: &HeaderMap) -> Result<Vec<u8>, FetchError> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), headers.clone()));
            match &self.response {
                Ok(bytes) => Ok(bytes.clone()),
                Err(make_error) => Err(make_error()),
            }
        }
    }

    pub(crate) async fn orchestrator(
        root: &Path,
        capacity: usize,
        upstream: Arc<FakeUpstream>,
    ) -> FillOrchestrator {
        let store = BlobStore::new(root.join("storage"));
        store.init().await.unwrap();
        FillOrchestrator::new(capacity, store, upstream, Arc::new(LanczosFill::default()))
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let dir = tempdir().unwrap();
        let upstream = FakeUpstream::serving(sample_jpeg(400, 300));
        let orchestrator = orchestrator(dir.path(), 10, upstream.clone()).await;

        let first = orchestrator
            .fill("fill/100/50/example.com/cat.jpg", &HeaderMap::new())
            .await
            .unwrap();
        assert!(!first.served_from_cache);
        assert_eq!(first.filename, "100_50_cat.jpg");
        assert_eq!(upstream.call_count(), 1);
        assert_eq!(
            upstream.calls.lock().unwrap()[0].0,
            "http://example.com/cat.jpg"
        );

        let on_disk = orchestrator.store().read("100_50_cat.jpg").await.unwrap();
        assert_eq!(on_disk, first.body);

        let second = orchestrator
            .fill("fill/100/50/example.com/cat.jpg", &HeaderMap::new())
            .await
            .unwrap();
        assert!(second.served_from_cache);
        assert_eq!(second.body, first.body);
        assert_eq!(upstream.call_count(), 1);

        let stats = orchestrator.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.fills, 1);
    }

    #[tokio::test]
    async fn test_filled_image_has_requested_size() {
        let dir = tempdir().unwrap();
        let upstream = FakeUpstream::serving(sample_jpeg(300, 300));
        let orchestrator = orchestrator(dir.path(), 10, upstream).await;

        let outcome = orchestrator
            .fill("fill/120/40/example.com/square.jpg", &HeaderMap::new())
            .await
            .unwrap();
        let decoded = image::load_from_memory(&outcome.body).unwrap();
        assert_eq!(decoded.dimensions(), (120, 40));
    }

    #[tokio::test]
    async fn test_headers_are_forwarded() {
        let dir = tempdir().unwrap();
        let upstream = FakeUpstream::serving(sample_jpeg(64, 64));
        let orchestrator = orchestrator(dir.path(), 10, upstream.clone()).await;

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer abc".parse().unwrap());
        headers.insert("x-request-id", "42".parse().unwrap());

        orchestrator
            .fill("fill/10/10/example.com/a.jpg", &headers)
            .await
            .unwrap();

        let calls = upstream.calls.lock().unwrap();
        assert_eq!(calls[0].1, headers);
    }

    #[tokio::test]
    async fn test_bad_parameters_skip_upstream() {
        let dir = tempdir().unwrap();
        let upstream = FakeUpstream::serving(sample_jpeg(64, 64));
        let orchestrator = orchestrator(dir.path(), 10, upstream.clone()).await;

        let err = orchestrator
            .fill("fill/wide/50/example.com/cat.jpg", &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FillError::Parameter(_)));
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn test_upstream_rejection_is_not_cached() {
        let dir = tempdir().unwrap();
        let upstream = FakeUpstream::failing(|| FetchError::UnsupportedMedia("text/html".into()));
        let orchestrator = orchestrator(dir.path(), 10, upstream.clone()).await;

        for _ in 0..2 {
            let err = orchestrator
                .fill("fill/100/50/example.com/page.jpg", &HeaderMap::new())
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                FillError::Fetch(FetchError::UnsupportedMedia(_))
            ));
        }
        assert_eq!(upstream.call_count(), 2);
        assert_eq!(orchestrator.index_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_undecodable_source() {
        let dir = tempdir().unwrap();
        let upstream = FakeUpstream::serving(b"definitely not a jpeg".to_vec());
        let orchestrator = orchestrator(dir.path(), 10, upstream).await;

        let err = orchestrator
            .fill("fill/100/50/example.com/cat.jpg", &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FillError::Decode(_)));
        assert_eq!(orchestrator.index_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_persist_failure_still_serves_image() {
        let dir = tempdir().unwrap();
        let upstream = FakeUpstream::serving(sample_jpeg(64, 64));
        // Storage root never created, so every persist fails
        let store = BlobStore::new(dir.path().join("missing"));
        let orchestrator = FillOrchestrator::new(
            10,
            store,
            upstream.clone(),
            Arc::new(LanczosFill::default()),
        );

        let outcome = orchestrator
            .fill("fill/32/32/example.com/cat.jpg", &HeaderMap::new())
            .await
            .unwrap();
        assert!(!outcome.body.is_empty());
        assert_eq!(orchestrator.stats().persist_failures, 1);
        assert_eq!(orchestrator.index_stats().entries, 0);

        // Nothing was cached, so the next request goes upstream again
        orchestrator
            .fill("fill/32/32/example.com/cat.jpg", &HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(upstream.call_count(), 2);
    }

    #[tokio::test]
    async fn test_missing_blob_surfaces_disk_error() {
        let dir = tempdir().unwrap();
        let upstream = FakeUpstream::serving(sample_jpeg(64, 64));
        let orchestrator = orchestrator(dir.path(), 10, upstream.clone()).await;

        orchestrator
            .fill("fill/20/20/example.com/cat.jpg", &HeaderMap::new())
            .await
            .unwrap();
        std::fs::remove_file(orchestrator.store().root().join("20_20_cat.jpg")).unwrap();

        let err = orchestrator
            .fill("fill/20/20/example.com/cat.jpg", &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FillError::Disk(_)));
        assert_eq!(orchestrator.index_stats().entries, 0);

        // The dangling entry is gone; the next request refills from upstream
        let outcome = orchestrator
            .fill("fill/20/20/example.com/cat.jpg", &HeaderMap::new())
            .await
            .unwrap();
        assert!(!outcome.served_from_cache);
        assert_eq!(upstream.call_count(), 2);
    }

    #[tokio::test]
    async fn test_shared_filename_is_written_once() {
        let dir = tempdir().unwrap();
        let upstream = FakeUpstream::serving(sample_jpeg(200, 100));
        let orchestrator = orchestrator(dir.path(), 10, upstream.clone()).await;

        orchestrator
            .fill("fill/50/25/one.example/cat.jpg", &HeaderMap::new())
            .await
            .unwrap();
        orchestrator
            .fill("fill/50/25/two.example/img/cat.jpg", &HeaderMap::new())
            .await
            .unwrap();

        // Different keys, same derived filename and identical bytes
        assert_eq!(upstream.call_count(), 2);
        assert_eq!(orchestrator.index_stats().entries, 2);
        let store_stats = orchestrator.store().stats();
        assert_eq!(store_stats.writes, 1);
        assert_eq!(store_stats.deduplicated, 1);
    }

    #[tokio::test]
    async fn test_index_evicts_least_recent() {
        let dir = tempdir().unwrap();
        let upstream = FakeUpstream::serving(sample_jpeg(64, 64));
        let orchestrator = orchestrator(dir.path(), 2, upstream.clone()).await;
        let headers = HeaderMap::new();

        orchestrator.fill("fill/10/10/h/a.jpg", &headers).await.unwrap();
        orchestrator.fill("fill/10/10/h/b.jpg", &headers).await.unwrap();
        // Touch a so b becomes the eviction victim
        orchestrator.fill("fill/10/10/h/a.jpg", &headers).await.unwrap();
        orchestrator.fill("fill/10/10/h/c.jpg", &headers).await.unwrap();
        assert_eq!(upstream.call_count(), 3);

        assert!(orchestrator.fill("fill/10/10/h/a.jpg", &headers).await.unwrap().served_from_cache);
        assert!(!orchestrator.fill("fill/10/10/h/b.jpg", &headers).await.unwrap().served_from_cache);
        assert_eq!(upstream.call_count(), 4);
        assert_eq!(orchestrator.index_stats().entries, 2);
    }

    #[tokio::test]
    async fn test_reset_clears_index_and_storage() {
        let dir = tempdir().unwrap();
        let upstream = FakeUpstream::serving(sample_jpeg(64, 64));
        let orchestrator = orchestrator(dir.path(), 10, upstream).await;

        orchestrator
            .fill("fill/10/10/example.com/cat.jpg", &HeaderMap::new())
            .await
            .unwrap();
        orchestrator.reset().await.unwrap();

        assert_eq!(orchestrator.index_stats().entries, 0);
        assert_eq!(orchestrator.index_stats().capacity, 10);
        assert!(!orchestrator.store().root().exists());
    }
}
