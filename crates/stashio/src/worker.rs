//! # Cache Worker
//!
//! The assembled offline caching worker: lifecycle, fetch interception and
//! the retrieval strategies behind one interface. A test harness (or an
//! embedding application) drives the same three entry points a deployment
//! does: [`CacheWorker::on_install`], [`CacheWorker::on_activate`] and
//! [`CacheWorker::on_fetch`].

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{CacheKey, CacheRegistry};
use crate::client::{HttpFetcher, RemoteFetch};
use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::http::{HttpRequest, HttpResponse};
use crate::lifecycle::{ClientPool, WorkerState};
use crate::strategy;
use crate::sync::SyncRegistry;

/// How the interceptor routes a GET request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Static asset, served cache-first.
    Asset,
    /// Dynamic/API content, served network-first.
    Api,
}

/// Classify a GET request by URL shape.
///
/// A stateless substring test against the URL path. An asset whose path
/// happens to contain the marker segment is misrouted network-first; the
/// marker is configurable to work around such layouts.
pub fn classify(url: &Url, api_marker: &str) -> RouteClass {
    if url.path().contains(api_marker) {
        RouteClass::Api
    } else {
        RouteClass::Asset
    }
}

/// Offline caching worker, generic over its network seam.
pub struct CacheWorker<F> {
    config: WorkerConfig,
    fetcher: F,
    registry: CacheRegistry,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
    clients: ClientPool,
    sync: SyncRegistry,
}

impl CacheWorker<HttpFetcher> {
    /// Create a worker with the production HTTP fetcher.
    pub async fn new(config: WorkerConfig) -> Result<Self, WorkerError> {
        let fetcher = HttpFetcher::new(&config)?;
        Self::with_fetcher(config, fetcher).await
    }
}

impl<F> CacheWorker<F>
where
    F: RemoteFetch,
{
    /// Create a worker over a custom network seam.
    pub async fn with_fetcher(config: WorkerConfig, fetcher: F) -> Result<Self, WorkerError> {
        let registry = CacheRegistry::new(config.cache_config.clone()).await?;

        Ok(Self {
            config,
            fetcher,
            registry,
            state: RwLock::new(WorkerState::Installing),
            skip_waiting: AtomicBool::new(false),
            clients: ClientPool::new(),
            sync: SyncRegistry::new(),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        *self.state.read()
    }

    /// Whether this version asked to take over without waiting for the
    /// superseded version to finish.
    pub fn skips_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn registry(&self) -> &CacheRegistry {
        &self.registry
    }

    pub fn clients(&self) -> &ClientPool {
        &self.clients
    }

    pub fn sync(&self) -> &SyncRegistry {
        &self.sync
    }

    /// Resolve a manifest entry, joining relative URLs onto the configured
    /// origin.
    fn resolve_manifest_url(&self, raw: &str) -> Result<Url, WorkerError> {
        match Url::parse(raw) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let origin = self.config.origin.as_ref().ok_or_else(|| {
                    WorkerError::UrlError(format!(
                        "relative manifest URL {raw} requires a configured origin"
                    ))
                })?;
                origin
                    .join(raw)
                    .map_err(|e| WorkerError::UrlError(format!("{raw}: {e}")))
            }
            Err(e) => Err(WorkerError::UrlError(format!("{raw}: {e}"))),
        }
    }

    /// Install this worker version: precache the whole manifest into the
    /// static partition.
    ///
    /// All-or-nothing: every manifest URL is fetched before anything is
    /// stored, so a failed or non-200 fetch propagates an error, leaves the
    /// static partition untouched, and keeps this version from activating.
    /// The previously active version continues serving.
    pub async fn on_install(&self) -> Result<(), WorkerError> {
        info!(
            version = %self.config.version,
            assets = self.config.precache_manifest.len(),
            "Installing"
        );

        let mut fetched = Vec::with_capacity(self.config.precache_manifest.len());
        for raw in &self.config.precache_manifest {
            let url = self.resolve_manifest_url(raw)?;
            let request = HttpRequest::from_url(reqwest::Method::GET, url);

            let response = self.fetcher.fetch(&request).await.map_err(|e| {
                WorkerError::InstallError {
                    url: raw.clone(),
                    reason: e.to_string(),
                }
            })?;

            if !response.is_cacheable() {
                return Err(WorkerError::install_status(raw.clone(), response.status));
            }

            fetched.push((CacheKey::new(request.method(), request.url()), response));
        }

        let partition = self.config.static_partition();
        self.registry.open(&partition).await?;
        for (key, response) in fetched {
            // Precached assets never expire; they are purged wholesale when
            // a new version activates.
            self.registry
                .put_response(&partition, key, &response, None)
                .await?;
        }

        self.state.write().advance(WorkerState::Installed)?;
        self.skip_waiting.store(true, Ordering::Relaxed);
        info!(version = %self.config.version, partition = %partition, "Installed");
        Ok(())
    }

    /// Activate this worker version: purge every partition outside the
    /// allow-list, then claim all open clients.
    ///
    /// A failed partition deletion is logged and skipped; activation
    /// proceeds regardless.
    pub async fn on_activate(&self) -> Result<(), WorkerError> {
        self.state.write().advance(WorkerState::Activating)?;

        let allowed = self.config.allowed_partitions();
        for partition in self.registry.list().await? {
            if allowed.iter().any(|name| *name == partition) {
                continue;
            }

            match self.registry.delete(&partition).await {
                Ok(true) => info!(partition = %partition, "Purged stale partition"),
                Ok(false) => {}
                Err(e) => {
                    warn!(partition = %partition, error = %e, "Failed to purge stale partition")
                }
            }
        }

        let claimed = self.clients.claim(&self.config.version);
        self.state.write().advance(WorkerState::Active)?;
        info!(version = %self.config.version, clients = claimed, "Activated");
        Ok(())
    }

    /// Handle one intercepted request.
    ///
    /// Non-GET requests pass straight through to the network with no cache
    /// lookup or write, and their transport errors propagate untouched.
    /// Every GET resolves to a response: degraded conditions surface as the
    /// fixed synthetic payloads instead of errors.
    pub async fn on_fetch(&self, request: &HttpRequest) -> Result<HttpResponse, WorkerError> {
        if !request.is_get() {
            debug!(
                method = %request.method(),
                url = %request.url(),
                "Passing through non-GET request"
            );
            return self.fetcher.fetch(request).await;
        }

        let dynamic = self.config.dynamic_partition();
        let ttl = self.config.cache_config.dynamic_ttl;

        let response = match classify(request.url(), &self.config.api_marker) {
            RouteClass::Api => {
                strategy::network_first(&self.fetcher, &self.registry, request, &dynamic, ttl)
                    .await
            }
            RouteClass::Asset => {
                strategy::cache_first(&self.fetcher, &self.registry, request, &dynamic, ttl).await
            }
        };

        Ok(response)
    }

    /// Register a background sync tag on this worker.
    pub fn register_sync(&self, tag: impl Into<String>) {
        self.sync.register(tag);
    }

    /// Dispatch a background sync event.
    pub async fn on_sync(&self, tag: &str) -> Result<bool, WorkerError> {
        self.sync.dispatch(tag).await
    }
}
