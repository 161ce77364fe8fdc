//! # Retrieval Strategies
//!
//! Cache-first and network-first retrieval over the cache registry and the
//! network seam. Both strategies always resolve to a response: degraded
//! network conditions surface as the fixed synthetic payloads, never as an
//! error the caller has to handle.

use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{CacheKey, CacheRegistry, CacheStatus};
use crate::client::RemoteFetch;
use crate::http::{HttpRequest, HttpResponse};

/// Serve preferring the cache.
///
/// A fresh cached copy in any partition is returned without touching the
/// network. On a miss the request is fetched; a 200 is stored into
/// `dynamic_partition` before the live response is returned, so the cache
/// reflects exactly what was served. A transport error resolves to the
/// synthetic 503 fallback.
pub async fn cache_first<F: RemoteFetch>(
    fetcher: &F,
    registry: &CacheRegistry,
    request: &HttpRequest,
    dynamic_partition: &str,
    ttl: Duration,
) -> HttpResponse {
    let key = CacheKey::new(request.method(), request.url());

    match registry.match_response(&key).await {
        Ok(Some((cached, CacheStatus::Hit))) => {
            debug!(url = %request.url(), "Cache-first hit");
            return cached;
        }
        Ok(Some((_, CacheStatus::Expired))) => {
            debug!(url = %request.url(), "Cache-first entry expired, refetching");
        }
        Ok(None) => {}
        Err(e) => {
            warn!(url = %request.url(), error = %e, "Cache lookup failed, falling back to network");
        }
    }

    match fetcher.fetch(request).await {
        Ok(response) => {
            store_if_cacheable(registry, key, &response, dynamic_partition, ttl).await;
            response
        }
        Err(e) => {
            debug!(url = %request.url(), error = %e, "Cache-first fetch failed, serving offline fallback");
            HttpResponse::offline_fallback()
        }
    }
}

/// Serve preferring the network.
///
/// The fetch is always attempted first and a live response of any status
/// is returned; only a transport error falls back to a cached copy (stale
/// allowed), then to the synthetic 408.
pub async fn network_first<F: RemoteFetch>(
    fetcher: &F,
    registry: &CacheRegistry,
    request: &HttpRequest,
    dynamic_partition: &str,
    ttl: Duration,
) -> HttpResponse {
    let key = CacheKey::new(request.method(), request.url());

    match fetcher.fetch(request).await {
        Ok(response) => {
            store_if_cacheable(registry, key, &response, dynamic_partition, ttl).await;
            response
        }
        Err(e) => {
            debug!(url = %request.url(), error = %e, "Network-first fetch failed, trying cache");

            match registry.match_response(&key).await {
                Ok(Some((cached, _))) => cached,
                Ok(None) => HttpResponse::network_error(),
                Err(lookup_err) => {
                    warn!(url = %request.url(), error = %lookup_err, "Cache fallback failed");
                    HttpResponse::network_error()
                }
            }
        }
    }
}

/// Store a copy of a cacheable response before it is returned to the
/// caller. Best-effort: a failed write is logged and never aborts the
/// response path.
async fn store_if_cacheable(
    registry: &CacheRegistry,
    key: CacheKey,
    response: &HttpResponse,
    partition: &str,
    ttl: Duration,
) {
    if !response.is_cacheable() {
        return;
    }

    if let Err(e) = registry
        .put_response(partition, key, response, Some(ttl))
        .await
    {
        warn!(partition = %partition, error = %e, "Cache write failed");
    }
}
