//! # Cache Types
//!
//! Common types shared across the cache partitions.

use bytes::Bytes;
use reqwest::{
    Method, StatusCode,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Status of a partition lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Entry found and fresh.
    Hit,
    /// Entry found but past its expiry; eligible only as a stale fallback.
    Expired,
}

/// Identity of a cached entry: request method plus URL.
///
/// Only GET responses are ever stored, but the method is part of the key so
/// a stored entry can never be replayed for a different verb.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Request method the entry was stored under.
    pub method: String,
    /// Full request URL.
    pub url: String,
}

impl CacheKey {
    /// Create a key from a parsed request.
    pub fn new(method: &Method, url: &Url) -> Self {
        Self {
            method: method.as_str().to_owned(),
            url: url.as_str().to_owned(),
        }
    }

    /// Create a key from raw parts.
    pub fn from_parts(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
        }
    }

    /// Convert to a filename-safe string.
    pub fn to_filename(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(&self.method);
        hasher.update(":");
        hasher.update(&self.url);

        let hash = hasher.finalize();
        format!("{hash:x}")
    }
}

/// Metadata persisted alongside a cached body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// HTTP status the entry was stored with.
    pub status: u16,
    /// Response headers as name/value pairs.
    pub headers: Vec<(String, String)>,
    /// When the entry was stored (unix seconds).
    pub cached_at: u64,
    /// When the entry expires (unix seconds); `None` never expires.
    pub expires_at: Option<u64>,
    /// Size of the cached body in bytes.
    pub size: u64,
}

impl CacheMetadata {
    /// Create metadata for a response about to be stored.
    pub fn new(status: StatusCode, headers: &HeaderMap, size: u64) -> Self {
        Self {
            status: status.as_u16(),
            headers: headers_to_pairs(headers),
            cached_at: unix_now(),
            expires_at: None,
            size,
        }
    }

    /// Set the expiration time relative to `cached_at`.
    pub fn with_expiration(mut self, ttl: Duration) -> Self {
        self.expires_at = Some(self.cached_at + ttl.as_secs());
        self
    }

    /// Check if the entry has expired.
    pub fn is_expired(&self) -> bool {
        if let Some(expires_at) = self.expires_at {
            expires_at < unix_now()
        } else {
            false
        }
    }

    /// Stored status as a typed code.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK)
    }

    /// Stored headers as a typed map.
    pub fn header_map(&self) -> HeaderMap {
        pairs_to_headers(&self.headers)
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn headers_to_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_owned(), v.to_owned()))
        })
        .collect()
}

fn pairs_to_headers(pairs: &[(String, String)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        if let (Ok(name), Ok(value)) = (name.parse::<HeaderName>(), HeaderValue::from_str(value)) {
            headers.insert(name, value);
        }
    }
    headers
}

/// Configuration for the cache registry.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether caching is enabled.
    pub enabled: bool,
    /// Root directory for the persistent partition store; `None` uses the
    /// system temp dir.
    pub disk_cache_path: Option<PathBuf>,
    /// Maximum size of the persistent store in bytes; zero disables the
    /// disk tier entirely.
    pub max_disk_cache_size: u64,
    /// Maximum size of each in-memory partition in bytes.
    pub max_memory_partition_size: u64,
    /// TTL applied to entries stored by the retrieval strategies.
    pub dynamic_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            disk_cache_path: None, // If None, we'll use the system temp dir
            max_disk_cache_size: 500 * 1024 * 1024, // 500MB
            max_memory_partition_size: 30 * 1024 * 1024, // 30MB
            dynamic_ttl: Duration::from_secs(3600), // 1 hour
        }
    }
}

/// Result of a cache operation.
pub type CacheResult<T> = std::result::Result<T, std::io::Error>;

/// Result of a cache lookup operation.
pub type CacheLookupResult = CacheResult<Option<(Bytes, CacheMetadata, CacheStatus)>>;
