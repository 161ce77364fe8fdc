use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use url::Url;

use crate::cache::CacheConfig;

const DEFAULT_USER_AGENT: &str = "stashio/0.1";

/// Path marker that routes a GET request to the network-first strategy.
pub const DEFAULT_API_MARKER: &str = "/api/";

/// Configurable options for the caching worker.
///
/// Everything the worker varies on is explicit construction-time state:
/// partition names derive from `version`, the precache manifest and the API
/// marker are plain data, and HTTP behavior is bounded by the timeouts
/// below. Two workers with different versions never share partitions.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Version tag suffixed onto partition names. Bumped on every deploy so
    /// activation invalidates the superseded version's partitions.
    pub version: String,

    /// URLs precached into the static partition during install. Relative
    /// entries are resolved against `origin`.
    pub precache_manifest: Vec<String>,

    /// Base URL that relative manifest entries are resolved against.
    pub origin: Option<Url>,

    /// Path marker that routes a GET to the network-first strategy.
    pub api_marker: String,

    /// Cache configuration.
    pub cache_config: CacheConfig,

    /// Overall timeout for one HTTP request.
    pub timeout: Duration,

    /// Connection timeout (time to establish the initial connection).
    pub connect_timeout: Duration,

    /// Whether to follow redirects.
    pub follow_redirects: bool,

    /// User agent string.
    pub user_agent: String,

    /// Custom HTTP headers for outbound requests.
    pub headers: HeaderMap,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            version: "v1".to_owned(),
            precache_manifest: Vec::new(),
            origin: None,
            api_marker: DEFAULT_API_MARKER.to_owned(),
            cache_config: CacheConfig::default(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: WorkerConfig::get_default_headers(),
        }
    }
}

impl WorkerConfig {
    pub fn builder() -> crate::builder::WorkerConfigBuilder {
        crate::builder::WorkerConfigBuilder::new()
    }

    /// Name of the static partition for this worker version.
    pub fn static_partition(&self) -> String {
        format!("static-{}", self.version)
    }

    /// Name of the dynamic partition for this worker version.
    pub fn dynamic_partition(&self) -> String {
        format!("dynamic-{}", self.version)
    }

    /// Partitions allowed to survive this version's activation; everything
    /// else is purged.
    pub fn allowed_partitions(&self) -> [String; 2] {
        [self.static_partition(), self.dynamic_partition()]
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate"),
        );

        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );

        default_headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_names_follow_version() {
        let config = WorkerConfig {
            version: "v4".to_owned(),
            ..Default::default()
        };
        assert_eq!(config.static_partition(), "static-v4");
        assert_eq!(config.dynamic_partition(), "dynamic-v4");
        assert_eq!(
            config.allowed_partitions(),
            ["static-v4".to_owned(), "dynamic-v4".to_owned()]
        );
    }

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.api_marker, "/api/");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.precache_manifest.is_empty());
        assert!(config.origin.is_none());
    }
}
