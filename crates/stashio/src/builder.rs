//! # Builder for WorkerConfig
//!
//! Fluent construction of [`WorkerConfig`] instances.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use stashio_engine::WorkerConfig;
//!
//! let config = WorkerConfig::builder()
//!     .with_version("v4")
//!     .with_precache_url("https://example.com/index.html")
//!     .with_api_marker("/api/")
//!     .with_timeout(Duration::from_secs(60))
//!     .build();
//! ```

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use url::Url;

use crate::cache::CacheConfig;
use crate::config::WorkerConfig;

/// Builder for creating WorkerConfig instances with a fluent API.
#[derive(Debug, Clone)]
pub struct WorkerConfigBuilder {
    /// Internal config being built
    config: WorkerConfig,
}

impl WorkerConfigBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: WorkerConfig::default(),
        }
    }

    /// Set the worker version tag; partition names derive from it.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.config.version = version.into();
        self
    }

    /// Replace the precache manifest.
    pub fn with_precache_manifest<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.precache_manifest = urls.into_iter().map(Into::into).collect();
        self
    }

    /// Append one URL to the precache manifest.
    pub fn with_precache_url(mut self, url: impl Into<String>) -> Self {
        self.config.precache_manifest.push(url.into());
        self
    }

    /// Set the origin that relative manifest entries resolve against.
    pub fn with_origin(mut self, origin: Url) -> Self {
        self.config.origin = Some(origin);
        self
    }

    /// Set the path marker that routes requests network-first.
    pub fn with_api_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.api_marker = marker.into();
        self
    }

    /// Set the cache configuration.
    pub fn with_cache_config(mut self, cache_config: CacheConfig) -> Self {
        self.config.cache_config = cache_config;
        self
    }

    /// Enable or disable caching.
    pub fn with_caching_enabled(mut self, enabled: bool) -> Self {
        self.config.cache_config.enabled = enabled;
        self
    }

    /// Set the overall timeout for one HTTP request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set whether to follow redirects.
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a custom HTTP header.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<reqwest::header::HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.config.headers.insert(name, value);
        }
        self
    }

    /// Set all HTTP headers, replacing any existing headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.config.headers = headers;
        self
    }

    /// Build the WorkerConfig instance.
    pub fn build(self) -> WorkerConfig {
        self.config
    }
}

impl Default for WorkerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_builder_defaults() {
        let config = WorkerConfigBuilder::new().build();
        assert_eq!(config.version, "v1");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.follow_redirects);
        assert!(config.cache_config.enabled);
    }

    #[test]
    fn test_builder_customization() {
        let config = WorkerConfigBuilder::new()
            .with_version("v9")
            .with_precache_manifest(["https://example.com/", "https://example.com/app.css"])
            .with_precache_url("https://example.com/app.js")
            .with_api_marker("/v2/api/")
            .with_timeout(Duration::from_secs(60))
            .with_connect_timeout(Duration::from_secs(20))
            .with_follow_redirects(false)
            .with_user_agent("CustomAgent/1.0")
            .with_header("X-Custom-Header", "CustomValue")
            .build();

        assert_eq!(config.version, "v9");
        assert_eq!(config.precache_manifest.len(), 3);
        assert_eq!(config.api_marker, "/v2/api/");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(20));
        assert!(!config.follow_redirects);
        assert_eq!(config.user_agent, "CustomAgent/1.0");

        let header_value = config.headers.get("X-Custom-Header").unwrap();
        assert_eq!(header_value.to_str().unwrap(), "CustomValue");
    }

    #[test]
    fn test_caching_options() {
        let config_with_cache = WorkerConfigBuilder::new().with_caching_enabled(true).build();
        assert!(config_with_cache.cache_config.enabled);

        let config_without_cache = WorkerConfigBuilder::new()
            .with_caching_enabled(false)
            .build();
        assert!(!config_without_cache.cache_config.enabled);
    }

    #[test]
    fn test_origin() {
        let origin = Url::parse("https://example.com").unwrap();
        let config = WorkerConfigBuilder::new().with_origin(origin.clone()).build();
        assert_eq!(config.origin, Some(origin));
    }
}
