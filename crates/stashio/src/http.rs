//! # Request and Response Values
//!
//! The worker serves every intercepted request from one of three places:
//! the live network, a cache partition, or a locally synthesized fallback.
//! All three paths resolve to the same materialized [`HttpResponse`] so the
//! caller never has to care where a response came from.

use bytes::Bytes;
use reqwest::{
    Method, StatusCode,
    header::{CONTENT_TYPE, HeaderMap, HeaderValue},
};
use url::Url;

use crate::error::WorkerError;

/// Body of the synthetic response served when cache-first has neither a
/// cached entry nor a reachable origin.
pub const OFFLINE_FALLBACK_BODY: &str = "Offline content not available";

/// Body of the synthetic response served when network-first has neither a
/// live response nor a cached copy.
pub const NETWORK_ERROR_BODY: &str = "Network error";

/// An outbound request intercepted by the worker.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    url: Url,
}

impl HttpRequest {
    /// Create a request from a method and an absolute URL.
    pub fn new(method: Method, url: impl AsRef<str>) -> Result<Self, WorkerError> {
        let raw = url.as_ref();
        let url = Url::parse(raw).map_err(|e| WorkerError::UrlError(format!("{raw}: {e}")))?;
        Ok(Self { method, url })
    }

    /// Convenience constructor for GET requests.
    pub fn get(url: impl AsRef<str>) -> Result<Self, WorkerError> {
        Self::new(Method::GET, url)
    }

    /// Create a request from an already parsed URL.
    pub fn from_url(method: Method, url: Url) -> Self {
        Self { method, url }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Only GET requests are intercepted and cached.
    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }
}

/// A fully materialized HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code the response carries.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Drain a live reqwest response into an owned value.
    pub async fn from_network(response: reqwest::Response) -> Result<Self, WorkerError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    /// Synthetic 503 served when cache-first exhausts both cache and
    /// network.
    pub fn offline_fallback() -> Self {
        Self::synthetic(StatusCode::SERVICE_UNAVAILABLE, OFFLINE_FALLBACK_BODY)
    }

    /// Synthetic 408 served when network-first exhausts both network and
    /// cache.
    pub fn network_error() -> Self {
        Self::synthetic(StatusCode::REQUEST_TIMEOUT, NETWORK_ERROR_BODY)
    }

    fn synthetic(status: StatusCode, body: &'static str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        Self {
            status,
            headers,
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    /// Only responses with a 200 status are eligible for caching.
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK
    }
}
