//! # HTTP Client
//!
//! reqwest client construction and the network seam the worker fetches
//! through.

use async_trait::async_trait;
use reqwest::Client;
use rustls::{ClientConfig, crypto::ring};
use rustls_platform_verifier::BuilderVerifierExt;
use std::sync::Arc;

use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::http::{HttpRequest, HttpResponse};

/// Create a reqwest Client with the provided configuration
pub fn create_client(config: &WorkerConfig) -> Result<Client, WorkerError> {
    // Create the crypto provider
    let provider = Arc::new(ring::default_provider());

    // Build platform default TLS configuration
    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .expect("Failed to configure default TLS protocol versions")
        .with_platform_verifier()
        .unwrap()
        .with_no_client_auth();

    let mut client_builder = Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .use_preconfigured_tls(tls_config)
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.timeout.is_zero() {
        client_builder = client_builder.timeout(config.timeout);
    }

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    client_builder.build().map_err(WorkerError::HttpError)
}

/// Network seam for the worker: issues one HTTP request and materializes
/// the response.
///
/// The production implementation is [`HttpFetcher`]; tests substitute
/// programmable doubles to drive the retrieval strategies without a
/// network.
#[async_trait]
pub trait RemoteFetch: Send + Sync {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, WorkerError>;
}

/// Production fetcher backed by reqwest.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher from the worker configuration.
    pub fn new(config: &WorkerConfig) -> Result<Self, WorkerError> {
        Ok(Self {
            client: create_client(config)?,
        })
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteFetch for HttpFetcher {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, WorkerError> {
        let response = self
            .client
            .request(request.method().clone(), request.url().clone())
            .send()
            .await?;

        HttpResponse::from_network(response).await
    }
}
