//! # Stashio
//!
//! An offline-first caching worker engine: a resource-caching proxy that
//! sits between a client and a network origin. It precaches a static asset
//! manifest at install time, purges superseded cache partitions at
//! activation, and serves intercepted GET requests through cache-first or
//! network-first retrieval with fixed offline fallbacks.
//!
//! ## Features
//!
//! - Named cache partitions with memory and on-disk tiers
//! - Install / activate lifecycle with immediate client takeover
//! - Cache-first retrieval for static assets
//! - Network-first retrieval for API content with stale fallback
//! - Background sync tag registry

pub mod builder;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod strategy;
pub mod sync;
pub mod worker;

pub use builder::WorkerConfigBuilder;
pub use cache::{CacheConfig, CacheKey, CacheMetadata, CacheRegistry, CacheStatus};
pub use config::WorkerConfig;
pub use error::WorkerError;
pub use http::{HttpRequest, HttpResponse};
pub use lifecycle::{ClientPool, WorkerState};

// Re-export the network seam and its production implementation
pub use client::{HttpFetcher, RemoteFetch, create_client};

// Re-export the retrieval strategies
pub use strategy::{cache_first, network_first};

// Re-export the background sync hook
pub use sync::{NoopSync, SyncRegistry, SyncTask};

// Re-export the assembled worker
pub use worker::{CacheWorker, RouteClass, classify};
