//! # Cache Registry
//!
//! The full set of named partitions, coordinated across the memory and
//! file tiers.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io;
use tracing::debug;

use crate::cache::providers::file::FileStore;
use crate::cache::providers::memory::MemoryStore;
use crate::cache::providers::provider::PartitionStore;
use crate::cache::types::{
    CacheConfig, CacheKey, CacheLookupResult, CacheMetadata, CacheResult, CacheStatus,
};
use crate::http::HttpResponse;

/// Cache registry handling both memory and file partitions.
///
/// Reads check the memory tier first and promote disk hits into it; writes
/// go to both tiers, with the memory write best-effort. Partition-level
/// operations (`list`, `delete`) act on the union of both tiers so an
/// activation purge removes stale partitions everywhere.
#[derive(Clone)]
pub struct CacheRegistry {
    memory: Arc<MemoryStore>,
    file: Arc<FileStore>,
    config: Arc<CacheConfig>,
}

impl CacheRegistry {
    /// Create a new registry with the specified configuration.
    pub async fn new(mut config: CacheConfig) -> io::Result<Self> {
        // If no disk cache path provided, use the system temp dir
        let root = match config.disk_cache_path.clone() {
            Some(path) => path,
            None => {
                let path = std::env::temp_dir().join("stashio-cache");
                config.disk_cache_path = Some(path.clone());
                path
            }
        };
        let config = Arc::new(config);

        let memory = Arc::new(MemoryStore::new(config.max_memory_partition_size));
        let file = Arc::new(FileStore::new(
            root,
            config.max_disk_cache_size > 0 && config.enabled,
        ));

        if config.enabled {
            file.ensure_initialized().await?;
        }

        Ok(Self {
            memory,
            file,
            config,
        })
    }

    /// Open a partition in both tiers, creating it if absent.
    pub async fn open(&self, partition: &str) -> CacheResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        self.memory.open(partition).await?;
        self.file.open(partition).await
    }

    /// Names of every partition present in either tier.
    pub async fn list(&self) -> CacheResult<Vec<String>> {
        if !self.config.enabled {
            return Ok(Vec::new());
        }

        let mut partitions = self.memory.list().await?;
        partitions.extend(self.file.list().await?);
        partitions.sort();
        partitions.dedup();
        Ok(partitions)
    }

    /// Destroy a partition in both tiers. Returns `true` when either tier
    /// held it; deleting an absent partition is not an error, so repeating
    /// an activation purge is a no-op.
    pub async fn delete(&self, partition: &str) -> CacheResult<bool> {
        if !self.config.enabled {
            return Ok(false);
        }

        let in_memory = self.memory.delete(partition).await?;
        let on_disk = self.file.delete(partition).await?;
        Ok(in_memory || on_disk)
    }

    /// Check whether a partition holds an entry for the key.
    pub async fn contains(&self, partition: &str, key: &CacheKey) -> CacheResult<bool> {
        if !self.config.enabled {
            return Ok(false);
        }

        if self.memory.contains(partition, key).await? {
            return Ok(true);
        }

        self.file.contains(partition, key).await
    }

    /// Get an entry from a partition.
    pub async fn get(&self, partition: &str, key: &CacheKey) -> CacheLookupResult {
        if !self.config.enabled {
            return Ok(None);
        }

        // Check the memory tier first
        if let Some(found) = self.memory.get(partition, key).await? {
            return Ok(Some(found));
        }

        // Fall through to disk, promoting hits for faster access next time
        if let Some((data, metadata, status)) = self.file.get(partition, key).await? {
            let _ = self
                .memory
                .put(partition, key.clone(), data.clone(), metadata.clone())
                .await;

            return Ok(Some((data, metadata, status)));
        }

        Ok(None)
    }

    /// Look the key up across every partition, in any tier.
    ///
    /// A fresh hit wins over a stale one: the first expired entry found is
    /// only returned when no partition holds a fresh copy.
    pub async fn match_any(&self, key: &CacheKey) -> CacheLookupResult {
        if !self.config.enabled {
            return Ok(None);
        }

        let mut stale = None;
        for partition in self.list().await? {
            if let Some((data, metadata, status)) = self.get(&partition, key).await? {
                match status {
                    CacheStatus::Hit => return Ok(Some((data, metadata, status))),
                    CacheStatus::Expired => {
                        if stale.is_none() {
                            stale = Some((data, metadata, status));
                        }
                    }
                }
            }
        }

        Ok(stale)
    }

    /// Put an entry into a partition in both tiers. The memory write is
    /// best-effort; the disk write is authoritative.
    pub async fn put(
        &self,
        partition: &str,
        key: CacheKey,
        data: Bytes,
        metadata: CacheMetadata,
    ) -> CacheResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let _ = self
            .memory
            .put(partition, key.clone(), data.clone(), metadata.clone())
            .await;

        self.file.put(partition, key, data, metadata).await
    }

    /// Remove every partition from both tiers.
    pub async fn clear(&self) -> CacheResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        self.memory.clear().await?;
        self.file.clear().await
    }

    // Convenience methods over materialized responses

    /// Cache a response under `key`, optionally bounded by a TTL.
    pub async fn put_response(
        &self,
        partition: &str,
        key: CacheKey,
        response: &HttpResponse,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let mut metadata = CacheMetadata::new(
            response.status,
            &response.headers,
            response.body.len() as u64,
        );
        if let Some(ttl) = ttl {
            metadata = metadata.with_expiration(ttl);
        }

        debug!(key = ?key, partition = %partition, "Caching response");
        self.put(partition, key, response.body.clone(), metadata).await
    }

    /// Get a cached response from a partition.
    pub async fn get_response(
        &self,
        partition: &str,
        key: &CacheKey,
    ) -> CacheResult<Option<(HttpResponse, CacheStatus)>> {
        Ok(self.get(partition, key).await?.map(assemble_response))
    }

    /// Look a cached response up across every partition.
    pub async fn match_response(
        &self,
        key: &CacheKey,
    ) -> CacheResult<Option<(HttpResponse, CacheStatus)>> {
        Ok(self.match_any(key).await?.map(assemble_response))
    }

    /// Get configuration reference.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

fn assemble_response(
    (data, metadata, status): (Bytes, CacheMetadata, CacheStatus),
) -> (HttpResponse, CacheStatus) {
    (
        HttpResponse::new(metadata.status_code(), metadata.header_map(), data),
        status,
    )
}
