//! # Partition Store
//!
//! This module defines the trait every partition storage backend implements.

use async_trait::async_trait;
use bytes::Bytes;

use crate::cache::types::{CacheKey, CacheLookupResult, CacheMetadata, CacheResult};

/// A storage backend holding named cache partitions.
///
/// A partition is an independently lifecycle-managed set of entries. The
/// registry creates partitions on demand and destroys whole partitions
/// during activation. Single-key operations are atomic; concurrent writers
/// to the same key resolve to last-writer-wins.
#[async_trait]
pub trait PartitionStore: Send + Sync {
    /// Open a partition, creating it if absent.
    async fn open(&self, partition: &str) -> CacheResult<()>;

    /// Names of every partition currently present.
    async fn list(&self) -> CacheResult<Vec<String>>;

    /// Destroy a partition and all its entries. Returns `true` when the
    /// partition existed; deleting an absent partition is not an error.
    async fn delete(&self, partition: &str) -> CacheResult<bool>;

    /// Check whether a partition holds an entry for the key.
    async fn contains(&self, partition: &str, key: &CacheKey) -> CacheResult<bool>;

    /// Get an entry from a partition.
    async fn get(&self, partition: &str, key: &CacheKey) -> CacheLookupResult;

    /// Put an entry into a partition, creating the partition if needed.
    /// Overwrites any previous entry for the key.
    async fn put(
        &self,
        partition: &str,
        key: CacheKey,
        data: Bytes,
        metadata: CacheMetadata,
    ) -> CacheResult<()>;

    /// Remove every partition from the store.
    async fn clear(&self) -> CacheResult<()>;
}
