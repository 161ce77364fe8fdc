//! # Memory Partition Store
//!
//! In-memory partition tier backed by Moka caches, one per partition.

use std::collections::HashMap;

use bytes::Bytes;
use moka::future::Cache as MokaCache;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::cache::providers::PartitionStore;
use crate::cache::types::{CacheKey, CacheLookupResult, CacheMetadata, CacheResult, CacheStatus};

/// Entry held by a memory partition.
#[derive(Clone)]
struct MemoryEntry {
    /// Cached body bytes.
    data: Bytes,
    /// Metadata for the cached entry.
    metadata: CacheMetadata,
}

/// Memory partition store: a size-bounded Moka cache per open partition.
pub struct MemoryStore {
    /// Open partitions by name. Handles are cheap to clone and are cloned
    /// out of the lock before any await.
    partitions: RwLock<HashMap<String, MokaCache<CacheKey, MemoryEntry>>>,
    /// Size cap applied to each partition, in bytes.
    max_partition_size: u64,
}

impl MemoryStore {
    /// Create a new memory store; each partition is capped at
    /// `max_partition_size` bytes.
    pub fn new(max_partition_size: u64) -> Self {
        if max_partition_size == 0 {
            panic!("Memory partition size must be greater than zero");
        }

        Self {
            partitions: RwLock::new(HashMap::new()),
            max_partition_size,
        }
    }

    fn build_partition(&self) -> MokaCache<CacheKey, MemoryEntry> {
        // Size based eviction
        MokaCache::builder()
            .weigher(|_k, v: &MemoryEntry| v.data.len().try_into().unwrap_or(u32::MAX))
            .max_capacity(self.max_partition_size)
            .build()
    }

    /// Clone the handle of an already open partition out of the lock.
    fn existing(&self, partition: &str) -> Option<MokaCache<CacheKey, MemoryEntry>> {
        self.partitions.read().get(partition).cloned()
    }

    /// Clone a partition handle out of the lock, creating the partition
    /// first when absent.
    fn open_handle(&self, partition: &str) -> MokaCache<CacheKey, MemoryEntry> {
        if let Some(cache) = self.existing(partition) {
            return cache;
        }

        let mut partitions = self.partitions.write();
        partitions
            .entry(partition.to_owned())
            .or_insert_with(|| self.build_partition())
            .clone()
    }
}

#[async_trait::async_trait]
impl PartitionStore for MemoryStore {
    async fn open(&self, partition: &str) -> CacheResult<()> {
        self.open_handle(partition);
        debug!(partition = %partition, "Opened memory partition");
        Ok(())
    }

    async fn list(&self) -> CacheResult<Vec<String>> {
        Ok(self.partitions.read().keys().cloned().collect())
    }

    async fn delete(&self, partition: &str) -> CacheResult<bool> {
        let removed = self.partitions.write().remove(partition);
        if removed.is_some() {
            debug!(partition = %partition, "Deleted memory partition");
        }
        Ok(removed.is_some())
    }

    async fn contains(&self, partition: &str, key: &CacheKey) -> CacheResult<bool> {
        match self.existing(partition) {
            Some(cache) => Ok(cache.contains_key(key)),
            None => Ok(false),
        }
    }

    async fn get(&self, partition: &str, key: &CacheKey) -> CacheLookupResult {
        let Some(cache) = self.existing(partition) else {
            return Ok(None);
        };

        if let Some(entry) = cache.get(key).await {
            let data = entry.data.clone();
            let metadata = entry.metadata.clone();

            // Expiry is tracked in metadata rather than as a Moka TTL so
            // stale entries stay servable as a fallback.
            if metadata.is_expired() {
                debug!(key = ?key, partition = %partition, "Memory entry expired");
                return Ok(Some((data, metadata, CacheStatus::Expired)));
            }

            return Ok(Some((data, metadata, CacheStatus::Hit)));
        }

        Ok(None)
    }

    async fn put(
        &self,
        partition: &str,
        key: CacheKey,
        data: Bytes,
        metadata: CacheMetadata,
    ) -> CacheResult<()> {
        // A single entry larger than the whole partition cannot be admitted
        if metadata.size > self.max_partition_size {
            warn!(
                key = ?key,
                size = metadata.size,
                max_size = self.max_partition_size,
                "Entry too large for memory partition, skipping"
            );
            return Ok(());
        }

        let cache = self.open_handle(partition);
        cache.insert(key, MemoryEntry { data, metadata }).await;

        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        self.partitions.write().clear();
        debug!("Memory store cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use reqwest::StatusCode;
    use reqwest::header::HeaderMap;
    use std::time::Duration;

    #[inline]
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer() // Write to test output
            .try_init();
    }

    // Helper to create a CacheKey
    fn key(url: &str) -> CacheKey {
        CacheKey::from_parts("GET", url)
    }

    // Helper to create Bytes data
    fn data(content: &str) -> Bytes {
        Bytes::from(content.to_string())
    }

    // Helper to create CacheMetadata
    fn metadata(size: u64, expires_in_secs: Option<u64>) -> CacheMetadata {
        let mut meta = CacheMetadata::new(StatusCode::OK, &HeaderMap::new(), size);
        if let Some(ttl_secs) = expires_in_secs {
            meta = meta.with_expiration(Duration::from_secs(ttl_secs));
        }
        meta
    }

    // Helper to create CacheMetadata that is already expired
    fn expired_metadata(size: u64) -> CacheMetadata {
        let mut meta = CacheMetadata::new(StatusCode::OK, &HeaderMap::new(), size);
        meta.cached_at = meta.cached_at.saturating_sub(1000);
        meta.expires_at = Some(meta.cached_at + 500);
        meta
    }

    #[tokio::test]
    #[should_panic(expected = "Memory partition size must be greater than zero")]
    async fn test_new_store_zero_size_panics() {
        MemoryStore::new(0);
    }

    #[tokio::test]
    async fn test_put_get_hit() {
        let store = MemoryStore::new(1024);
        let k = key("https://example.com/item1");
        let d = data("hello");

        store
            .put("static-v1", k.clone(), d.clone(), metadata(d.len() as u64, Some(60)))
            .await
            .unwrap();

        let result = store.get("static-v1", &k).await.unwrap();
        match result {
            Some((res_d, res_m, status)) => {
                assert_eq!(res_d, d);
                assert_eq!(res_m.size, d.len() as u64);
                assert_eq!(status, CacheStatus::Hit);
            }
            None => panic!("Expected hit, got None"),
        }
    }

    #[tokio::test]
    async fn test_get_miss() {
        let store = MemoryStore::new(1024);
        let result = store.get("static-v1", &key("https://example.com/none")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_partitions_are_isolated() {
        init_tracing();
        let store = MemoryStore::new(1024);
        let k = key("https://example.com/shared");
        let d = data("static copy");

        store
            .put("static-v1", k.clone(), d.clone(), metadata(d.len() as u64, None))
            .await
            .unwrap();

        assert!(store.contains("static-v1", &k).await.unwrap());
        assert!(!store.contains("dynamic-v1", &k).await.unwrap());
        assert!(store.get("dynamic-v1", &k).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_reported_stale() {
        let store = MemoryStore::new(1024);
        let k = key("https://example.com/stale");
        let d = data("stale_data");

        store
            .put("dynamic-v1", k.clone(), d.clone(), expired_metadata(d.len() as u64))
            .await
            .unwrap();

        match store.get("dynamic-v1", &k).await.unwrap() {
            Some((res_d, _, status)) => {
                assert_eq!(res_d, d);
                assert_eq!(status, CacheStatus::Expired);
            }
            None => panic!("Expected stale entry, got None"),
        }
    }

    #[tokio::test]
    async fn test_put_too_large_entry() {
        let store = MemoryStore::new(10);
        let k = key("https://example.com/large");
        let d = data("this body is larger than ten bytes");

        store
            .put("dynamic-v1", k.clone(), d.clone(), metadata(d.len() as u64, None))
            .await
            .unwrap();

        assert!(!store.contains("dynamic-v1", &k).await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite_updates_entry() {
        let store = MemoryStore::new(1024);
        let k = key("https://example.com/refetched");

        let first = data("value1");
        let second = data("value2-updated");

        store
            .put("dynamic-v1", k.clone(), first, metadata(6, Some(60)))
            .await
            .unwrap();
        store
            .put(
                "dynamic-v1",
                k.clone(),
                second.clone(),
                metadata(second.len() as u64, Some(60)),
            )
            .await
            .unwrap();

        let (res_d, res_m, _) = store.get("dynamic-v1", &k).await.unwrap().unwrap();
        assert_eq!(res_d, second);
        assert_eq!(res_m.size, second.len() as u64);
    }

    #[tokio::test]
    async fn test_open_list_delete() {
        let store = MemoryStore::new(1024);

        store.open("static-v2").await.unwrap();
        store.open("static-v3").await.unwrap();

        let mut listed = store.list().await.unwrap();
        listed.sort();
        assert_eq!(listed, vec!["static-v2".to_owned(), "static-v3".to_owned()]);

        assert!(store.delete("static-v2").await.unwrap());
        assert!(!store.delete("static-v2").await.unwrap());

        let listed = store.list().await.unwrap();
        assert_eq!(listed, vec!["static-v3".to_owned()]);
    }

    #[tokio::test]
    async fn test_put_creates_partition_lazily() {
        let store = MemoryStore::new(1024);
        let k = key("https://example.com/api/data");
        let d = data("{}");

        assert!(store.list().await.unwrap().is_empty());

        store
            .put("dynamic-v1", k, d, metadata(2, Some(60)))
            .await
            .unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["dynamic-v1".to_owned()]);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryStore::new(1024);
        store.open("static-v1").await.unwrap();
        store.open("dynamic-v1").await.unwrap();

        store.clear().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }
}
